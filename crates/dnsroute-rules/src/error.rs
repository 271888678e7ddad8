//! Error types for rule-list handling.

use thiserror::Error;

/// Errors that can occur while loading or compiling rule lists.
///
/// Individual unparseable lines are never errors; they are skipped and
/// counted in a [`ConversionReport`](crate::document::ConversionReport).
#[derive(Error, Debug)]
pub enum RulesError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid CIDR: {0}")]
    InvalidCidr(String),

    #[error("invalid regexp: {0}")]
    InvalidRegex(#[from] regex::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
