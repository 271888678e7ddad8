//! Error types for the compiler and its CLI.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("config: {0}")]
    Config(#[from] dnsroute_config::ConfigError),

    #[error("rules: {0}")]
    Rules(#[from] dnsroute_rules::RulesError),

    #[error("side file path escapes the output directory: {0}")]
    UnsafePath(String),
}
