//! Policy document model, loading, validation and CLI overrides.
//!
//! A policy document is read from JSON (comments allowed), YAML or TOML,
//! adjusted with [`apply_overrides`], and checked with [`validate_policy`]
//! before it is compiled.

mod cli;
mod defaults;
mod loader;
mod types;
mod validate;

pub use cli::{CliOverrides, apply_overrides};
pub use loader::{ConfigError, load_policy, parse_policy};
pub use types::*;
pub use validate::{PolicyWarning, validate_policy};
