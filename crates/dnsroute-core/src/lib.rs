//! Core constants shared across dnsroute crates.
//!
//! This crate provides:
//! - Default configuration values
//! - Fixed stage tags of the compiled pipeline
//! - Common project metadata

pub mod defaults;
pub mod tags;

// Re-export commonly used items at crate root
pub use defaults::*;
pub use tags::*;

/// Project name.
pub const PROJECT_NAME: &str = "dnsroute";
/// Project version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
