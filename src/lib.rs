//! # dnsroute
//!
//! Compiles a DNS routing policy into the plugin pipeline of a mosdns-style
//! forwarder, plus the side files that pipeline loads.
//!
//! ## Crates
//!
//! - [`dnsroute_core`] - Reserved tags and default values
//! - [`dnsroute_rules`] - Rule-list normalization and matching
//! - [`dnsroute_dns`] - Upstream and static-host parsing
//! - [`dnsroute_config`] - Policy document model and loading
//! - [`dnsroute_compiler`] - Pipeline construction and serialization

pub use dnsroute_compiler as compiler;
pub use dnsroute_config as config;
pub use dnsroute_core as core;
pub use dnsroute_dns as dns;
pub use dnsroute_rules as rules;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use dnsroute_compiler::{CompileOptions, Compilation, ResolvedContent, compile};
    pub use dnsroute_config::{PolicyDocument, load_policy, validate_policy};
    pub use dnsroute_rules::{RuleSetMatcher, convert_document};
}
