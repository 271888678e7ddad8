//! Rule-list normalization for dnsroute.
//!
//! Converts heterogeneous rule-list syntaxes into the canonical matcher
//! format consumed by the forwarder's `domain_set` / `ip_set` plugins:
//!
//! | input                     | canonical                      |
//! |---------------------------|--------------------------------|
//! | `DOMAIN,a.com`            | `full:a.com`                   |
//! | `DOMAIN-SUFFIX,a.com`     | `domain:a.com`                 |
//! | `DOMAIN-KEYWORD,ads`      | `keyword:ads`                  |
//! | `DOMAIN-REGEX,^ad`        | `regexp:^ad`                   |
//! | `+.a.com`                 | `domain:a.com`                 |
//! | `.a.com`                  | `regexp:.+\.a\.com$`           |
//! | `*.a.com`                 | `regexp:^[^.]+\.a\.com$`       |
//! | `a.com`                   | `full:a.com`                   |
//! | `10.0.0.0/8`, `1.1.1.1`   | unchanged                      |
//!
//! # Example
//!
//! ```
//! use dnsroute_rules::{convert_document, DocumentFormat, RuleSetMatcher};
//!
//! let converted = convert_document("DOMAIN-SUFFIX,example.com\nGEOIP,CN\n");
//! assert_eq!(converted.text, "domain:example.com");
//! assert_eq!(converted.report.format, DocumentFormat::Clash);
//!
//! let matcher = RuleSetMatcher::build(&converted.rules).unwrap();
//! assert!(matcher.matches("www.example.com"));
//! ```

pub mod document;
pub mod error;
pub mod matcher;
pub mod parser;
pub mod provider;
pub mod rule;

pub use document::{
    ConversionReport, Converted, DocumentFormat, convert_document, detect_document_format,
};
pub use error::RulesError;
pub use matcher::RuleSetMatcher;
pub use parser::normalize_line;
pub use provider::FileProvider;
pub use rule::{MatcherKind, NormalizedRule};
