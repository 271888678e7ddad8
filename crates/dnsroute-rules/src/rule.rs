//! Canonical matcher representation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Shape of a single matcher line after normalization.
///
/// Every supported input syntax (Clash `TYPE,value`, wildcard lists, canonical
/// `prefix:value`) folds into one of these kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatcherKind {
    /// Exact domain (`full:`).
    Full,
    /// Domain and all of its subdomains (`domain:`, `+.x`, `DOMAIN-SUFFIX`).
    Suffix,
    /// Substring of the domain (`keyword:`).
    Keyword,
    /// Regular expression over the domain (`regexp:`).
    Regexp,
    /// Any subdomain, never the domain itself (`.x`).
    SubdomainOnly,
    /// Exactly one label below the domain (`*.x`).
    DirectSubdomain,
    /// Single IP address.
    Ip,
    /// IP network in CIDR notation.
    IpCidr,
}

impl MatcherKind {
    /// Returns true for kinds evaluated against the query name.
    pub fn is_domain(self) -> bool {
        !self.is_ip()
    }

    /// Returns true for kinds evaluated against response addresses.
    pub fn is_ip(self) -> bool {
        matches!(self, MatcherKind::Ip | MatcherKind::IpCidr)
    }

    /// Canonical line prefix, if the kind has one of its own.
    ///
    /// Wildcard kinds have none: they are lowered to `regexp:`.
    pub fn prefix(self) -> Option<&'static str> {
        match self {
            MatcherKind::Full => Some("full"),
            MatcherKind::Suffix => Some("domain"),
            MatcherKind::Keyword => Some("keyword"),
            MatcherKind::Regexp => Some("regexp"),
            MatcherKind::SubdomainOnly
            | MatcherKind::DirectSubdomain
            | MatcherKind::Ip
            | MatcherKind::IpCidr => None,
        }
    }
}

/// A rule line normalized to `(kind, value)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedRule {
    pub kind: MatcherKind,
    pub value: String,
}

impl NormalizedRule {
    pub fn new(kind: MatcherKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    /// Render the rule as one line of a canonical matcher file.
    ///
    /// Domain literals embedded in generated regular expressions are escaped,
    /// so `.example.com` becomes `regexp:.+\.example\.com$` and the dots stay
    /// literal.
    pub fn canonical_line(&self) -> String {
        match self.kind {
            MatcherKind::Full
            | MatcherKind::Suffix
            | MatcherKind::Keyword
            | MatcherKind::Regexp => {
                // prefix() is Some for exactly these kinds
                format!("{}:{}", self.kind.prefix().unwrap_or("full"), self.value)
            }
            MatcherKind::SubdomainOnly => {
                format!(r"regexp:.+\.{}$", regex::escape(&self.value))
            }
            MatcherKind::DirectSubdomain => {
                format!(r"regexp:^[^.]+\.{}$", regex::escape(&self.value))
            }
            MatcherKind::Ip | MatcherKind::IpCidr => self.value.clone(),
        }
    }

    /// Regular expression equivalent for kinds that lower to `regexp:`.
    pub fn regex_source(&self) -> Option<String> {
        match self.kind {
            MatcherKind::Regexp => Some(self.value.clone()),
            MatcherKind::SubdomainOnly => Some(format!(r".+\.{}$", regex::escape(&self.value))),
            MatcherKind::DirectSubdomain => {
                Some(format!(r"^[^.]+\.{}$", regex::escape(&self.value)))
            }
            _ => None,
        }
    }
}

impl fmt::Display for NormalizedRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_line())
    }
}
