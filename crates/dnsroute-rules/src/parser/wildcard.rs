//! Wildcard lists (`+.x`, `*.x`, `.x`) and bare entries.

use std::net::IpAddr;

use ipnet::IpNet;

use crate::rule::{MatcherKind, NormalizedRule};

/// Classify a line without a Clash type or canonical prefix.
pub fn parse_wildcard_line(line: &str) -> Option<NormalizedRule> {
    if let Some(rest) = line.strip_prefix("+.") {
        return non_empty(MatcherKind::Suffix, rest);
    }
    if let Some(rest) = line.strip_prefix("*.") {
        return non_empty(MatcherKind::DirectSubdomain, rest);
    }
    if !line.starts_with("..")
        && let Some(rest) = line.strip_prefix('.')
    {
        return non_empty(MatcherKind::SubdomainOnly, rest);
    }
    if line.parse::<IpAddr>().is_ok() {
        return Some(NormalizedRule::new(MatcherKind::Ip, line));
    }
    if line.parse::<IpNet>().is_ok() {
        return Some(NormalizedRule::new(MatcherKind::IpCidr, line));
    }
    Some(NormalizedRule::new(MatcherKind::Full, line))
}

fn non_empty(kind: MatcherKind, value: &str) -> Option<NormalizedRule> {
    if value.is_empty() {
        None
    } else {
        Some(NormalizedRule::new(kind, value))
    }
}

/// A bare entry is kept as an exact domain only if it looks like a host name:
/// it contains a dot and neither starts nor ends with one.
pub fn is_plausible_host(value: &str) -> bool {
    value.contains('.') && !value.starts_with('.') && !value.ends_with('.')
}
