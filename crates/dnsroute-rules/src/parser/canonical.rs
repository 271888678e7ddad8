//! Canonical `prefix:value` lines.

use std::net::IpAddr;

use ipnet::IpNet;

use crate::rule::{MatcherKind, NormalizedRule};

/// Prefixes that mark a document as already canonical.
pub const CANONICAL_PREFIXES: [&str; 5] = ["domain", "full", "keyword", "regexp", "ip"];

/// Returns true if `line` starts with one of [`CANONICAL_PREFIXES`].
pub fn has_canonical_prefix(line: &str) -> bool {
    line.split_once(':')
        .map(|(prefix, _)| {
            let prefix = prefix.trim().to_ascii_lowercase();
            CANONICAL_PREFIXES.contains(&prefix.as_str())
        })
        .unwrap_or(false)
}

/// Parse a `prefix:value` line.
///
/// Accepts the `regex` alias for `regexp`. An `ip:` value must parse as an
/// address or network; it normalizes to the bare literal.
pub fn parse_canonical_line(line: &str) -> Option<NormalizedRule> {
    let (prefix, value) = line.split_once(':')?;
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let kind = match prefix.trim().to_ascii_lowercase().as_str() {
        "domain" => MatcherKind::Suffix,
        "full" => MatcherKind::Full,
        "keyword" => MatcherKind::Keyword,
        "regexp" | "regex" => MatcherKind::Regexp,
        "ip" => {
            if value.parse::<IpAddr>().is_ok() {
                MatcherKind::Ip
            } else if value.parse::<IpNet>().is_ok() {
                MatcherKind::IpCidr
            } else {
                return None;
            }
        }
        _ => return None,
    };

    Some(NormalizedRule::new(kind, value))
}
