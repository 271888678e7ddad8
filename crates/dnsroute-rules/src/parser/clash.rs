//! Clash rule lines and rule-provider payloads.

use std::net::IpAddr;

use ipnet::IpNet;
use tracing::debug;

use crate::error::RulesError;
use crate::rule::{MatcherKind, NormalizedRule};

/// Parse a Clash `TYPE,value` line.
///
/// Extra fields after the value (`no-resolve`, policy names) are ignored.
/// Types without a canonical equivalent yield `None`.
pub fn parse_clash_line(line: &str) -> Option<NormalizedRule> {
    let (rule_type, rest) = line.split_once(',')?;
    let value = rest.split(',').next().unwrap_or("").trim();
    if value.is_empty() {
        return None;
    }

    let kind = match rule_type.trim().to_ascii_uppercase().as_str() {
        "DOMAIN" => MatcherKind::Full,
        "DOMAIN-SUFFIX" => MatcherKind::Suffix,
        "DOMAIN-KEYWORD" => MatcherKind::Keyword,
        "DOMAIN-REGEX" => MatcherKind::Regexp,
        "IP-CIDR" | "IP-CIDR6" => {
            if value.parse::<IpNet>().is_ok() {
                MatcherKind::IpCidr
            } else if value.parse::<IpAddr>().is_ok() {
                MatcherKind::Ip
            } else {
                return None;
            }
        }
        _ => return None,
    };

    Some(NormalizedRule::new(kind, value))
}

/// Returns true if the Clash type of `line` belongs to the domain projection
/// used for rule-list conversion.
pub fn is_domain_projection(line: &str) -> bool {
    line.split_once(',')
        .map(|(t, _)| {
            matches!(
                t.trim().to_ascii_uppercase().as_str(),
                "DOMAIN" | "DOMAIN-SUFFIX" | "DOMAIN-KEYWORD" | "DOMAIN-REGEX"
            )
        })
        .unwrap_or(false)
}

/// Extract the `payload` list of a Clash rule-provider document.
///
/// Non-string entries are skipped.
pub fn extract_payload(content: &str) -> Result<Vec<String>, RulesError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(content)?;

    let payload = yaml
        .get("payload")
        .and_then(|v| v.as_sequence())
        .ok_or_else(|| RulesError::Parse("missing 'payload' sequence in YAML".into()))?;

    let lines: Vec<String> = payload
        .iter()
        .filter_map(|item| item.as_str().map(str::to_string))
        .collect();
    if lines.len() != payload.len() {
        debug!(
            skipped = payload.len() - lines.len(),
            "non-string payload entries skipped"
        );
    }
    Ok(lines)
}
