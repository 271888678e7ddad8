//! Custom host mappings.

use std::fmt;
use std::net::IpAddr;

use tracing::debug;

/// A static answer: one name, one or more addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEntry {
    pub domain: String,
    pub addrs: Vec<IpAddr>,
}

impl fmt::Display for HostEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.domain)?;
        for addr in &self.addrs {
            write!(f, " {addr}")?;
        }
        Ok(())
    }
}

/// Parse host mappings, one per line.
///
/// Both `domain ip` and `/etc/hosts`-style `ip domain` are accepted: tokens
/// that parse as an address are addresses, the first other token is the
/// name. Lines without an address or a name are skipped.
pub fn parse_hosts(text: &str) -> Vec<HostEntry> {
    let mut entries = Vec::new();

    for raw in text.lines() {
        let line = match raw.split_once('#') {
            Some((before, _)) => before.trim(),
            None => raw.trim(),
        };
        if line.is_empty() {
            continue;
        }

        let mut domain = None;
        let mut addrs = Vec::new();
        for token in line.split_whitespace() {
            match token.parse::<IpAddr>() {
                Ok(addr) => addrs.push(addr),
                Err(_) if domain.is_none() => domain = Some(token),
                Err(_) => {}
            }
        }

        match domain {
            Some(domain) if !addrs.is_empty() => entries.push(HostEntry {
                domain: domain.to_string(),
                addrs,
            }),
            _ => debug!(line, "host mapping skipped"),
        }
    }

    entries
}

/// Render entries in the forwarder's hosts-file syntax.
pub fn render_hosts(entries: &[HostEntry]) -> String {
    entries
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
