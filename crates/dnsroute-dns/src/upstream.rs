//! Upstream resolver descriptors.
//!
//! Upstreams are entered either as structured YAML or as one resolver per
//! line:
//!
//! ```text
//! https://1.1.1.1/dns-query bootstrap=223.5.5.5
//! tls://8.8.8.8 223.5.5.5
//! 192.168.200.2:1053 enable_pipeline=false
//! ```
//!
//! A bare second token is a bootstrap address, kept for older documents.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::debug;

use dnsroute_core::defaults::{DEFAULT_LOCAL_UPSTREAMS, DEFAULT_REMOTE_UPSTREAMS};

/// One upstream of a forward stage.
///
/// Keys other than `addr`, `bootstrap` and `enable_pipeline` are carried
/// through to the emitted stage untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamDescriptor {
    pub addr: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootstrap: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_pipeline: Option<bool>,

    #[serde(flatten)]
    pub extra: Mapping,
}

impl UpstreamDescriptor {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            bootstrap: None,
            enable_pipeline: None,
            extra: Mapping::new(),
        }
    }

    pub fn with_bootstrap(mut self, bootstrap: impl Into<String>) -> Self {
        self.bootstrap = Some(bootstrap.into());
        self
    }

    pub fn with_pipeline(mut self, enabled: bool) -> Self {
        self.enable_pipeline = Some(enabled);
        self
    }

    fn from_mapping(map: &Mapping) -> Option<Self> {
        let addr = scalar_string(map.get("addr")?)?;
        let mut desc = Self::new(addr);

        for (key, value) in map {
            match key.as_str() {
                Some("addr") => {}
                Some("bootstrap") => desc.bootstrap = scalar_string(value),
                Some("enable_pipeline") => match value {
                    Value::Bool(b) => desc.enable_pipeline = Some(*b),
                    Value::String(s) => desc.enable_pipeline = parse_flag(s),
                    _ => {}
                },
                _ => {
                    desc.extra.insert(key.clone(), value.clone());
                }
            }
        }
        Some(desc)
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Parse upstreams from free-form text.
///
/// Structured YAML (a list, or a single mapping with `addr`) is tried first;
/// anything else is read line by line. Empty input yields an empty list.
pub fn parse_upstreams(raw: &str) -> Vec<UpstreamDescriptor> {
    let text = raw.trim();
    if text.is_empty() {
        return Vec::new();
    }

    if let Ok(value) = serde_yaml::from_str::<Value>(text)
        && matches!(value, Value::Sequence(_) | Value::Mapping(_))
    {
        let upstreams = parse_upstream_value(&value);
        if !upstreams.is_empty() {
            return upstreams;
        }
    }

    parse_lines(text)
}

/// Parse upstreams from an already-structured value.
///
/// List entries without `addr` are dropped; bare strings become `{addr}`.
/// A string value is handed to [`parse_upstreams`].
pub fn parse_upstream_value(value: &Value) -> Vec<UpstreamDescriptor> {
    match value {
        Value::Sequence(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::Mapping(map) => UpstreamDescriptor::from_mapping(map),
                Value::String(s) if !s.trim().is_empty() => {
                    Some(UpstreamDescriptor::new(s.trim()))
                }
                _ => None,
            })
            .collect(),
        Value::Mapping(map) => UpstreamDescriptor::from_mapping(map).into_iter().collect(),
        Value::String(s) => parse_upstreams(s),
        _ => Vec::new(),
    }
}

fn parse_lines(text: &str) -> Vec<UpstreamDescriptor> {
    let mut upstreams = Vec::new();

    for raw in text.lines() {
        // indented lines belong to YAML that failed to parse
        if raw.starts_with([' ', '\t']) {
            continue;
        }
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('-') {
            continue;
        }

        let mut parts = line.split_whitespace();
        let Some(addr) = parts.next() else {
            continue;
        };
        let mut desc = UpstreamDescriptor::new(addr);

        for (i, part) in parts.enumerate() {
            match part.split_once('=') {
                Some(("bootstrap", v)) => desc.bootstrap = Some(v.to_string()),
                Some(("enable_pipeline", v)) => {
                    if let Some(flag) = parse_flag(v) {
                        desc.enable_pipeline = Some(flag);
                    }
                }
                Some(_) => {}
                None if i == 0 => desc.bootstrap = Some(part.to_string()),
                None => {}
            }
        }
        upstreams.push(desc);
    }

    upstreams
}

/// The three upstream groups of a pipeline, with defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamGroups {
    pub local: Vec<UpstreamDescriptor>,
    pub remote: Vec<UpstreamDescriptor>,
    pub fallback: Vec<UpstreamDescriptor>,
}

impl UpstreamGroups {
    /// Fill empty groups: local and remote get the built-in resolvers, the
    /// fallback group gets its own copy of the (possibly defaulted) local
    /// group.
    pub fn resolve(
        local: Vec<UpstreamDescriptor>,
        remote: Vec<UpstreamDescriptor>,
        fallback: Vec<UpstreamDescriptor>,
    ) -> Self {
        let local = if local.is_empty() {
            debug!("no local upstreams configured, using defaults");
            defaults(&DEFAULT_LOCAL_UPSTREAMS)
        } else {
            local
        };
        let remote = if remote.is_empty() {
            debug!("no remote upstreams configured, using defaults");
            defaults(&DEFAULT_REMOTE_UPSTREAMS)
        } else {
            remote
        };
        let fallback = if fallback.is_empty() {
            local.clone()
        } else {
            fallback
        };

        Self {
            local,
            remote,
            fallback,
        }
    }
}

fn defaults(addrs: &[&str]) -> Vec<UpstreamDescriptor> {
    addrs.iter().map(|a| UpstreamDescriptor::new(*a)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input() {
        assert!(parse_upstreams("").is_empty());
        assert!(parse_upstreams("  \n\t").is_empty());
    }

    #[test]
    fn yaml_list() {
        let raw = "- addr: 192.168.200.2:1053\n  enable_pipeline: false\n- addr: https://1.1.1.1/dns-query\n  bootstrap: 223.5.5.5\n- tls://8.8.8.8\n- note: no addr\n";
        let ups = parse_upstreams(raw);
        assert_eq!(
            ups,
            vec![
                UpstreamDescriptor::new("192.168.200.2:1053").with_pipeline(false),
                UpstreamDescriptor::new("https://1.1.1.1/dns-query").with_bootstrap("223.5.5.5"),
                UpstreamDescriptor::new("tls://8.8.8.8"),
            ]
        );
    }

    #[test]
    fn single_mapping() {
        let ups = parse_upstreams("addr: udp://10.0.0.1\nidle_timeout: 30\n");
        assert_eq!(ups.len(), 1);
        assert_eq!(ups[0].addr, "udp://10.0.0.1");
        assert_eq!(ups[0].extra.get("idle_timeout"), Some(&Value::from(30)));
    }

    #[test]
    fn line_syntax() {
        let raw = "https://1.1.1.1/dns-query bootstrap=223.5.5.5\ntls://8.8.8.8 223.5.5.5\n# comment\n\n192.168.1.1:53 enable_pipeline=yes\n10.0.0.1 enable_pipeline=maybe";
        let ups = parse_upstreams(raw);
        assert_eq!(
            ups,
            vec![
                UpstreamDescriptor::new("https://1.1.1.1/dns-query").with_bootstrap("223.5.5.5"),
                UpstreamDescriptor::new("tls://8.8.8.8").with_bootstrap("223.5.5.5"),
                UpstreamDescriptor::new("192.168.1.1:53").with_pipeline(true),
                UpstreamDescriptor::new("10.0.0.1"),
            ]
        );
    }

    #[test]
    fn plain_addresses_one_per_line() {
        let ups = parse_upstreams("223.5.5.5\n119.29.29.29\n");
        assert_eq!(ups.len(), 2);
        assert_eq!(ups[1].addr, "119.29.29.29");
    }

    #[test]
    fn broken_yaml_lines_skipped() {
        let raw = "1.1.1.1\n- addr: [\n  bootstrap: x\n";
        let ups = parse_upstreams(raw);
        assert_eq!(ups, vec![UpstreamDescriptor::new("1.1.1.1")]);
    }

    #[test]
    fn value_forms() {
        let list: Value = serde_yaml::from_str("[8.8.8.8, {addr: 1.1.1.1}]").unwrap();
        assert_eq!(parse_upstream_value(&list).len(), 2);
        let text = Value::String("8.8.8.8 bootstrap=1.1.1.1".into());
        assert_eq!(
            parse_upstream_value(&text),
            vec![UpstreamDescriptor::new("8.8.8.8").with_bootstrap("1.1.1.1")]
        );
        assert!(parse_upstream_value(&Value::Null).is_empty());
    }

    #[test]
    fn defaults_and_fallback_copy() {
        let groups = UpstreamGroups::resolve(vec![], vec![], vec![]);
        let local: Vec<&str> = groups.local.iter().map(|u| u.addr.as_str()).collect();
        assert_eq!(local, vec!["223.5.5.5", "119.29.29.29"]);
        assert_eq!(groups.remote[0].addr, "https://1.1.1.1/dns-query");
        assert_eq!(groups.fallback, groups.local);

        let custom = vec![UpstreamDescriptor::new("10.0.0.53")];
        let groups = UpstreamGroups::resolve(custom.clone(), vec![], vec![]);
        assert_eq!(groups.fallback, custom);
    }

    #[test]
    fn serializes_extra_keys() {
        let mut desc = UpstreamDescriptor::new("tls://1.1.1.1").with_pipeline(true);
        desc.extra.insert("socks5".into(), "127.0.0.1:1080".into());
        let yaml = serde_yaml::to_string(&desc).unwrap();
        assert!(yaml.starts_with("addr: tls://1.1.1.1\nenable_pipeline: true\n"));
        assert!(yaml.contains("socks5:"));
        assert!(!yaml.contains("bootstrap"));
    }
}
