//! Typed forwarder pipeline.
//!
//! Stages serialize to the forwarder's plugin syntax:
//!
//! ```yaml
//! - tag: lazy_cache
//!   type: cache
//!   args: { size: 10240, ... }
//! ```
//!
//! Sequence steps render their matches and actions as the forwarder's
//! one-line strings (`qname $ads`, `goto china_dns`).

use std::collections::HashSet;
use std::fmt;

use serde::{Serialize, Serializer};

use dnsroute_dns::UpstreamDescriptor;

/// One plugin of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(flatten)]
    pub kind: StageKind,
}

impl Stage {
    pub fn tagged(tag: impl Into<String>, kind: StageKind) -> Self {
        Self {
            tag: Some(tag.into()),
            kind,
        }
    }

    pub fn untagged(kind: StageKind) -> Self {
        Self { tag: None, kind }
    }

    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "args", rename_all = "snake_case")]
pub enum StageKind {
    DomainSet {
        files: Vec<String>,
    },
    IpSet {
        files: Vec<String>,
    },
    Cache {
        size: u32,
        lazy_cache_ttl: u32,
        dump_file: String,
        dump_interval: u32,
    },
    Forward {
        concurrent: u32,
        upstreams: Vec<UpstreamDescriptor>,
    },
    Hosts {
        files: Vec<String>,
    },
    Sequence(Vec<Step>),
    Fallback {
        primary: String,
        secondary: String,
        threshold: u32,
        always_standby: bool,
    },
    UdpServer {
        entry: String,
        listen: String,
    },
    TcpServer {
        entry: String,
        listen: String,
    },
}

impl StageKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            StageKind::DomainSet { .. } => "domain_set",
            StageKind::IpSet { .. } => "ip_set",
            StageKind::Cache { .. } => "cache",
            StageKind::Forward { .. } => "forward",
            StageKind::Hosts { .. } => "hosts",
            StageKind::Sequence(_) => "sequence",
            StageKind::Fallback { .. } => "fallback",
            StageKind::UdpServer { .. } => "udp_server",
            StageKind::TcpServer { .. } => "tcp_server",
        }
    }

    /// Files the stage reads at start-up.
    pub fn files(&self) -> &[String] {
        match self {
            StageKind::DomainSet { files }
            | StageKind::IpSet { files }
            | StageKind::Hosts { files } => files,
            _ => &[],
        }
    }
}

/// One entry of a sequence: optional conditions and an action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub matches: Vec<Match>,
    pub exec: Exec,
}

impl Step {
    pub fn exec(exec: Exec) -> Self {
        Self {
            matches: Vec::new(),
            exec,
        }
    }

    pub fn when(matcher: Match, exec: Exec) -> Self {
        Self {
            matches: vec![matcher],
            exec,
        }
    }
}

/// A sequence condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Match {
    /// Query name is in the named set.
    Qname(String),
    /// An answer address is in the named set.
    RespIp(String),
    HasResp,
    NoResp,
    /// Condition copied verbatim from a custom entry.
    Raw(String),
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Match::Qname(tag) => write!(f, "qname ${tag}"),
            Match::RespIp(tag) => write!(f, "resp_ip ${tag}"),
            Match::HasResp => f.write_str("has_resp"),
            Match::NoResp => f.write_str("!has_resp"),
            Match::Raw(s) => f.write_str(s),
        }
    }
}

impl Serialize for Match {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A sequence action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exec {
    /// Run the tagged stage and continue.
    Invoke(String),
    /// Jump to the tagged sequence and do not return.
    Goto(String),
    Accept,
    Reject(u8),
    Ttl(u32),
    QuerySummary(String),
    MetricsCollector(String),
    PreferIpv4,
    /// Action copied verbatim from a custom entry.
    Raw(String),
}

impl fmt::Display for Exec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exec::Invoke(tag) => write!(f, "${tag}"),
            Exec::Goto(tag) => write!(f, "goto {tag}"),
            Exec::Accept => f.write_str("accept"),
            Exec::Reject(rcode) => write!(f, "reject {rcode}"),
            Exec::Ttl(ttl) => write!(f, "ttl {ttl}"),
            Exec::QuerySummary(label) => write!(f, "query_summary {label}"),
            Exec::MetricsCollector(name) => write!(f, "metrics_collector {name}"),
            Exec::PreferIpv4 => f.write_str("prefer_ipv4"),
            Exec::Raw(s) => f.write_str(s),
        }
    }
}

impl Serialize for Exec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A reference to a tag that no earlier stage defines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingRef {
    /// Tag (or type, for untagged stages) of the referring stage.
    pub from: String,
    pub target: String,
    /// Found in text copied from a custom entry rather than a typed reference.
    pub raw: bool,
}

/// Ordered stages; later stages may only reference earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
}

impl Pipeline {
    pub fn push(&mut self, stage: Stage) {
        self.stages.push(stage);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn get(&self, tag: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.tag.as_deref() == Some(tag))
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().filter_map(|s| s.tag.as_deref())
    }

    /// Every reference to a tag not defined by an earlier stage.
    ///
    /// Custom conditions and actions are scanned for `$tag` tokens; those
    /// findings are marked `raw`.
    pub fn dangling_references(&self) -> Vec<DanglingRef> {
        let mut defined: HashSet<&str> = HashSet::new();
        let mut dangling = Vec::new();

        for stage in &self.stages {
            let from = stage.tag.as_deref().unwrap_or(stage.type_name());
            let mut check = |target: &str, raw: bool| {
                if !defined.contains(target) {
                    dangling.push(DanglingRef {
                        from: from.to_string(),
                        target: target.to_string(),
                        raw,
                    });
                }
            };

            match &stage.kind {
                StageKind::Sequence(steps) => {
                    for step in steps {
                        for m in &step.matches {
                            match m {
                                Match::Qname(t) | Match::RespIp(t) => check(t, false),
                                Match::Raw(s) => raw_refs(s).for_each(|t| check(t, true)),
                                Match::HasResp | Match::NoResp => {}
                            }
                        }
                        match &step.exec {
                            Exec::Invoke(t) | Exec::Goto(t) => check(t, false),
                            Exec::Raw(s) => raw_refs(s).for_each(|t| check(t, true)),
                            _ => {}
                        }
                    }
                }
                StageKind::Fallback {
                    primary, secondary, ..
                } => {
                    check(primary, false);
                    check(secondary, false);
                }
                StageKind::UdpServer { entry, .. } | StageKind::TcpServer { entry, .. } => {
                    check(entry, false);
                }
                _ => {}
            }

            if let Some(tag) = stage.tag.as_deref() {
                defined.insert(tag);
            }
        }

        dangling
    }
}

/// `$tag` tokens in free text.
fn raw_refs(text: &str) -> impl Iterator<Item = &str> {
    text.split_whitespace().filter_map(|token| {
        let tag = token.trim_start_matches('!').strip_prefix('$')?;
        (!tag.is_empty()).then_some(tag)
    })
}
