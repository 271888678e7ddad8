//! Lowering a policy document into the forwarder pipeline.
//!
//! The pipeline is emitted in one forward pass:
//!
//! 1. rule-set matcher stages, in document order
//! 2. cache, the three forwarders and the optional hosts stage
//! 3. the remote, remote-fallback, failover and local resolve paths
//! 4. merged rule bucket stages
//! 5. `sequence_main`, then the listeners
//!
//! so every tag a stage references is defined above it.

use tracing::{debug, warn};

use dnsroute_config::{CustomMatchConfig, DefaultForward, Placement, PolicyDocument, Route};
use dnsroute_core::defaults::*;
use dnsroute_core::tags::*;
use dnsroute_dns::{UpstreamGroups, parse_upstream_value};

use crate::content::{CompileOptions, ResolvedContent};
use crate::manifest::{SideFileManifest, hosts_content, hosts_path, manifest_for};
use crate::partition::{Partition, route_exec};
use crate::pipeline::{Exec, Match, Pipeline, Stage, StageKind, Step};

/// Output of [`build`].
#[derive(Debug, Clone)]
pub struct Compiled {
    pub pipeline: Pipeline,
    pub manifest: SideFileManifest,
    pub partition: Partition,
}

/// Compile a policy document into a pipeline and its side files.
pub fn build(doc: &PolicyDocument, options: &CompileOptions, resolved: &ResolvedContent) -> Compiled {
    let settings = &doc.mosdns;
    let partition = Partition::build(doc, options, resolved);
    let hosts = hosts_content(doc);
    let mut pipeline = Pipeline::default();

    for plan in &partition.rulesets {
        let files = vec![plan.path.clone()];
        let kind = if plan.is_ip() {
            StageKind::IpSet { files }
        } else {
            StageKind::DomainSet { files }
        };
        pipeline.push(Stage::tagged(&plan.tag, kind));
    }

    pipeline.push(Stage::tagged(
        TAG_CACHE,
        StageKind::Cache {
            size: DEFAULT_CACHE_SIZE,
            lazy_cache_ttl: DEFAULT_LAZY_CACHE_TTL_SECS,
            dump_file: DEFAULT_CACHE_DUMP_FILE.to_string(),
            dump_interval: DEFAULT_CACHE_DUMP_INTERVAL_SECS,
        },
    ));

    let upstreams = UpstreamGroups::resolve(
        parse_upstream_value(&settings.local_dns),
        parse_upstream_value(&settings.remote_dns),
        parse_upstream_value(&settings.fallback_dns),
    );
    pipeline.push(Stage::tagged(
        TAG_FORWARD_LOCAL,
        StageKind::Forward {
            concurrent: DEFAULT_LOCAL_CONCURRENT,
            upstreams: upstreams.local,
        },
    ));
    pipeline.push(Stage::tagged(
        TAG_FORWARD_REMOTE,
        StageKind::Forward {
            concurrent: DEFAULT_REMOTE_CONCURRENT,
            upstreams: upstreams.remote,
        },
    ));
    pipeline.push(Stage::tagged(
        TAG_FORWARD_REMOTE_FALLBACK,
        StageKind::Forward {
            concurrent: DEFAULT_FALLBACK_CONCURRENT,
            upstreams: upstreams.fallback,
        },
    ));

    if hosts.is_some() {
        pipeline.push(Stage::tagged(
            TAG_CUSTOM_HOSTS,
            StageKind::Hosts {
                files: vec![hosts_path()],
            },
        ));
    }

    pipeline.push(Stage::tagged(
        TAG_REMOTE_DNS,
        StageKind::Sequence(remote_steps(TAG_FORWARD_REMOTE, Some(DEFAULT_REMOTE_TTL_FLOOR))),
    ));
    pipeline.push(Stage::tagged(
        TAG_REMOTE_DNS_FALLBACK,
        StageKind::Sequence(remote_steps(TAG_FORWARD_REMOTE_FALLBACK, None)),
    ));
    pipeline.push(Stage::tagged(
        TAG_PROXY_DNS,
        StageKind::Fallback {
            primary: TAG_REMOTE_DNS.to_string(),
            secondary: TAG_REMOTE_DNS_FALLBACK.to_string(),
            threshold: DEFAULT_FALLBACK_THRESHOLD_MS,
            always_standby: false,
        },
    ));
    pipeline.push(Stage::tagged(
        TAG_CHINA_DNS,
        StageKind::Sequence(vec![
            Step::exec(Exec::Invoke(TAG_CACHE.to_string())),
            Step::when(Match::HasResp, Exec::Accept),
            Step::exec(Exec::QuerySummary(TAG_FORWARD_LOCAL.to_string())),
            Step::exec(Exec::Invoke(TAG_FORWARD_LOCAL.to_string())),
            Step::when(Match::NoResp, Exec::Reject(REJECT_RCODE_REFUSED)),
        ]),
    ));

    for kind in partition.buckets.non_empty() {
        let files = vec![kind.path()];
        let stage = if kind.is_ip() {
            StageKind::IpSet { files }
        } else {
            StageKind::DomainSet { files }
        };
        pipeline.push(Stage::tagged(kind.tag(), stage));
    }

    pipeline.push(Stage::tagged(
        TAG_SEQUENCE_MAIN,
        StageKind::Sequence(main_sequence(doc, &partition, hosts.is_some())),
    ));

    if settings.listener_enabled {
        pipeline.push(Stage::untagged(StageKind::UdpServer {
            entry: TAG_SEQUENCE_MAIN.to_string(),
            listen: settings.listen.clone(),
        }));
        if settings.listen_tcp {
            pipeline.push(Stage::untagged(StageKind::TcpServer {
                entry: TAG_SEQUENCE_MAIN.to_string(),
                listen: settings.listen.clone(),
            }));
        }
    }

    for dangling in pipeline.dangling_references() {
        warn!(
            stage = %dangling.from,
            target = %dangling.target,
            custom = dangling.raw,
            "reference to a tag not defined earlier in the pipeline"
        );
    }

    let manifest = manifest_for(&partition, hosts.as_deref());
    debug!(
        stages = pipeline.len(),
        side_files = manifest.len(),
        "pipeline built"
    );

    Compiled {
        pipeline,
        manifest,
        partition,
    }
}

/// Query a remote forwarder, refuse on no answer, optionally floor the TTL.
fn remote_steps(forward: &str, ttl_floor: Option<u32>) -> Vec<Step> {
    let mut steps = vec![
        Step::exec(Exec::QuerySummary(forward.to_string())),
        Step::exec(Exec::Invoke(forward.to_string())),
        Step::when(Match::NoResp, Exec::Reject(REJECT_RCODE_REFUSED)),
    ];
    if let Some(ttl) = ttl_floor {
        steps.push(Step::exec(Exec::Ttl(ttl)));
    }
    steps
}

fn main_sequence(doc: &PolicyDocument, partition: &Partition, has_hosts: bool) -> Vec<Step> {
    let settings = &doc.mosdns;
    let mut steps = vec![
        Step::exec(Exec::MetricsCollector(METRICS_COLLECTOR_NAME.to_string())),
        Step::exec(Exec::PreferIpv4),
    ];

    if has_hosts {
        steps.push(Step::exec(Exec::Invoke(TAG_CUSTOM_HOSTS.to_string())));
        steps.push(Step::when(Match::HasResp, Exec::Accept));
    }

    let custom = custom_steps(&settings.custom_matches);
    let rules = partition.branches.iter().map(|b| b.step());
    match settings.custom_match_position {
        Placement::Head => {
            steps.extend(custom);
            steps.extend(rules);
        }
        Placement::Tail => {
            steps.extend(rules);
            steps.extend(custom);
        }
    }

    let default_route = match settings.default_forward {
        DefaultForward::ForwardLocal => Route::Direct,
        DefaultForward::ForwardRemote => Route::Proxy,
    };
    steps.push(Step::exec(route_exec(default_route)));
    steps
}

/// Enabled custom entries with at least one condition and an action.
fn custom_steps(entries: &[CustomMatchConfig]) -> Vec<Step> {
    entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.enabled)
        .filter_map(|(index, entry)| {
            let exec = entry.exec.trim();
            let conditions = entry.matches.conditions();
            if exec.is_empty() || conditions.is_empty() {
                debug!(index, "incomplete custom match skipped");
                return None;
            }
            Some(Step {
                matches: conditions.into_iter().map(Match::Raw).collect(),
                exec: Exec::Raw(exec.to_string()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dnsroute_config::MatchList;

    fn policy(yaml: &str) -> PolicyDocument {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn compile(yaml: &str) -> Compiled {
        build(&policy(yaml), &CompileOptions::default(), &ResolvedContent::new())
    }

    fn tags(p: &Pipeline) -> Vec<&str> {
        p.stages.iter().map(|s| s.tag.as_deref().unwrap_or(s.type_name())).collect()
    }

    fn main_steps(p: &Pipeline) -> Vec<String> {
        let Some(Stage {
            kind: StageKind::Sequence(steps),
            ..
        }) = p.get(TAG_SEQUENCE_MAIN)
        else {
            panic!("no main sequence");
        };
        steps
            .iter()
            .map(|s| {
                let matches: Vec<String> = s.matches.iter().map(ToString::to_string).collect();
                if matches.is_empty() {
                    s.exec.to_string()
                } else {
                    format!("{} -> {}", matches.join(" && "), s.exec)
                }
            })
            .collect()
    }

    #[test]
    fn empty_policy_foundation() {
        let c = compile("{}");
        assert_eq!(
            tags(&c.pipeline),
            vec![
                "lazy_cache",
                "forward_local",
                "forward_remote",
                "forward_remote_fallback",
                "remote_dns",
                "remote_dns_fallback",
                "proxy_dns",
                "china_dns",
                "sequence_main",
                "udp_server",
            ]
        );
        assert_eq!(
            main_steps(&c.pipeline),
            vec!["metrics_collector metrics", "prefer_ipv4", "$proxy_dns"]
        );
        assert!(c.manifest.is_empty());
        assert!(c.pipeline.dangling_references().is_empty());
    }

    #[test]
    fn remote_paths() {
        let c = compile("{}");
        let Some(Stage {
            kind: StageKind::Sequence(remote),
            ..
        }) = c.pipeline.get(TAG_REMOTE_DNS)
        else {
            panic!("no remote_dns");
        };
        assert_eq!(remote.last().map(|s| s.exec.clone()), Some(Exec::Ttl(1)));

        let Some(Stage {
            kind: StageKind::Sequence(fallback),
            ..
        }) = c.pipeline.get(TAG_REMOTE_DNS_FALLBACK)
        else {
            panic!("no remote_dns_fallback");
        };
        assert_eq!(fallback.len(), 3);
        assert_eq!(fallback[1].exec, Exec::Invoke("forward_remote_fallback".into()));
    }

    #[test]
    fn hosts_stage_and_branch() {
        let c = compile("mosdns:\n  custom_hosts: \"a.lan 10.0.0.2\"\n  default_forward: forward_local\n");
        assert!(c.pipeline.get(TAG_CUSTOM_HOSTS).is_some());
        assert_eq!(
            main_steps(&c.pipeline),
            vec![
                "metrics_collector metrics",
                "prefer_ipv4",
                "$custom_hosts",
                "has_resp -> accept",
                "goto china_dns",
            ]
        );
        assert_eq!(c.manifest.files[0].path, "./rules/custom_hosts.txt");
    }

    #[test]
    fn unparseable_hosts_emit_nothing() {
        let c = compile("mosdns:\n  custom_hosts: \"just-a-name\"\n");
        assert!(c.pipeline.get(TAG_CUSTOM_HOSTS).is_none());
        assert!(!main_steps(&c.pipeline).contains(&"$custom_hosts".to_string()));
    }

    #[test]
    fn custom_matches_tail_by_default() {
        let c = compile(
            r#"
rule_configs:
  - { itemType: rule, id: r, rule_type: DOMAIN, value: a.com }
mosdns:
  direct_rules: [r]
  custom_matches:
    - { matches: "qtype 65", exec: "reject 0" }
    - { matches: [], exec: "accept" }
    - { matches: "qname $x", exec: "", enabled: true }
    - { matches: "qtype 28", exec: "reject 0", enabled: false }
"#,
        );
        assert_eq!(
            main_steps(&c.pipeline)[2..],
            [
                "qname $direct_rules -> goto china_dns".to_string(),
                "qtype 65 -> reject 0".to_string(),
                "$proxy_dns".to_string(),
            ]
        );
    }

    #[test]
    fn listeners() {
        let c = compile("mosdns:\n  listen: '127.0.0.1:5353'\n  listen_tcp: true\n");
        let servers: Vec<_> = c
            .pipeline
            .stages
            .iter()
            .filter(|s| s.tag.is_none())
            .map(|s| s.kind.clone())
            .collect();
        assert_eq!(
            servers,
            vec![
                StageKind::UdpServer {
                    entry: "sequence_main".into(),
                    listen: "127.0.0.1:5353".into()
                },
                StageKind::TcpServer {
                    entry: "sequence_main".into(),
                    listen: "127.0.0.1:5353".into()
                },
            ]
        );

        let c = compile("mosdns:\n  listener_enabled: false\n");
        assert!(c.pipeline.stages.iter().all(|s| s.tag.is_some()));
    }

    #[test]
    fn upstreams_from_text() {
        let c = compile("mosdns:\n  local_dns: \"114.114.114.114\\n119.29.29.29 bootstrap=223.5.5.5\"\n");
        let Some(Stage {
            kind: StageKind::Forward { upstreams, .. },
            ..
        }) = c.pipeline.get(TAG_FORWARD_REMOTE_FALLBACK)
        else {
            panic!("no fallback forwarder");
        };
        assert_eq!(upstreams.len(), 2);
        assert_eq!(upstreams[0].addr, "114.114.114.114");
        assert_eq!(upstreams[1].bootstrap.as_deref(), Some("223.5.5.5"));
    }

    #[test]
    fn incomplete_custom_entries() {
        let entries = vec![CustomMatchConfig {
            matches: MatchList::Lines("  \n".into()),
            exec: "accept".into(),
            enabled: true,
        }];
        assert!(custom_steps(&entries).is_empty());
    }
}
