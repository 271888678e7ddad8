#![allow(clippy::tests_outside_test_module)]
use std::collections::HashSet;

use dnsroute_compiler::{
    CompileOptions, Exec, Match, Pipeline, ResolvedContent, SideFileSource, Stage, StageKind, Step,
    build, compile,
};
use dnsroute_config::PolicyDocument;
use dnsroute_dns::UpstreamDescriptor;
use dnsroute_rules::{
    DocumentFormat, MatcherKind, NormalizedRule, RuleSetMatcher, convert_document,
    detect_document_format, normalize_line,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_test_writer()
        .try_init();
}

fn policy(yaml: &str) -> PolicyDocument {
    serde_yaml::from_str(yaml).unwrap()
}

fn stage<'a>(p: &'a Pipeline, tag: &str) -> &'a Stage {
    p.get(tag).unwrap_or_else(|| panic!("no stage {tag}"))
}

fn main_steps(p: &Pipeline) -> &[Step] {
    match &stage(p, "sequence_main").kind {
        StageKind::Sequence(steps) => steps,
        other => panic!("sequence_main is {}", other.type_name()),
    }
}

fn branch_targets(p: &Pipeline) -> Vec<String> {
    main_steps(p)
        .iter()
        .flat_map(|s| s.matches.iter())
        .filter_map(|m| match m {
            Match::Qname(t) | Match::RespIp(t) => Some(t.clone()),
            _ => None,
        })
        .collect()
}

fn upstreams<'a>(p: &'a Pipeline, tag: &str) -> &'a [UpstreamDescriptor] {
    match &stage(p, tag).kind {
        StageKind::Forward { upstreams, .. } => upstreams,
        other => panic!("{tag} is {}", other.type_name()),
    }
}

#[test]
fn proxied_ruleset_with_default_upstreams() {
    init_tracing();
    let doc = policy(
        r#"
rule_configs:
  - { itemType: ruleset, id: r1, name: ads, behavior: domain, url: "https://lists.example/ads.txt" }
mosdns:
  proxy_rulesets: [r1]
  remote_dns: ""
"#,
    );
    let c = build(&doc, &CompileOptions::default(), &ResolvedContent::new());

    let sets: Vec<_> = c
        .pipeline
        .stages
        .iter()
        .filter(|s| matches!(s.kind, StageKind::DomainSet { .. }))
        .collect();
    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].tag.as_deref(), Some("ads"));

    assert!(main_steps(&c.pipeline).contains(&Step::when(
        Match::Qname("ads".into()),
        Exec::Invoke("proxy_dns".into())
    )));

    let remote: Vec<_> = upstreams(&c.pipeline, "forward_remote")
        .iter()
        .map(|u| u.addr.as_str())
        .collect();
    assert_eq!(remote, vec!["https://1.1.1.1/dns-query", "https://dns.google/dns-query"]);

    let local = upstreams(&c.pipeline, "forward_local").to_vec();
    let mut fallback = upstreams(&c.pipeline, "forward_remote_fallback").to_vec();
    assert_eq!(fallback, local);
    fallback[0].addr = "changed".into();
    assert_eq!(upstreams(&c.pipeline, "forward_local")[0].addr, "223.5.5.5");
    assert_eq!(upstreams(&c.pipeline, "forward_remote_fallback")[0].addr, "223.5.5.5");

    // no YAML anchors between the two groups
    let out = compile(&doc, &CompileOptions::default(), &ResolvedContent::new()).unwrap();
    assert!(!out.artifact.content.contains('&'));
    assert!(!out.artifact.content.contains('*'));
}

#[test]
fn same_name_rulesets_get_counters() {
    let doc = policy(
        r#"
rule_configs:
  - { itemType: ruleset, id: a, name: cn, content: "+.cn" }
  - { itemType: ruleset, id: b, name: cn, content: "+.com.cn" }
mosdns:
  direct_rulesets: [a, b]
"#,
    );
    let c = build(&doc, &CompileOptions::default(), &ResolvedContent::new());
    let tags: Vec<_> = c.partition.rulesets.iter().map(|p| p.tag.as_str()).collect();
    assert_eq!(tags, vec!["cn", "cn_2"]);
    assert_eq!(branch_targets(&c.pipeline), vec!["cn", "cn_2"]);
    assert_eq!(c.manifest.files[1].path, "./rules/cn_2.txt");
}

#[test]
fn wildcard_kinds_are_distinct() {
    let converted = convert_document("+.example.com\n.example.com\n*.example.com\n");
    let kinds: Vec<_> = converted.rules.iter().map(|r| r.kind).collect();
    assert_eq!(
        kinds,
        vec![
            MatcherKind::Suffix,
            MatcherKind::SubdomainOnly,
            MatcherKind::DirectSubdomain
        ]
    );

    let expect = [
        // (rule, example.com, www.example.com, a.b.example.com)
        (&converted.rules[0], true, true, true),
        (&converted.rules[1], false, true, true),
        (&converted.rules[2], false, true, false),
    ];
    for (rule, apex, www, deep) in expect {
        let m = RuleSetMatcher::build([rule]).unwrap();
        assert_eq!(m.matches("example.com"), apex, "{rule}");
        assert_eq!(m.matches("www.example.com"), www, "{rule}");
        assert_eq!(m.matches("a.b.example.com"), deep, "{rule}");
    }
}

#[test]
fn head_overrides_precede_rule_branches() {
    let doc = policy(
        r#"
rule_configs:
  - { itemType: ruleset, id: s, name: streaming, content: "+.video.example" }
mosdns:
  proxy_rulesets: [s]
  custom_hosts: "nas.lan 192.168.1.2"
  custom_match_position: head
  custom_matches:
    - { matches: ["qtype 65"], exec: "reject 0" }
"#,
    );
    let c = build(&doc, &CompileOptions::default(), &ResolvedContent::new());
    let steps = main_steps(&c.pipeline);
    let rendered: Vec<String> = steps.iter().map(|s| s.exec.to_string()).collect();
    assert_eq!(
        rendered,
        vec![
            "metrics_collector metrics",
            "prefer_ipv4",
            "$custom_hosts",
            "accept",
            "reject 0",
            "$proxy_dns",
            "$proxy_dns",
        ]
    );
    assert_eq!(steps[4].matches, vec![Match::Raw("qtype 65".into())]);
    assert_eq!(steps[5].matches, vec![Match::Qname("streaming".into())]);
}

#[test]
fn unavailable_ruleset_is_left_out() {
    init_tracing();
    let doc = policy(
        r#"
rule_configs:
  - { itemType: ruleset, id: ok, name: ok, url: "https://x/ok.txt" }
  - { itemType: ruleset, id: down, name: down, url: "https://x/down.txt" }
mosdns:
  direct_rulesets: [ok, down]
"#,
    );
    let mut resolved = ResolvedContent::new();
    resolved.insert_available("ok", "DOMAIN-SUFFIX,ok.example");
    resolved.mark_unavailable("down");

    let c = build(&doc, &CompileOptions::default(), &resolved);
    assert!(c.pipeline.get("down").is_none());
    assert!(c.pipeline.get("ok").is_some());
    assert_eq!(branch_targets(&c.pipeline), vec!["ok"]);
    assert!(c.manifest.get("./rules/down.txt").is_none());
    assert_eq!(
        c.manifest.get("./rules/ok.txt").map(|f| f.source.clone()),
        Some(SideFileSource::Content("domain:ok.example".into()))
    );
    assert_eq!(c.partition.skipped, vec!["down"]);
}

#[test]
fn clash_and_canonical_agree() {
    let expected = NormalizedRule::new(MatcherKind::Suffix, "foo.com");
    assert_eq!(normalize_line("DOMAIN-SUFFIX,foo.com"), Some(expected.clone()));
    assert_eq!(normalize_line("domain:foo.com"), Some(expected));
}

#[test]
fn compilation_is_idempotent() {
    let yaml = r#"
rule_configs:
  - { itemType: ruleset, id: a, name: ads, url: "/rules/ads.list" }
  - { itemType: rule, id: r1, rule_type: DOMAIN-SUFFIX, value: a.com }
  - { itemType: rule, id: r2, rule_type: IP-CIDR, value: 10.0.0.0/8 }
system_config:
  server_domain: "https://panel.example"
mosdns:
  proxy_rulesets: [a]
  direct_rules: [r1, r2]
  custom_config: |
    zeta: 1
    alpha: {b: 2, a: 1}
  local_dns: |
    - addr: tls://1.12.12.12
      enable_pipeline: true
"#;
    let doc = policy(yaml);
    let first = compile(&doc, &CompileOptions::default(), &ResolvedContent::new()).unwrap();
    let second = compile(&policy(yaml), &CompileOptions::default(), &ResolvedContent::new()).unwrap();
    assert_eq!(first.artifact, second.artifact);
    assert_eq!(first.compiled.manifest, second.compiled.manifest);
    assert!(first.artifact.content.find("zeta").unwrap() < first.artifact.content.find("alpha").unwrap());
}

#[test]
fn branches_keep_document_order() {
    let doc = policy(
        r#"
rule_configs:
  - { itemType: rule, id: r1, rule_type: IP-CIDR, value: 1.1.1.0/24 }
  - { itemType: ruleset, id: s1, name: first, content: "+.one" }
  - { itemType: rule, id: r2, rule_type: DOMAIN, value: two.example }
  - { itemType: ruleset, id: s2, name: second, behavior: ipcidr, content: "10.0.0.0/8" }
mosdns:
  direct_rules: [r1]
  proxy_rules: [r2]
  direct_rulesets: [s1]
  proxy_rulesets: [s2]
  custom_matches:
    - { matches: "qname $first", exec: "accept" }
"#,
    );
    let c = build(&doc, &CompileOptions::default(), &ResolvedContent::new());
    assert_eq!(
        branch_targets(&c.pipeline),
        vec!["direct_ip_rules", "first", "proxy_rules", "second"]
    );
    // tail override after every rule branch
    let steps = main_steps(&c.pipeline);
    assert_eq!(steps[steps.len() - 2].exec, Exec::Raw("accept".into()));
    assert!(matches!(stage(&c.pipeline, "second").kind, StageKind::IpSet { .. }));
}

#[test]
fn tags_are_unique() {
    let doc = policy(
        r#"
rule_configs:
  - { itemType: ruleset, id: a, name: geo }
  - { itemType: ruleset, id: b, name: geo_2 }
  - { itemType: ruleset, id: c, name: geo }
  - { itemType: ruleset, id: d, name: direct_rules }
  - { itemType: ruleset, id: ruleset_geo, name: "" }
"#,
    );
    let tags = dnsroute_compiler::allocate_tags(doc.items().iter().filter_map(|i| match i {
        dnsroute_config::PolicyItem::RuleSet(s) => Some((s.id.as_str(), s.name.as_str())),
        _ => None,
    }));
    let all: Vec<_> = tags.iter().map(|e| e.tag.clone()).collect();
    let distinct: HashSet<_> = all.iter().collect();
    assert_eq!(distinct.len(), all.len());
    assert_eq!(all, vec!["geo", "geo_2", "geo_3", "direct_rules_2", "geo_4"]);
}

#[test]
fn merged_bucket_has_one_branch() {
    let doc = policy(
        r#"
rule_configs:
  - { itemType: rule, id: r1, rule_type: DOMAIN, value: a.example }
  - { itemType: rule, id: r2, rule_type: DOMAIN-SUFFIX, value: b.example }
  - { itemType: rule, id: r3, rule_type: DOMAIN-KEYWORD, value: tracker }
mosdns:
  proxy_rules: [r1, r2, r3]
"#,
    );
    let c = build(&doc, &CompileOptions::default(), &ResolvedContent::new());
    assert_eq!(branch_targets(&c.pipeline), vec!["proxy_rules"]);
    assert_eq!(
        c.manifest.get("./rules/proxy_rules.txt").map(|f| f.source.clone()),
        Some(SideFileSource::Content(
            "full:a.example\ndomain:b.example\nkeyword:tracker".into()
        ))
    );
}

#[test]
fn unreferenced_items_produce_nothing() {
    let doc = policy(
        r#"
rule_configs:
  - { itemType: ruleset, id: s1, name: unused, content: "+.x" }
  - { itemType: rule, id: r1, rule_type: DOMAIN, value: unused.example }
  - { itemType: ruleset, id: s2, name: off, content: "+.y", enabled: false }
mosdns:
  direct_rulesets: [s2]
"#,
    );
    let c = build(&doc, &CompileOptions::default(), &ResolvedContent::new());
    assert!(c.pipeline.get("unused").is_none());
    assert!(c.pipeline.get("off").is_none());
    assert!(c.pipeline.get("direct_rules").is_none());
    assert!(branch_targets(&c.pipeline).is_empty());
    assert!(c.manifest.is_empty());
}

#[test]
fn canonical_documents_round_trip() {
    let text = "domain:a.com\nfull:b.com\nkeyword:ads\nregexp:^track\\.";
    assert_eq!(detect_document_format(text), DocumentFormat::AlreadyCanonical);
    assert_eq!(convert_document(text).text, text);
    for line in text.lines() {
        let rule = normalize_line(line).unwrap();
        assert_eq!(rule.canonical_line(), line);
    }

    assert_eq!(normalize_line("regex:^x").unwrap().canonical_line(), "regexp:^x");
    assert_eq!(normalize_line("ip:10.0.0.0/8").unwrap().canonical_line(), "10.0.0.0/8");
}

#[test]
fn every_reference_points_backwards() {
    let doc = policy(
        r#"
rule_configs:
  - { itemType: ruleset, id: s, name: s, url: "https://x/s" }
  - { itemType: rule, id: r, rule_type: IP-CIDR6, value: "2001:db8::/32" }
mosdns:
  direct_rulesets: [s]
  proxy_rules: [r]
  custom_hosts: "a.lan 10.0.0.1"
  listen_tcp: true
"#,
    );
    let c = build(&doc, &CompileOptions::default(), &ResolvedContent::new());
    assert!(c.pipeline.dangling_references().is_empty());

    let defined: Vec<_> = c.pipeline.tags().collect();
    for file in c.pipeline.stages.iter().flat_map(|s| s.kind.files()) {
        assert!(c.manifest.get(file).is_some(), "{file} missing from manifest; stages {defined:?}");
    }
}
