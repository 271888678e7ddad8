//! Splitting the ordered policy list into rule-set plans, merged rule
//! buckets and decision branches.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use dnsroute_config::{
    ForwarderSettings, PolicyDocument, PolicyItem, Route, RuleItem, RuleSetBehavior, RuleSetItem,
    RuleType,
};
use dnsroute_core::defaults::RULE_PROXY_PATH;
use dnsroute_core::tags::{
    TAG_CHINA_DNS, TAG_DIRECT_IP_RULES, TAG_DIRECT_RULES, TAG_PROXY_DNS, TAG_PROXY_IP_RULES,
    TAG_PROXY_RULES,
};
use dnsroute_rules::{ConversionReport, convert_document, normalize_line};

use crate::content::{CompileOptions, Resolved, ResolvedContent};
use crate::pipeline::{Exec, Match, Step};
use crate::tags::{TagMap, allocate_tags, side_file_path};

/// Where a rule-set's matcher file comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSetSource {
    /// Canonical text, ready to write.
    Content(String),
    /// Location the downloader must fetch.
    Url(String),
}

/// A rule-set that made it into the pipeline.
#[derive(Debug, Clone)]
pub struct RuleSetPlan {
    pub id: String,
    pub tag: String,
    pub behavior: RuleSetBehavior,
    pub route: Route,
    pub path: String,
    pub source: RuleSetSource,
    /// Present when the list was converted in-process.
    pub report: Option<ConversionReport>,
}

impl RuleSetPlan {
    pub fn is_ip(&self) -> bool {
        self.behavior == RuleSetBehavior::Ipcidr
    }
}

/// One of the four merged files individual rules are folded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BucketKind {
    DirectDomain,
    ProxyDomain,
    DirectIp,
    ProxyIp,
}

impl BucketKind {
    /// Emission order of the bucket stages.
    pub const ALL: [BucketKind; 4] = [
        BucketKind::DirectDomain,
        BucketKind::ProxyDomain,
        BucketKind::DirectIp,
        BucketKind::ProxyIp,
    ];

    pub fn new(route: Route, ip: bool) -> Self {
        match (route, ip) {
            (Route::Direct, false) => BucketKind::DirectDomain,
            (Route::Proxy, false) => BucketKind::ProxyDomain,
            (Route::Direct, true) => BucketKind::DirectIp,
            (Route::Proxy, true) => BucketKind::ProxyIp,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            BucketKind::DirectDomain => TAG_DIRECT_RULES,
            BucketKind::ProxyDomain => TAG_PROXY_RULES,
            BucketKind::DirectIp => TAG_DIRECT_IP_RULES,
            BucketKind::ProxyIp => TAG_PROXY_IP_RULES,
        }
    }

    pub fn route(self) -> Route {
        match self {
            BucketKind::DirectDomain | BucketKind::DirectIp => Route::Direct,
            BucketKind::ProxyDomain | BucketKind::ProxyIp => Route::Proxy,
        }
    }

    pub fn is_ip(self) -> bool {
        matches!(self, BucketKind::DirectIp | BucketKind::ProxyIp)
    }

    pub fn path(self) -> String {
        side_file_path(self.tag())
    }

    fn index(self) -> usize {
        match self {
            BucketKind::DirectDomain => 0,
            BucketKind::ProxyDomain => 1,
            BucketKind::DirectIp => 2,
            BucketKind::ProxyIp => 3,
        }
    }
}

/// Individual rules folded into the four merged buckets.
#[derive(Debug, Clone, Default)]
pub struct RuleBuckets {
    lines: [Vec<String>; 4],
    assignments: HashMap<String, BucketKind>,
}

impl RuleBuckets {
    /// Fold every enabled, routed rule of `items` into its bucket.
    pub fn collect(items: &[&PolicyItem], settings: &ForwarderSettings) -> Self {
        let mut buckets = Self::default();
        for item in items {
            let PolicyItem::Rule(rule) = item else {
                continue;
            };
            if !rule.enabled {
                continue;
            }
            let Some(route) = settings.rule_route(&rule.id) else {
                continue;
            };
            let Some(line) = render_rule(rule) else {
                continue;
            };
            let kind = BucketKind::new(route, rule.rule_type.is_ip());
            buckets.lines[kind.index()].push(line);
            buckets.assignments.insert(rule.id.clone(), kind);
        }
        buckets
    }

    /// Matcher lines of a bucket, in document order.
    pub fn lines(&self, kind: BucketKind) -> &[String] {
        &self.lines[kind.index()]
    }

    /// File content of a bucket, or `None` when no rule landed in it.
    pub fn content(&self, kind: BucketKind) -> Option<String> {
        let lines = self.lines(kind);
        (!lines.is_empty()).then(|| lines.join("\n"))
    }

    /// Bucket a rule landed in.
    pub fn bucket_of(&self, rule_id: &str) -> Option<BucketKind> {
        self.assignments.get(rule_id).copied()
    }

    /// Non-empty buckets in emission order.
    pub fn non_empty(&self) -> impl Iterator<Item = BucketKind> + '_ {
        BucketKind::ALL
            .into_iter()
            .filter(|k| !self.lines(*k).is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(Vec::is_empty)
    }
}

/// Matcher line for a single rule; `None` for types or values the
/// forwarder cannot match on.
fn render_rule(rule: &RuleItem) -> Option<String> {
    let value = rule.value.trim();
    if value.is_empty() {
        debug!(rule = %rule.id, "rule has no value, skipping");
        return None;
    }
    let prefix = match &rule.rule_type {
        RuleType::Domain => "full",
        RuleType::DomainSuffix => "domain",
        RuleType::DomainKeyword => "keyword",
        RuleType::IpCidr | RuleType::IpCidr6 => {
            return match normalize_line(value) {
                Some(parsed) if parsed.kind.is_ip() => Some(parsed.value),
                _ => {
                    warn!(rule = %rule.id, value, "not an IP or CIDR, skipping");
                    None
                }
            };
        }
        RuleType::Unsupported(kind) => {
            debug!(rule = %rule.id, rule_type = %kind, "unsupported rule type, skipping");
            return None;
        }
    };
    Some(format!("{prefix}:{value}"))
}

/// A match-and-route entry of the decision sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    /// Id of the item that produced the branch (the first rule, for buckets).
    pub item_id: String,
    pub tag: String,
    pub ip: bool,
    pub route: Route,
}

impl Branch {
    pub fn step(&self) -> Step {
        let matcher = if self.ip {
            Match::RespIp(self.tag.clone())
        } else {
            Match::Qname(self.tag.clone())
        };
        Step::when(matcher, route_exec(self.route))
    }
}

/// Action that sends a query down a route.
pub fn route_exec(route: Route) -> Exec {
    match route {
        Route::Direct => Exec::Goto(TAG_CHINA_DNS.to_string()),
        Route::Proxy => Exec::Invoke(TAG_PROXY_DNS.to_string()),
    }
}

/// The policy list split into what the sequence builder emits.
#[derive(Debug, Clone)]
pub struct Partition {
    pub tags: TagMap,
    pub rulesets: Vec<RuleSetPlan>,
    pub buckets: RuleBuckets,
    /// Decision branches in document order.
    pub branches: Vec<Branch>,
    /// Rule-sets left out because their content could not be resolved.
    pub skipped: Vec<String>,
}

impl Partition {
    pub fn build(doc: &PolicyDocument, options: &CompileOptions, resolved: &ResolvedContent) -> Self {
        let items = doc.items();
        let items = unique_items(&items);
        let settings = &doc.mosdns;
        let base = effective_base(doc, options);

        let tags = allocate_tags(items.iter().filter_map(|item| match item {
            PolicyItem::RuleSet(set) => Some((set.id.as_str(), set.name.as_str())),
            _ => None,
        }));
        let buckets = RuleBuckets::collect(&items, settings);

        let mut rulesets = Vec::new();
        let mut branches = Vec::new();
        let mut skipped = Vec::new();
        let mut branched: HashSet<BucketKind> = HashSet::new();

        for item in &items {
            match item {
                PolicyItem::RuleSet(set) => {
                    if !set.enabled {
                        continue;
                    }
                    let Some(route) = settings.ruleset_route(&set.id) else {
                        continue;
                    };
                    let Some(entry) = tags.get(&set.id) else {
                        continue;
                    };
                    let Some((source, report)) =
                        resolve_source(set, resolved, base.as_deref(), settings.rule_proxy)
                    else {
                        skipped.push(set.id.clone());
                        continue;
                    };
                    let plan = RuleSetPlan {
                        id: set.id.clone(),
                        tag: entry.tag.clone(),
                        behavior: set.behavior,
                        route,
                        path: entry.file_path(),
                        source,
                        report,
                    };
                    branches.push(Branch {
                        item_id: plan.id.clone(),
                        tag: plan.tag.clone(),
                        ip: plan.is_ip(),
                        route,
                    });
                    rulesets.push(plan);
                }
                PolicyItem::Rule(rule) => {
                    let Some(kind) = buckets.bucket_of(&rule.id) else {
                        continue;
                    };
                    if branched.insert(kind) {
                        branches.push(Branch {
                            item_id: rule.id.clone(),
                            tag: kind.tag().to_string(),
                            ip: kind.is_ip(),
                            route: kind.route(),
                        });
                    }
                }
                PolicyItem::Other => {}
            }
        }

        debug!(
            rulesets = rulesets.len(),
            skipped = skipped.len(),
            branches = branches.len(),
            "policy partitioned"
        );

        Self {
            tags,
            rulesets,
            buckets,
            branches,
            skipped,
        }
    }
}

/// Items with an id, first occurrence of each id only.
pub fn unique_items(items: &[PolicyItem]) -> Vec<&PolicyItem> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(items.len());
    for item in items {
        let Some(id) = item.id() else {
            continue;
        };
        if !seen.insert(id) {
            warn!(id, "duplicate policy item id, keeping the first");
            continue;
        }
        unique.push(item);
    }
    unique
}

/// Base address used for site-relative URLs: the configured server domain,
/// else the caller's base URL.
pub fn effective_base(doc: &PolicyDocument, options: &CompileOptions) -> Option<String> {
    doc.server_domain()
        .or_else(|| {
            options
                .base_url
                .as_deref()
                .map(str::trim)
                .filter(|b| !b.is_empty())
        })
        .map(|b| b.trim_end_matches('/').to_string())
}

/// Qualify a site-relative URL against `base`.
pub fn qualify_url(url: &str, base: Option<&str>) -> String {
    match base {
        Some(base) if url.starts_with('/') => format!("{base}{url}"),
        _ => url.to_string(),
    }
}

/// URL the downloader fetches a rule-set from.
///
/// Through the conversion proxy the source is passed form-encoded in the
/// `url` query parameter; without a base the proxy URL stays site-relative.
pub fn fetch_url(url: &str, base: Option<&str>, rule_proxy: bool) -> String {
    let source = qualify_url(url, base);
    if !rule_proxy {
        return source;
    }
    let encoded: String = url::form_urlencoded::byte_serialize(source.as_bytes()).collect();
    format!("{}{RULE_PROXY_PATH}?url={encoded}", base.unwrap_or(""))
}

fn resolve_source(
    set: &RuleSetItem,
    resolved: &ResolvedContent,
    base: Option<&str>,
    rule_proxy: bool,
) -> Option<(RuleSetSource, Option<ConversionReport>)> {
    let convert = |text: &str| {
        let converted = convert_document(text);
        if converted.is_empty() {
            debug!(ruleset = %set.id, "rule-set converted to an empty list");
        }
        (
            RuleSetSource::Content(converted.text),
            Some(converted.report),
        )
    };

    match resolved.get(&set.id) {
        Some(Resolved::Available(text)) => Some(convert(text)),
        Some(Resolved::Unavailable) => {
            warn!(ruleset = %set.id, "rule-set content unavailable, skipping");
            None
        }
        None => {
            if let Some(text) = set.embedded_content() {
                Some(convert(text))
            } else if let Some(url) = set.source_url() {
                Some((RuleSetSource::Url(fetch_url(url, base, rule_proxy)), None))
            } else {
                warn!(ruleset = %set.id, "rule-set has no source, skipping");
                None
            }
        }
    }
}
