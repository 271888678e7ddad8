//! Policy document types: items, forwarder settings, system and logging.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::defaults::*;

/// The routing policy a pipeline is compiled from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyDocument {
    /// Ordered rules and rule-sets; position is precedence.
    #[serde(default)]
    pub rule_configs: Vec<PolicyItem>,
    /// Older documents keep rules and rule-sets in separate lists.
    #[serde(default)]
    pub rules: Vec<RuleItem>,
    #[serde(default)]
    pub rule_sets: Vec<RuleSetItem>,
    #[serde(default)]
    pub system_config: SystemConfig,
    #[serde(default, alias = "forwarder")]
    pub mosdns: ForwarderSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl PolicyDocument {
    /// Ordered items. Without `rule_configs`, the legacy lists are joined as
    /// rule-sets first, then rules.
    pub fn items(&self) -> Cow<'_, [PolicyItem]> {
        if !self.rule_configs.is_empty() {
            return Cow::Borrowed(&self.rule_configs);
        }
        let legacy: Vec<PolicyItem> = self
            .rule_sets
            .iter()
            .cloned()
            .map(PolicyItem::RuleSet)
            .chain(self.rules.iter().cloned().map(PolicyItem::Rule))
            .collect();
        Cow::Owned(legacy)
    }

    /// External base address, when one is configured.
    pub fn server_domain(&self) -> Option<&str> {
        let domain = self.system_config.server_domain.trim();
        (!domain.is_empty()).then_some(domain)
    }
}

/// One entry of the ordered policy list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "itemType", rename_all = "lowercase")]
pub enum PolicyItem {
    Rule(RuleItem),
    RuleSet(RuleSetItem),
    /// Item kinds this compiler does not act on.
    #[serde(other)]
    Other,
}

impl PolicyItem {
    pub fn id(&self) -> Option<&str> {
        match self {
            PolicyItem::Rule(r) => Some(&r.id),
            PolicyItem::RuleSet(s) => Some(&s.id),
            PolicyItem::Other => None,
        }
    }

    pub fn enabled(&self) -> bool {
        match self {
            PolicyItem::Rule(r) => r.enabled,
            PolicyItem::RuleSet(s) => s.enabled,
            PolicyItem::Other => false,
        }
    }
}

/// A single matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleItem {
    pub id: String,
    #[serde(default)]
    pub rule_type: RuleType,
    #[serde(default)]
    pub value: String,
    /// Client-side policy name; not used by the forwarder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Matcher type of a single rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RuleType {
    Domain,
    DomainSuffix,
    DomainKeyword,
    IpCidr,
    IpCidr6,
    /// Any type the forwarder has no matcher for (GEOIP, PROCESS-NAME, …).
    Unsupported(String),
}

impl RuleType {
    pub fn as_str(&self) -> &str {
        match self {
            RuleType::Domain => "DOMAIN",
            RuleType::DomainSuffix => "DOMAIN-SUFFIX",
            RuleType::DomainKeyword => "DOMAIN-KEYWORD",
            RuleType::IpCidr => "IP-CIDR",
            RuleType::IpCidr6 => "IP-CIDR6",
            RuleType::Unsupported(s) => s,
        }
    }

    pub fn is_ip(&self) -> bool {
        matches!(self, RuleType::IpCidr | RuleType::IpCidr6)
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, RuleType::Unsupported(_))
    }
}

impl Default for RuleType {
    fn default() -> Self {
        RuleType::Unsupported(String::new())
    }
}

impl From<String> for RuleType {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "DOMAIN" => RuleType::Domain,
            "DOMAIN-SUFFIX" => RuleType::DomainSuffix,
            "DOMAIN-KEYWORD" => RuleType::DomainKeyword,
            "IP-CIDR" => RuleType::IpCidr,
            "IP-CIDR6" => RuleType::IpCidr6,
            _ => RuleType::Unsupported(s),
        }
    }
}

impl From<RuleType> for String {
    fn from(t: RuleType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, externally sourced rule list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSetItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub behavior: RuleSetBehavior,
    /// Remote (`https://…`) or site-relative (`/…`) location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// List text stored in the document itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl RuleSetItem {
    pub fn source_url(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }

    pub fn embedded_content(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.trim().is_empty())
    }

    pub fn has_source(&self) -> bool {
        self.source_url().is_some() || self.embedded_content().is_some()
    }
}

/// What a rule-set's entries match on. Unknown values read as `domain`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RuleSetBehavior {
    #[default]
    Domain,
    Ipcidr,
    Classical,
}

impl RuleSetBehavior {
    pub fn as_str(self) -> &'static str {
        match self {
            RuleSetBehavior::Domain => "domain",
            RuleSetBehavior::Ipcidr => "ipcidr",
            RuleSetBehavior::Classical => "classical",
        }
    }
}

impl From<String> for RuleSetBehavior {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "ipcidr" => RuleSetBehavior::Ipcidr,
            "classical" => RuleSetBehavior::Classical,
            _ => RuleSetBehavior::Domain,
        }
    }
}

impl From<RuleSetBehavior> for String {
    fn from(b: RuleSetBehavior) -> Self {
        b.as_str().to_string()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemConfig {
    /// External base address of the management server.
    #[serde(default)]
    pub server_domain: String,
}

/// Routing class of a rule or rule-set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Direct,
    Proxy,
}

/// Settings of the generated forwarder pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwarderSettings {
    #[serde(default)]
    pub direct_rulesets: Vec<String>,
    #[serde(default)]
    pub proxy_rulesets: Vec<String>,
    #[serde(default)]
    pub direct_rules: Vec<String>,
    #[serde(default)]
    pub proxy_rules: Vec<String>,

    /// Upstreams as free text or structured YAML; see `dnsroute_dns::parse_upstream_value`.
    #[serde(default)]
    pub local_dns: serde_yaml::Value,
    #[serde(default)]
    pub remote_dns: serde_yaml::Value,
    #[serde(default)]
    pub fallback_dns: serde_yaml::Value,

    /// `domain ip` lines.
    #[serde(default)]
    pub custom_hosts: String,
    #[serde(default)]
    pub custom_matches: Vec<CustomMatchConfig>,
    #[serde(default)]
    pub custom_match_position: Placement,
    #[serde(default)]
    pub default_forward: DefaultForward,
    /// Base forwarder document (YAML) merged under the generated sections.
    #[serde(default)]
    pub custom_config: String,

    #[serde(default = "default_log_enabled")]
    pub log_enabled: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_file")]
    pub log_file: String,

    #[serde(default = "default_api_enabled")]
    pub api_enabled: bool,
    #[serde(default = "default_api_address")]
    pub api_address: String,

    #[serde(default = "default_listener_enabled")]
    pub listener_enabled: bool,
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_listen_tcp")]
    pub listen_tcp: bool,

    /// Fetch remote rule-sets through the conversion proxy.
    #[serde(default = "default_rule_proxy")]
    pub rule_proxy: bool,
}

impl Default for ForwarderSettings {
    fn default() -> Self {
        Self {
            direct_rulesets: Vec::new(),
            proxy_rulesets: Vec::new(),
            direct_rules: Vec::new(),
            proxy_rules: Vec::new(),
            local_dns: serde_yaml::Value::Null,
            remote_dns: serde_yaml::Value::Null,
            fallback_dns: serde_yaml::Value::Null,
            custom_hosts: String::new(),
            custom_matches: Vec::new(),
            custom_match_position: Placement::default(),
            default_forward: DefaultForward::default(),
            custom_config: String::new(),
            log_enabled: default_log_enabled(),
            log_level: default_log_level(),
            log_file: default_log_file(),
            api_enabled: default_api_enabled(),
            api_address: default_api_address(),
            listener_enabled: default_listener_enabled(),
            listen: default_listen(),
            listen_tcp: default_listen_tcp(),
            rule_proxy: default_rule_proxy(),
        }
    }
}

impl ForwarderSettings {
    /// Route of a rule-set. Membership in both lists resolves to direct.
    pub fn ruleset_route(&self, id: &str) -> Option<Route> {
        route_of(&self.direct_rulesets, &self.proxy_rulesets, id)
    }

    /// Route of a single rule. Membership in both lists resolves to direct.
    pub fn rule_route(&self, id: &str) -> Option<Route> {
        route_of(&self.direct_rules, &self.proxy_rules, id)
    }
}

fn route_of(direct: &[String], proxy: &[String], id: &str) -> Option<Route> {
    if direct.iter().any(|d| d == id) {
        Some(Route::Direct)
    } else if proxy.iter().any(|p| p == id) {
        Some(Route::Proxy)
    } else {
        None
    }
}

/// A hand-written decision-sequence entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomMatchConfig {
    #[serde(default)]
    pub matches: MatchList,
    #[serde(default)]
    pub exec: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Match conditions as one multi-line string or a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MatchList {
    Lines(String),
    List(Vec<String>),
}

impl Default for MatchList {
    fn default() -> Self {
        MatchList::List(Vec::new())
    }
}

impl MatchList {
    /// Non-empty, trimmed conditions in order.
    pub fn conditions(&self) -> Vec<String> {
        let items: Vec<&str> = match self {
            MatchList::Lines(s) => s.lines().collect(),
            MatchList::List(v) => v.iter().map(String::as_str).collect(),
        };
        items
            .into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Where custom entries go in the decision sequence. Unknown values read as `tail`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Placement {
    Head,
    #[default]
    Tail,
}

impl From<String> for Placement {
    fn from(s: String) -> Self {
        if s.trim().eq_ignore_ascii_case("head") {
            Placement::Head
        } else {
            Placement::Tail
        }
    }
}

impl From<Placement> for String {
    fn from(p: Placement) -> Self {
        match p {
            Placement::Head => "head".into(),
            Placement::Tail => "tail".into(),
        }
    }
}

/// Route for queries no rule matched. Unknown values read as `forward_remote`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DefaultForward {
    ForwardLocal,
    #[default]
    ForwardRemote,
}

impl From<String> for DefaultForward {
    fn from(s: String) -> Self {
        if s.trim().eq_ignore_ascii_case("forward_local") {
            DefaultForward::ForwardLocal
        } else {
            DefaultForward::ForwardRemote
        }
    }
}

impl From<DefaultForward> for String {
    fn from(d: DefaultForward) -> Self {
        match d {
            DefaultForward::ForwardLocal => "forward_local".into(),
            DefaultForward::ForwardRemote => "forward_remote".into(),
        }
    }
}

/// Logging of the dnsroute process itself.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: Option<String>,
    /// Log format: json, pretty, or compact. Default: pretty.
    pub format: Option<String>,
    /// Output target: stdout or stderr. Default: stderr.
    pub output: Option<String>,
    /// Per-module log level filters (e.g., {"dnsroute_rules": "debug"}).
    #[serde(default)]
    pub filters: HashMap<String, String>,
}
