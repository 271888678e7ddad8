//! Fixed stage tags of the compiled pipeline.
//!
//! Rule-set tags are allocated at compile time and must never shadow one of
//! these names.

/// Response cache.
pub const TAG_CACHE: &str = "lazy_cache";
/// Local (domestic) forwarder.
pub const TAG_FORWARD_LOCAL: &str = "forward_local";
/// Remote (proxied) forwarder.
pub const TAG_FORWARD_REMOTE: &str = "forward_remote";
/// Remote-fallback forwarder.
pub const TAG_FORWARD_REMOTE_FALLBACK: &str = "forward_remote_fallback";
/// Custom hosts override.
pub const TAG_CUSTOM_HOSTS: &str = "custom_hosts";
/// Remote resolve sequence (with TTL floor).
pub const TAG_REMOTE_DNS: &str = "remote_dns";
/// Remote-fallback resolve sequence.
pub const TAG_REMOTE_DNS_FALLBACK: &str = "remote_dns_fallback";
/// Primary/secondary failover over the two remote sequences.
pub const TAG_PROXY_DNS: &str = "proxy_dns";
/// Local resolve sequence (cache first).
pub const TAG_CHINA_DNS: &str = "china_dns";
/// Merged direct domain rules.
pub const TAG_DIRECT_RULES: &str = "direct_rules";
/// Merged proxied domain rules.
pub const TAG_PROXY_RULES: &str = "proxy_rules";
/// Merged direct IP rules.
pub const TAG_DIRECT_IP_RULES: &str = "direct_ip_rules";
/// Merged proxied IP rules.
pub const TAG_PROXY_IP_RULES: &str = "proxy_ip_rules";
/// Decision sequence the listener enters.
pub const TAG_SEQUENCE_MAIN: &str = "sequence_main";
/// Name passed to the metrics tap.
pub const METRICS_COLLECTOR_NAME: &str = "metrics";

/// Every tag the compiler emits on its own.
pub const RESERVED_TAGS: [&str; 14] = [
    TAG_CACHE,
    TAG_FORWARD_LOCAL,
    TAG_FORWARD_REMOTE,
    TAG_FORWARD_REMOTE_FALLBACK,
    TAG_CUSTOM_HOSTS,
    TAG_REMOTE_DNS,
    TAG_REMOTE_DNS_FALLBACK,
    TAG_PROXY_DNS,
    TAG_CHINA_DNS,
    TAG_DIRECT_RULES,
    TAG_PROXY_RULES,
    TAG_DIRECT_IP_RULES,
    TAG_PROXY_IP_RULES,
    TAG_SEQUENCE_MAIN,
];

/// Returns true if `tag` is emitted by the compiler itself.
pub fn is_reserved(tag: &str) -> bool {
    RESERVED_TAGS.contains(&tag)
}
