//! Default configuration values.
//!
//! Centralized default constants for use across all crates.

// ============================================================================
// Forwarder Section Defaults
// ============================================================================

/// Forwarder log section enabled by default.
pub const DEFAULT_LOG_ENABLED: bool = true;
/// Default forwarder log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";
/// Default forwarder log file.
pub const DEFAULT_LOG_FILE: &str = "./mosdns.log";
/// Management API section enabled by default.
pub const DEFAULT_API_ENABLED: bool = true;
/// Default management API listen address.
pub const DEFAULT_API_ADDRESS: &str = "0.0.0.0:8338";
/// Listener plugin enabled by default.
pub const DEFAULT_LISTENER_ENABLED: bool = true;
/// Default DNS listen address.
pub const DEFAULT_LISTEN: &str = ":53";
/// Emit a TCP listener next to the UDP one.
pub const DEFAULT_LISTEN_TCP: bool = false;
/// Route remote rule-set downloads through the conversion proxy.
pub const DEFAULT_RULE_PROXY: bool = true;

// ============================================================================
// Cache Defaults
// ============================================================================

/// Response cache capacity (entries).
pub const DEFAULT_CACHE_SIZE: u32 = 10240;
/// Grace period for serving expired entries, in seconds.
pub const DEFAULT_LAZY_CACHE_TTL_SECS: u32 = 21600;
/// Cache persistence file.
pub const DEFAULT_CACHE_DUMP_FILE: &str = "./cache.dump";
/// Cache persistence interval in seconds.
pub const DEFAULT_CACHE_DUMP_INTERVAL_SECS: u32 = 300;

// ============================================================================
// Upstream Defaults
// ============================================================================

/// Built-in local (domestic) resolvers.
pub const DEFAULT_LOCAL_UPSTREAMS: [&str; 2] = ["223.5.5.5", "119.29.29.29"];
/// Built-in remote (proxied) resolvers.
pub const DEFAULT_REMOTE_UPSTREAMS: [&str; 2] =
    ["https://1.1.1.1/dns-query", "https://dns.google/dns-query"];
/// Parallel queries issued by the local forwarder.
pub const DEFAULT_LOCAL_CONCURRENT: u32 = 10;
/// Parallel queries issued by the remote forwarder.
pub const DEFAULT_REMOTE_CONCURRENT: u32 = 5;
/// Parallel queries issued by the remote-fallback forwarder.
pub const DEFAULT_FALLBACK_CONCURRENT: u32 = 10;

// ============================================================================
// Resolution Policy Defaults
// ============================================================================

/// Primary/secondary race threshold in milliseconds.
pub const DEFAULT_FALLBACK_THRESHOLD_MS: u32 = 500;
/// TTL floor applied to answers from the remote path.
pub const DEFAULT_REMOTE_TTL_FLOOR: u32 = 1;
/// Response code used when a forwarder produced no answer (REFUSED).
pub const REJECT_RCODE_REFUSED: u8 = 3;

// ============================================================================
// Side File Layout
// ============================================================================

/// Directory every side file lives in, relative to the forwarder's working dir.
pub const RULES_DIR: &str = "./rules";
/// Extension used for matcher files.
pub const RULE_FILE_EXT: &str = "txt";
/// Path of the conversion proxy endpoint, relative to the external base.
pub const RULE_PROXY_PATH: &str = "/api/mosdns/rule-proxy";
/// Prefix stripped from rule-set identifiers when deriving tags.
pub const RULESET_ID_PREFIX: &str = "ruleset_";
