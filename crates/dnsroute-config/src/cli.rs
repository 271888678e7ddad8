//! CLI override definitions and application logic.

use clap::Parser;

use crate::PolicyDocument;
use crate::types::{DefaultForward, Placement};

#[derive(Debug, Clone, Parser, Default)]
pub struct CliOverrides {
    /// Base URL of the management server, used when system_config.server_domain is empty
    #[arg(long)]
    pub base_url: Option<String>,
    /// Override the route for unmatched queries (forward_local | forward_remote)
    #[arg(long)]
    pub default_forward: Option<String>,
    /// Override where custom matches go (head | tail)
    #[arg(long)]
    pub custom_match_position: Option<String>,
    /// Override the forwarder log level
    #[arg(long)]
    pub forwarder_log_level: Option<String>,
    /// Override the forwarder log file
    #[arg(long)]
    pub forwarder_log_file: Option<String>,
    /// Omit the forwarder log section
    #[arg(long)]
    pub disable_forwarder_log: bool,
    /// Override the management API address, e.g. 127.0.0.1:8338
    #[arg(long)]
    pub api_address: Option<String>,
    /// Omit the management API section
    #[arg(long)]
    pub disable_api: bool,
    /// Override the DNS listen address, e.g. :5353
    #[arg(long)]
    pub listen: Option<String>,
    /// Also listen on TCP
    #[arg(long)]
    pub listen_tcp: bool,
    /// Omit the listener stage
    #[arg(long)]
    pub disable_listener: bool,
    /// Download remote rule-sets directly instead of through the conversion proxy
    #[arg(long)]
    pub no_rule_proxy: bool,
    /// Override this process's log level (trace/debug/info/warn/error)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Apply command-line overrides to a loaded document.
///
/// `base_url` is not part of the document; the compile command reads it
/// directly.
pub fn apply_overrides(doc: &mut PolicyDocument, overrides: &CliOverrides) {
    let fw = &mut doc.mosdns;
    if let Some(v) = &overrides.default_forward {
        fw.default_forward = DefaultForward::from(v.clone());
    }
    if let Some(v) = &overrides.custom_match_position {
        fw.custom_match_position = Placement::from(v.clone());
    }
    if let Some(v) = &overrides.forwarder_log_level {
        fw.log_level = v.clone();
    }
    if let Some(v) = &overrides.forwarder_log_file {
        fw.log_file = v.clone();
    }
    if overrides.disable_forwarder_log {
        fw.log_enabled = false;
    }
    if let Some(v) = &overrides.api_address {
        fw.api_address = v.clone();
    }
    if overrides.disable_api {
        fw.api_enabled = false;
    }
    if let Some(v) = &overrides.listen {
        fw.listen = v.clone();
    }
    if overrides.listen_tcp {
        fw.listen_tcp = true;
    }
    if overrides.disable_listener {
        fw.listener_enabled = false;
    }
    if overrides.no_rule_proxy {
        fw.rule_proxy = false;
    }
    if let Some(v) = &overrides.log_level {
        doc.logging.level = Some(v.clone());
    }
}
