//! Default value functions for serde deserialization.
//!
//! These functions forward to constants defined in `dnsroute_core::defaults`.

use dnsroute_core::defaults;

/// Generate default value functions that forward to dnsroute_core::defaults constants.
macro_rules! default_fns {
    ($($fn_name:ident => $const_name:ident : $ty:ty),* $(,)?) => {
        $(
            pub(crate) fn $fn_name() -> $ty {
                defaults::$const_name
            }
        )*
    };
}

/// Generate default value functions that return String from &str constants.
macro_rules! default_string_fns {
    ($($fn_name:ident => $const_name:ident),* $(,)?) => {
        $(
            pub(crate) fn $fn_name() -> String {
                defaults::$const_name.to_string()
            }
        )*
    };
}

default_fns! {
    default_log_enabled      => DEFAULT_LOG_ENABLED: bool,
    default_api_enabled      => DEFAULT_API_ENABLED: bool,
    default_listener_enabled => DEFAULT_LISTENER_ENABLED: bool,
    default_listen_tcp       => DEFAULT_LISTEN_TCP: bool,
    default_rule_proxy       => DEFAULT_RULE_PROXY: bool,
}

default_string_fns! {
    default_log_level   => DEFAULT_LOG_LEVEL,
    default_log_file    => DEFAULT_LOG_FILE,
    default_api_address => DEFAULT_API_ADDRESS,
    default_listen      => DEFAULT_LISTEN,
}

pub(crate) fn default_true() -> bool {
    true
}
