//! Rule-set content supplied by the caller and compile options.

use std::collections::HashMap;

/// Content state of one rule-set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Raw list text, in any supported syntax.
    Available(String),
    /// The caller tried and failed to obtain the list.
    Unavailable,
}

/// Rule-set contents already fetched by the caller, keyed by rule-set id.
///
/// Ids not present here fall back to the rule-set's own source: embedded
/// content is converted in place, a URL becomes a download entry.
#[derive(Debug, Clone, Default)]
pub struct ResolvedContent {
    entries: HashMap<String, Resolved>,
}

impl ResolvedContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_available(&mut self, id: impl Into<String>, text: impl Into<String>) {
        self.entries
            .insert(id.into(), Resolved::Available(text.into()));
    }

    pub fn mark_unavailable(&mut self, id: impl Into<String>) {
        self.entries.insert(id.into(), Resolved::Unavailable);
    }

    pub fn get(&self, id: &str) -> Option<&Resolved> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Caller-side inputs that are not part of the policy document.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Address of the management server; `system_config.server_domain`
    /// takes precedence when set.
    pub base_url: Option<String>,
}

impl CompileOptions {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
        }
    }
}
