//! Policy validation.
//!
//! Hard errors are reserved for documents whose meaning is ambiguous (empty
//! or repeated identifiers). Everything the compiler tolerates is reported as
//! a [`PolicyWarning`].

use std::collections::HashSet;
use std::fmt;

use crate::loader::ConfigError;
use crate::types::{PolicyDocument, PolicyItem};

/// A tolerated problem in a policy document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyWarning {
    /// Listed as both direct and proxied; direct wins.
    AmbiguousMembership { id: String },
    /// A membership list names an id that is not a rule or rule-set.
    UnknownMember { list: &'static str, id: String },
    /// Rule-set with neither a URL nor embedded content.
    RuleSetWithoutSource { id: String },
    /// Rule whose type the forwarder cannot match on.
    UnsupportedRuleType { id: String, rule_type: String },
    /// Custom entry without conditions or an action; it is skipped.
    IncompleteCustomMatch { index: usize },
}

impl fmt::Display for PolicyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyWarning::AmbiguousMembership { id } => {
                write!(f, "{id} is listed as both direct and proxy; direct is used")
            }
            PolicyWarning::UnknownMember { list, id } => {
                write!(f, "{list} references unknown id {id}")
            }
            PolicyWarning::RuleSetWithoutSource { id } => {
                write!(f, "rule-set {id} has neither url nor content")
            }
            PolicyWarning::UnsupportedRuleType { id, rule_type } => {
                write!(f, "rule {id} has unsupported type {rule_type:?}; it is skipped")
            }
            PolicyWarning::IncompleteCustomMatch { index } => {
                write!(f, "custom_matches[{index}] lacks matches or exec; it is skipped")
            }
        }
    }
}

pub fn validate_policy(doc: &PolicyDocument) -> Result<Vec<PolicyWarning>, ConfigError> {
    let items = doc.items();
    let mut seen = HashSet::new();
    let mut rule_ids = HashSet::new();
    let mut ruleset_ids = HashSet::new();
    let mut warnings = Vec::new();

    for (index, item) in items.iter().enumerate() {
        let Some(id) = item.id() else {
            continue;
        };
        if id.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "item {index} has an empty id"
            )));
        }
        if !seen.insert(id) {
            return Err(ConfigError::Validation(format!("duplicate id {id}")));
        }

        match item {
            PolicyItem::Rule(rule) => {
                rule_ids.insert(id);
                if !rule.rule_type.is_supported() {
                    warnings.push(PolicyWarning::UnsupportedRuleType {
                        id: id.to_string(),
                        rule_type: rule.rule_type.to_string(),
                    });
                }
            }
            PolicyItem::RuleSet(set) => {
                ruleset_ids.insert(id);
                if !set.has_source() {
                    warnings.push(PolicyWarning::RuleSetWithoutSource { id: id.to_string() });
                }
            }
            PolicyItem::Other => {}
        }
    }

    let fw = &doc.mosdns;
    let lists: [(&'static str, &[String], &HashSet<&str>); 4] = [
        ("direct_rulesets", &fw.direct_rulesets, &ruleset_ids),
        ("proxy_rulesets", &fw.proxy_rulesets, &ruleset_ids),
        ("direct_rules", &fw.direct_rules, &rule_ids),
        ("proxy_rules", &fw.proxy_rules, &rule_ids),
    ];
    for (list, ids, known) in lists {
        for id in ids {
            if !known.contains(id.as_str()) {
                warnings.push(PolicyWarning::UnknownMember {
                    list,
                    id: id.clone(),
                });
            }
        }
    }

    for (direct, proxy) in [
        (&fw.direct_rulesets, &fw.proxy_rulesets),
        (&fw.direct_rules, &fw.proxy_rules),
    ] {
        for id in direct.iter().filter(|id| proxy.contains(*id)) {
            warnings.push(PolicyWarning::AmbiguousMembership { id: id.clone() });
        }
    }

    for (index, entry) in fw.custom_matches.iter().enumerate() {
        if entry.enabled && (entry.exec.trim().is_empty() || entry.matches.conditions().is_empty())
        {
            warnings.push(PolicyWarning::IncompleteCustomMatch { index });
        }
    }

    Ok(warnings)
}
