//! Rule-set tag and side-file name allocation.
//!
//! Tags derive from display names, so they stay readable in the emitted
//! pipeline. Repeats get `_2`, `_3`, … in document order, and names that
//! would shadow a foundation stage are pushed to the next free counter.

use std::collections::{HashMap, HashSet};

use dnsroute_core::defaults::{RULE_FILE_EXT, RULES_DIR, RULESET_ID_PREFIX};
use dnsroute_core::tags::{
    RESERVED_TAGS, TAG_CUSTOM_HOSTS, TAG_DIRECT_IP_RULES, TAG_DIRECT_RULES, TAG_PROXY_IP_RULES,
    TAG_PROXY_RULES,
};

/// Tag and file name assigned to one rule-set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagEntry {
    pub id: String,
    pub tag: String,
    pub file_stem: String,
}

impl TagEntry {
    /// Path of the rule-set's matcher file, relative to the forwarder.
    pub fn file_path(&self) -> String {
        side_file_path(&self.file_stem)
    }
}

/// `./rules/<stem>.txt`
pub fn side_file_path(stem: &str) -> String {
    format!("{RULES_DIR}/{stem}.{RULE_FILE_EXT}")
}

/// Tags for every rule-set of a document.
#[derive(Debug, Clone, Default)]
pub struct TagMap {
    entries: Vec<TagEntry>,
    index: HashMap<String, usize>,
}

impl TagMap {
    pub fn get(&self, id: &str) -> Option<&TagEntry> {
        self.index.get(id).map(|&i| &self.entries[i])
    }

    pub fn tag(&self, id: &str) -> Option<&str> {
        self.get(id).map(|e| e.tag.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &TagEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Hands out `base`, `base_2`, `base_3`, … skipping anything already taken.
#[derive(Debug)]
struct Namer {
    taken: HashSet<String>,
    usage: HashMap<String, usize>,
}

impl Namer {
    fn new<'a>(reserved: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            taken: reserved.into_iter().map(str::to_string).collect(),
            usage: HashMap::new(),
        }
    }

    fn next(&mut self, base: &str) -> String {
        let mut n = self.usage.get(base).copied().unwrap_or(0);
        let name = loop {
            n += 1;
            let candidate = if n == 1 {
                base.to_string()
            } else {
                format!("{base}_{n}")
            };
            if !self.taken.contains(&candidate) {
                break candidate;
            }
        };
        self.usage.insert(base.to_string(), n);
        self.taken.insert(name.clone());
        name
    }
}

/// Base name of a rule-set: its trimmed display name, else its id without
/// the `ruleset_` prefix.
pub fn tag_base(id: &str, name: &str) -> String {
    let name = name.trim();
    if !name.is_empty() {
        return name.to_string();
    }
    let stripped = id.strip_prefix(RULESET_ID_PREFIX).unwrap_or(id).trim();
    if stripped.is_empty() {
        "ruleset".to_string()
    } else {
        stripped.to_string()
    }
}

/// Replace characters that are unsafe in a file name with `_`.
pub fn sanitize_file_stem(tag: &str) -> String {
    let stem: String = tag
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() { "_".to_string() } else { stem }
}

/// Allocate tags for `(id, display name)` pairs in document order.
///
/// Repeated ids keep their first allocation.
pub fn allocate_tags<'a, I>(rulesets: I) -> TagMap
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut tags = Namer::new(RESERVED_TAGS);
    let mut files = Namer::new([
        TAG_CUSTOM_HOSTS,
        TAG_DIRECT_RULES,
        TAG_PROXY_RULES,
        TAG_DIRECT_IP_RULES,
        TAG_PROXY_IP_RULES,
    ]);
    let mut map = TagMap::default();

    for (id, name) in rulesets {
        if map.index.contains_key(id) {
            continue;
        }
        let tag = tags.next(&tag_base(id, name));
        let file_stem = files.next(&sanitize_file_stem(&tag));
        map.index.insert(id.to_string(), map.entries.len());
        map.entries.push(TagEntry {
            id: id.to_string(),
            tag,
            file_stem,
        });
    }

    map
}
