//! Query-name matchers.
//!
//! - `DomainMatcher`: `full:` and `domain:` entries in one FxHashSet
//! - `KeywordMatcher`: `keyword:` entries in an Aho-Corasick automaton
//! - `RegexMatcher`: `regexp:` entries (including lowered wildcards) in a `RegexSet`

use aho_corasick::AhoCorasick;
use regex::RegexSet;
use rustc_hash::FxHashSet;

use crate::error::RulesError;

/// Lower-case a query name and drop the trailing root dot.
pub fn normalize_qname(qname: &str) -> String {
    qname.trim_end_matches('.').to_ascii_lowercase()
}

/// Exact (`full:`) and suffix (`domain:`) entries.
///
/// Suffix entries are stored as `.suffix` next to the bare name, so a lookup
/// is one probe for the name plus one per label boundary.
#[derive(Debug, Default)]
pub struct DomainMatcher {
    set: FxHashSet<String>,
}

impl DomainMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_full(&mut self, domain: &str) {
        self.set.insert(normalize_qname(domain));
    }

    /// Matches the domain itself and every name below it.
    pub fn add_suffix(&mut self, suffix: &str) {
        let lower = normalize_qname(suffix.strip_prefix('.').unwrap_or(suffix));
        self.set.insert(format!(".{lower}"));
        self.set.insert(lower);
    }

    pub fn matches(&self, qname: &str) -> bool {
        let name = normalize_qname(qname);
        if self.set.contains(name.as_str()) {
            return true;
        }

        let mut pos = 0;
        while let Some(dot) = name[pos..].find('.') {
            if self.set.contains(&name[pos + dot..]) {
                return true;
            }
            pos += dot + 1;
        }
        false
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }
}

/// Substring entries, matched case-insensitively.
pub struct KeywordMatcher {
    ac: AhoCorasick,
    keywords: Vec<String>,
}

impl KeywordMatcher {
    /// Returns `Ok(None)` for an empty keyword list.
    pub fn new(keywords: &[String]) -> Result<Option<Self>, RulesError> {
        if keywords.is_empty() {
            return Ok(None);
        }
        let keywords: Vec<String> = keywords.iter().map(|k| k.to_ascii_lowercase()).collect();
        let ac = AhoCorasick::new(&keywords)
            .map_err(|e| RulesError::Parse(format!("keyword automaton: {e}")))?;
        Ok(Some(Self { ac, keywords }))
    }

    pub fn matches(&self, qname: &str) -> bool {
        self.ac.is_match(&normalize_qname(qname))
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}

impl std::fmt::Debug for KeywordMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeywordMatcher")
            .field("keywords", &self.keywords)
            .finish()
    }
}

/// Regular-expression entries compiled into a single `RegexSet`.
#[derive(Debug)]
pub struct RegexMatcher {
    set: RegexSet,
}

impl RegexMatcher {
    /// Returns `Ok(None)` for an empty pattern list; fails on the first
    /// pattern that does not compile.
    pub fn new(patterns: &[String]) -> Result<Option<Self>, RulesError> {
        if patterns.is_empty() {
            return Ok(None);
        }
        let set = RegexSet::new(patterns)?;
        Ok(Some(Self { set }))
    }

    pub fn matches(&self, qname: &str) -> bool {
        self.set.is_match(&normalize_qname(qname))
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}
