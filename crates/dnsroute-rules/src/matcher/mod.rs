//! Matchers evaluating normalized rules against a query.

pub mod domain;
pub mod ip;

use std::net::IpAddr;

use ipnet::IpNet;

use crate::error::RulesError;
use crate::rule::{MatcherKind, NormalizedRule};

pub use domain::{DomainMatcher, KeywordMatcher, RegexMatcher, normalize_qname};
pub use ip::CidrMatcher;

/// A compiled rule list.
///
/// Domain kinds are checked against query names, IP kinds against addresses.
/// Wildcard kinds are compiled from the same regular expressions written to
/// canonical files, so evaluation agrees with what the forwarder sees.
#[derive(Debug, Default)]
pub struct RuleSetMatcher {
    domains: DomainMatcher,
    keywords: Option<KeywordMatcher>,
    regexes: Option<RegexMatcher>,
    cidrs: CidrMatcher,
    rules: usize,
}

impl RuleSetMatcher {
    pub fn build<'a, I>(rules: I) -> Result<Self, RulesError>
    where
        I: IntoIterator<Item = &'a NormalizedRule>,
    {
        let mut domains = DomainMatcher::new();
        let mut keywords = Vec::new();
        let mut patterns = Vec::new();
        let mut cidrs = CidrMatcher::new();
        let mut count = 0;

        for rule in rules {
            count += 1;
            match rule.kind {
                MatcherKind::Full => domains.add_full(&rule.value),
                MatcherKind::Suffix => domains.add_suffix(&rule.value),
                MatcherKind::Keyword => keywords.push(rule.value.clone()),
                MatcherKind::Regexp | MatcherKind::SubdomainOnly | MatcherKind::DirectSubdomain => {
                    if let Some(src) = rule.regex_source() {
                        patterns.push(src);
                    }
                }
                MatcherKind::Ip => {
                    let addr: IpAddr = rule
                        .value
                        .parse()
                        .map_err(|e| RulesError::InvalidCidr(format!("{}: {e}", rule.value)))?;
                    cidrs.insert_addr(addr);
                }
                MatcherKind::IpCidr => {
                    let net: IpNet = rule
                        .value
                        .parse()
                        .map_err(|e| RulesError::InvalidCidr(format!("{}: {e}", rule.value)))?;
                    cidrs.insert(net);
                }
            }
        }

        Ok(Self {
            domains,
            keywords: KeywordMatcher::new(&keywords)?,
            regexes: RegexMatcher::new(&patterns)?,
            cidrs: cidrs.finish(),
            rules: count,
        })
    }

    pub fn matches_domain(&self, qname: &str) -> bool {
        self.domains.matches(qname)
            || self.keywords.as_ref().is_some_and(|k| k.matches(qname))
            || self.regexes.as_ref().is_some_and(|r| r.matches(qname))
    }

    pub fn matches_ip(&self, addr: IpAddr) -> bool {
        self.cidrs.contains(addr)
    }

    /// Dispatch on the query: an IP literal is matched against networks,
    /// anything else against domain rules.
    pub fn matches(&self, query: &str) -> bool {
        match query.trim().parse::<IpAddr>() {
            Ok(addr) => self.matches_ip(addr),
            Err(_) => self.matches_domain(query.trim()),
        }
    }

    /// Number of rules the matcher was built from.
    pub fn len(&self) -> usize {
        self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::convert_document;

    fn build(text: &str) -> RuleSetMatcher {
        let converted = convert_document(text);
        RuleSetMatcher::build(&converted.rules).unwrap()
    }

    #[test]
    fn suffix_matches_apex_and_children() {
        let m = build("+.example.com\n");
        assert!(m.matches("example.com"));
        assert!(m.matches("a.b.example.com"));
    }

    #[test]
    fn subdomain_only_excludes_apex() {
        let m = build(".example.com\n");
        assert!(!m.matches("example.com"));
        assert!(m.matches("a.example.com"));
        assert!(m.matches("a.b.example.com"));
        assert!(!m.matches("aexample.com"));
    }

    #[test]
    fn direct_subdomain_is_one_label() {
        let m = build("*.example.com\n");
        assert!(!m.matches("example.com"));
        assert!(m.matches("a.example.com"));
        assert!(!m.matches("a.b.example.com"));
    }

    #[test]
    fn mixed_canonical_list() {
        let m = build("full:a.com\nkeyword:track\nregexp:^ad[0-9]+\\.\n10.0.0.0/8\n");
        assert!(m.matches("a.com"));
        assert!(!m.matches("x.a.com"));
        assert!(m.matches("tracker.net"));
        assert!(m.matches("ad12.example.org"));
        assert!(m.matches("10.1.2.3"));
        assert!(!m.matches("11.1.2.3"));
        assert_eq!(m.len(), 4);
    }

    #[test]
    fn invalid_regex_is_an_error() {
        let rules = vec![NormalizedRule::new(MatcherKind::Regexp, "(")];
        assert!(RuleSetMatcher::build(&rules).is_err());
    }

    #[test]
    fn empty_matcher() {
        let rules: Vec<NormalizedRule> = Vec::new();
        let m = RuleSetMatcher::build(&rules).unwrap();
        assert!(m.is_empty());
        assert!(!m.matches("example.com"));
    }
}
