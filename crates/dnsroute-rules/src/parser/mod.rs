//! Rule-line parsers.
//!
//! A line is first cleaned (comments, list markers, quotes), then classified
//! by the first matching syntax:
//!
//! 1. Clash `TYPE,value[,extra…]`
//! 2. canonical `prefix:value`
//! 3. `+.suffix`
//! 4. `*.suffix`
//! 5. `.suffix`
//! 6. IP literal
//! 7. CIDR
//! 8. anything else is an exact domain

pub mod canonical;
pub mod clash;
pub mod wildcard;

use crate::rule::NormalizedRule;

pub use canonical::{CANONICAL_PREFIXES, has_canonical_prefix, parse_canonical_line};
pub use clash::{extract_payload, parse_clash_line};
pub use wildcard::{is_plausible_host, parse_wildcard_line};

/// Strip comments, list markers and quotes from a raw line.
///
/// Returns `None` for lines that carry no rule.
pub fn clean_line(raw: &str) -> Option<&str> {
    let mut line = raw.trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with('!') || line.starts_with("//")
    {
        return None;
    }

    if let Some(rest) = line.strip_prefix("- ") {
        line = rest.trim_start();
    } else if line == "-" {
        return None;
    }

    // inline comment: a '#' preceded by whitespace
    if let Some(pos) = line
        .char_indices()
        .find(|&(i, c)| c == '#' && i > 0 && line[..i].ends_with(char::is_whitespace))
        .map(|(i, _)| i)
    {
        line = line[..pos].trim_end();
    }

    line = strip_quotes(line);
    if line.is_empty() { None } else { Some(line) }
}

fn strip_quotes(s: &str) -> &str {
    for q in ['\'', '"'] {
        if s.len() >= 2 && s.starts_with(q) && s.ends_with(q) {
            return s[1..s.len() - 1].trim();
        }
    }
    s
}

/// Normalize a single rule line into `(kind, value)`.
///
/// Returns `None` for comments, blank lines and syntaxes the canonical
/// format has no equivalent for (e.g. `PROCESS-NAME,foo`).
pub fn normalize_line(raw: &str) -> Option<NormalizedRule> {
    let line = clean_line(raw)?;

    if line.contains(',') {
        return parse_clash_line(line);
    }

    if let Some(rule) = parse_canonical_line(line) {
        return Some(rule);
    }

    parse_wildcard_line(line)
}
