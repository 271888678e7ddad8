//! Whole-document format detection and conversion to canonical text.

use serde::Serialize;
use tracing::{debug, warn};

use crate::parser::{self, clash, wildcard};
use crate::rule::{MatcherKind, NormalizedRule};

/// Detected syntax of a rule-list document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    /// Every rule already uses `prefix:value`; the text passes through.
    AlreadyCanonical,
    /// Plain `TYPE,value` lines.
    Clash,
    /// A YAML mapping with a `payload:` list.
    WrapperYaml,
    /// `+.x` / `*.x` / `.x` / bare entries.
    WildcardList,
}

/// Aggregate counts from a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConversionReport {
    pub format: DocumentFormat,
    /// Rule-bearing lines seen (comments and blanks excluded).
    pub total: usize,
    pub converted: usize,
    /// Rules whose type has no canonical equivalent.
    pub unsupported: usize,
    /// Entries that could not be interpreted as a rule.
    pub invalid: usize,
}

impl ConversionReport {
    fn new(format: DocumentFormat) -> Self {
        Self {
            format,
            total: 0,
            converted: 0,
            unsupported: 0,
            invalid: 0,
        }
    }

    pub fn dropped(&self) -> usize {
        self.unsupported + self.invalid
    }
}

/// Result of [`convert_document`].
#[derive(Debug, Clone)]
pub struct Converted {
    pub text: String,
    pub rules: Vec<NormalizedRule>,
    pub report: ConversionReport,
}

impl Converted {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Detect the syntax of a whole document.
///
/// A single canonical line anywhere makes the document canonical. Otherwise a
/// `payload:` key marks a YAML wrapper, and any comma line marks Clash.
pub fn detect_document_format(text: &str) -> DocumentFormat {
    let mut has_payload = false;
    let mut has_comma = false;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if parser::has_canonical_prefix(line) {
            return DocumentFormat::AlreadyCanonical;
        }
        if line.starts_with("payload:") {
            has_payload = true;
        } else if line.contains(',') {
            has_comma = true;
        }
    }

    if has_payload {
        DocumentFormat::WrapperYaml
    } else if has_comma {
        DocumentFormat::Clash
    } else {
        DocumentFormat::WildcardList
    }
}

enum LineOutcome {
    Rule(NormalizedRule),
    Unsupported,
    Invalid,
}

fn convert_line(line: &str) -> Option<LineOutcome> {
    let line = parser::clean_line(line)?;

    if line.contains(',') {
        if !clash::is_domain_projection(line) {
            return Some(LineOutcome::Unsupported);
        }
        return Some(match clash::parse_clash_line(line) {
            Some(rule) => LineOutcome::Rule(rule),
            None => LineOutcome::Invalid,
        });
    }

    let Some(rule) = parser::normalize_line(line) else {
        return Some(LineOutcome::Invalid);
    };

    // bare entries that fell through to the exact-domain fallback
    if rule.kind == MatcherKind::Full
        && parser::parse_canonical_line(line).is_none()
        && !wildcard::is_plausible_host(&rule.value)
    {
        return Some(LineOutcome::Invalid);
    }

    Some(LineOutcome::Rule(rule))
}

/// Convert a rule-list document to canonical matcher text.
///
/// Canonical documents are returned byte-for-byte. Otherwise each rule line
/// is converted in place; order is preserved and unusable lines are dropped
/// and counted rather than reported as errors.
pub fn convert_document(text: &str) -> Converted {
    let format = detect_document_format(text);
    let mut report = ConversionReport::new(format);

    if format == DocumentFormat::AlreadyCanonical {
        let rules: Vec<NormalizedRule> = text.lines().filter_map(parser::normalize_line).collect();
        report.total = text.lines().filter(|l| parser::clean_line(l).is_some()).count();
        report.converted = rules.len();
        report.invalid = report.total - report.converted;
        return Converted {
            text: text.to_string(),
            rules,
            report,
        };
    }

    let lines: Vec<String> = if format == DocumentFormat::WrapperYaml {
        match clash::extract_payload(text) {
            Ok(lines) => lines,
            Err(e) => {
                warn!(error = %e, "payload document unreadable, converting line by line");
                text.lines().map(str::to_string).collect()
            }
        }
    } else {
        text.lines().map(str::to_string).collect()
    };

    let mut rules = Vec::with_capacity(lines.len());
    for line in &lines {
        let Some(outcome) = convert_line(line) else {
            continue;
        };
        report.total += 1;
        match outcome {
            LineOutcome::Rule(rule) => rules.push(rule),
            LineOutcome::Unsupported => report.unsupported += 1,
            LineOutcome::Invalid => report.invalid += 1,
        }
    }
    report.converted = rules.len();

    let text = rules
        .iter()
        .map(NormalizedRule::canonical_line)
        .collect::<Vec<_>>()
        .join("\n");

    debug!(
        format = ?report.format,
        total = report.total,
        converted = report.converted,
        dropped = report.dropped(),
        "rule list converted"
    );

    Converted {
        text,
        rules,
        report,
    }
}
