//! Local rule-list files.

use std::path::Path;

use tracing::debug;

use crate::document::{Converted, convert_document};
use crate::error::RulesError;
use crate::matcher::RuleSetMatcher;

/// Loads rule lists from disk; `-` reads standard input.
pub struct FileProvider;

impl FileProvider {
    pub fn read(path: &Path) -> Result<String, RulesError> {
        if path.as_os_str() == "-" {
            let mut buf = String::new();
            std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf)?;
            return Ok(buf);
        }
        Ok(std::fs::read_to_string(path)?)
    }

    /// Read and convert a rule list to canonical text.
    pub fn load(path: &Path) -> Result<Converted, RulesError> {
        let content = Self::read(path)?;
        let converted = convert_document(&content);
        debug!(
            path = %path.display(),
            rules = converted.report.converted,
            "rule list loaded"
        );
        Ok(converted)
    }

    /// Read a rule list and compile it into a matcher.
    pub fn load_matcher(path: &Path) -> Result<RuleSetMatcher, RulesError> {
        let converted = Self::load(path)?;
        RuleSetMatcher::build(&converted.rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_clash_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "DOMAIN-SUFFIX,example.com").unwrap();
        writeln!(file, "GEOIP,CN").unwrap();

        let converted = FileProvider::load(file.path()).unwrap();
        assert_eq!(converted.text, "domain:example.com");
        assert_eq!(converted.report.unsupported, 1);
    }

    #[test]
    fn load_matcher_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "*.example.com").unwrap();

        let m = FileProvider::load_matcher(file.path()).unwrap();
        assert!(m.matches("a.example.com"));
        assert!(!m.matches("example.com"));
    }

    #[test]
    fn missing_file() {
        let err = FileProvider::load(Path::new("/nonexistent/rules.list")).unwrap_err();
        assert!(matches!(err, RulesError::Io(_)));
    }
}
