//! Policy file loading and error types.

use std::{fs, path::Path};

use tracing::debug;

use crate::PolicyDocument;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("toml: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("unsupported config format")]
    UnsupportedFormat,
    #[error("validation: {0}")]
    Validation(String),
}

/// Load a policy document, choosing the parser by file extension.
pub fn load_policy(path: impl AsRef<Path>) -> Result<PolicyDocument, ConfigError> {
    let path = path.as_ref();
    let data = fs::read_to_string(path)?;
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
    let doc = parse_policy(&data, ext)?;
    debug!(
        path = %path.display(),
        items = doc.items().len(),
        "policy loaded"
    );
    Ok(doc)
}

/// Parse policy text in the format named by `ext` (`json`, `jsonc`, `yaml`,
/// `yml` or `toml`).
pub fn parse_policy(data: &str, ext: &str) -> Result<PolicyDocument, ConfigError> {
    match ext {
        "json" | "jsonc" => {
            let stripped = json_comments::StripComments::new(data.as_bytes());
            Ok(serde_json::from_reader(stripped)?)
        }
        "yaml" | "yml" => Ok(serde_yaml::from_str(data)?),
        "toml" => Ok(toml::from_str(data)?),
        _ => Err(ConfigError::UnsupportedFormat),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(suffix: &str, body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn load_yaml() {
        let file = write_temp(
            ".yaml",
            "rule_configs:\n  - itemType: rule\n    id: r1\n    rule_type: DOMAIN\n    value: a.com\nmosdns:\n  direct_rules: [r1]\n",
        );
        let doc = load_policy(file.path()).unwrap();
        assert_eq!(doc.items().len(), 1);
        assert_eq!(doc.mosdns.direct_rules, vec!["r1"]);
    }

    #[test]
    fn load_jsonc_with_comments() {
        let file = write_temp(
            ".jsonc",
            r#"{
  // forwarder section only
  "mosdns": { "listen": ":5353" /* non-default */ }
}"#,
        );
        let doc = load_policy(file.path()).unwrap();
        assert_eq!(doc.mosdns.listen, ":5353");
        assert!(doc.items().is_empty());
    }

    #[test]
    fn load_toml() {
        let file = write_temp(
            ".toml",
            "[system_config]\nserver_domain = \"https://panel.example.com\"\n\n[[rule_sets]]\nid = \"ruleset_ads\"\nurl = \"/rules/ads.list\"\n",
        );
        let doc = load_policy(file.path()).unwrap();
        assert_eq!(doc.system_config.server_domain, "https://panel.example.com");
        assert_eq!(doc.items().len(), 1);
    }

    #[test]
    fn unsupported_extension() {
        let file = write_temp(".ini", "a=b");
        assert!(matches!(
            load_policy(file.path()),
            Err(ConfigError::UnsupportedFormat)
        ));
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            load_policy("/nonexistent/policy.yaml"),
            Err(ConfigError::Io(_))
        ));
    }
}
