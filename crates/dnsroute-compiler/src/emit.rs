//! Serializing the pipeline into the forwarder's configuration document.

use serde::Serialize;
use serde_yaml::{Mapping, Value};
use sha2::{Digest, Sha256};
use tracing::warn;

use dnsroute_config::ForwarderSettings;

use crate::error::CompileError;
use crate::pipeline::Pipeline;

/// Top-level keys never carried over from a base document.
const DROPPED_BASE_KEYS: [&str; 5] = ["log", "api", "plugins", "servers", "data_providers"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogSection {
    pub level: String,
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiSection {
    pub http: String,
}

/// The forwarder configuration, in emission order.
#[derive(Debug, Clone, Serialize)]
pub struct ForwarderDocument<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<LogSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<ApiSection>,
    pub plugins: &'a Pipeline,
    /// Remaining keys of the base document, in their original order.
    #[serde(flatten)]
    pub passthrough: Mapping,
}

impl<'a> ForwarderDocument<'a> {
    pub fn new(settings: &ForwarderSettings, plugins: &'a Pipeline) -> Self {
        let log = settings.log_enabled.then(|| LogSection {
            level: settings.log_level.clone(),
            file: settings.log_file.clone(),
        });
        let api = settings.api_enabled.then(|| ApiSection {
            http: settings.api_address.clone(),
        });
        let passthrough = base_document(&settings.custom_config)
            .into_iter()
            .filter(|(key, _)| !key.as_str().is_some_and(|k| DROPPED_BASE_KEYS.contains(&k)))
            .collect();

        Self {
            log,
            api,
            plugins,
            passthrough,
        }
    }

    pub fn to_yaml(&self) -> Result<String, CompileError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Parse the user's base document. Anything but a mapping is ignored.
fn base_document(raw: &str) -> Mapping {
    if raw.trim().is_empty() {
        return Mapping::new();
    }
    match serde_yaml::from_str::<Value>(raw) {
        Ok(Value::Mapping(map)) => map,
        Ok(Value::Null) => Mapping::new(),
        Ok(_) => {
            warn!("custom_config is not a mapping, ignoring it");
            Mapping::new()
        }
        Err(e) => {
            warn!(error = %e, "custom_config is not valid YAML, ignoring it");
            Mapping::new()
        }
    }
}

/// Serialized configuration plus a content fingerprint for caching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledArtifact {
    pub content: String,
    /// SHA-256 of `content`, lowercase hex.
    pub fingerprint: String,
    /// Short form of the fingerprint.
    pub version: String,
}

impl CompiledArtifact {
    pub fn new(content: String) -> Self {
        let fingerprint = hex::encode(Sha256::digest(content.as_bytes()));
        let version = fingerprint[..8].to_string();
        Self {
            content,
            fingerprint,
            version,
        }
    }
}

/// Serialize a pipeline with the top-level sections `settings` enables.
pub fn emit(settings: &ForwarderSettings, pipeline: &Pipeline) -> Result<CompiledArtifact, CompileError> {
    let content = ForwarderDocument::new(settings, pipeline).to_yaml()?;
    Ok(CompiledArtifact::new(content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Stage, StageKind};

    fn pipeline() -> Pipeline {
        let mut p = Pipeline::default();
        p.push(Stage::tagged("h", StageKind::Hosts { files: vec![] }));
        p
    }

    fn keys(yaml: &str) -> Vec<String> {
        let value: Mapping = serde_yaml::from_str(yaml).unwrap();
        value
            .iter()
            .filter_map(|(k, _)| k.as_str().map(str::to_string))
            .collect()
    }

    #[test]
    fn section_order_and_passthrough() {
        let settings = ForwarderSettings {
            custom_config: "servers: []\nextra: 1\nlog: {level: debug}\ndata_providers: []\nplugins: [x]\nzz: true\n"
                .into(),
            ..Default::default()
        };
        let p = pipeline();
        let artifact = emit(&settings, &p).unwrap();
        assert_eq!(keys(&artifact.content), vec!["log", "api", "plugins", "extra", "zz"]);
        assert!(artifact.content.contains("level: info"));
    }

    #[test]
    fn disabled_sections_absent() {
        let settings = ForwarderSettings {
            log_enabled: false,
            api_enabled: false,
            custom_config: "api: {http: ':9'}\n".into(),
            ..Default::default()
        };
        let p = pipeline();
        let artifact = emit(&settings, &p).unwrap();
        assert_eq!(keys(&artifact.content), vec!["plugins"]);
    }

    #[test]
    fn malformed_base_is_ignored() {
        for base in ["[1, 2", "- a\n- b\n", "just text"] {
            let settings = ForwarderSettings {
                custom_config: base.into(),
                ..Default::default()
            };
            let p = pipeline();
            let artifact = emit(&settings, &p).unwrap();
            assert_eq!(keys(&artifact.content), vec!["log", "api", "plugins"]);
        }
    }

    #[test]
    fn fingerprint_is_stable() {
        let a = CompiledArtifact::new("plugins: []\n".into());
        let b = CompiledArtifact::new("plugins: []\n".into());
        assert_eq!(a, b);
        assert_eq!(a.fingerprint.len(), 64);
        assert!(a.fingerprint.starts_with(&a.version));
        assert_ne!(a.fingerprint, CompiledArtifact::new("plugins: [x]\n".into()).fingerprint);
    }
}
