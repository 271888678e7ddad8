//! Policy-to-pipeline compiler for dnsroute.
//!
//! Lowers a [`PolicyDocument`] into the plugin list of a mosdns-style DNS
//! forwarder plus the side files (matcher lists, hosts) it loads at start-up.
//! Compilation is pure: no I/O, no shared state, identical input yields
//! byte-identical output.
//!
//! # Example
//!
//! ```
//! use dnsroute_compiler::{CompileOptions, ResolvedContent, compile};
//! use dnsroute_config::PolicyDocument;
//!
//! let doc: PolicyDocument = serde_yaml::from_str(r#"
//! rule_configs:
//!   - { itemType: ruleset, id: r1, name: ads, content: "+.ads.example" }
//! mosdns:
//!   proxy_rulesets: [r1]
//! "#).unwrap();
//!
//! let out = compile(&doc, &CompileOptions::default(), &ResolvedContent::new()).unwrap();
//! assert!(out.artifact.content.contains("qname $ads"));
//! assert_eq!(out.compiled.manifest.files[0].path, "./rules/ads.txt");
//! ```

pub mod cli;
pub mod content;
pub mod emit;
pub mod error;
pub mod manifest;
pub mod partition;
pub mod pipeline;
pub mod sequence;
pub mod tags;

pub use cli::{CheckArgs, CompileArgs, ConvertArgs};
pub use content::{CompileOptions, Resolved, ResolvedContent};
pub use emit::{CompiledArtifact, ForwarderDocument, emit};
pub use error::CompileError;
pub use manifest::{
    RulesetDownload, SideFile, SideFileManifest, SideFileSource, custom_files, ruleset_downloads,
};
pub use partition::{BucketKind, Partition, RuleSetPlan, RuleSetSource};
pub use pipeline::{DanglingRef, Exec, Match, Pipeline, Stage, StageKind, Step};
pub use sequence::{Compiled, build};
pub use tags::{TagEntry, TagMap, allocate_tags};

use dnsroute_config::PolicyDocument;

/// A serialized pipeline together with everything it was built from.
#[derive(Debug, Clone)]
pub struct Compilation {
    pub artifact: CompiledArtifact,
    pub compiled: Compiled,
}

impl Compilation {
    /// Rule-sets the downloader still has to fetch.
    pub fn downloads(&self) -> Vec<RulesetDownload> {
        manifest::downloads_for(&self.compiled.partition)
    }
}

/// Build and serialize the pipeline for `doc`.
pub fn compile(
    doc: &PolicyDocument,
    options: &CompileOptions,
    resolved: &ResolvedContent,
) -> Result<Compilation, CompileError> {
    let compiled = build(doc, options, resolved);
    let artifact = emit(&doc.mosdns, &compiled.pipeline)?;
    Ok(Compilation { artifact, compiled })
}
