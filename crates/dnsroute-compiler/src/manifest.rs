//! Side files the forwarder needs on disk before it starts.

use serde::Serialize;

use dnsroute_config::{PolicyDocument, PolicyItem};
use dnsroute_core::tags::TAG_CUSTOM_HOSTS;
use dnsroute_dns::{parse_hosts, render_hosts};

use crate::content::{CompileOptions, ResolvedContent};
use crate::partition::{Partition, RuleBuckets, RuleSetSource, unique_items};
use crate::tags::side_file_path;

/// Where a side file's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SideFileSource {
    Content(String),
    Url(String),
}

/// One file, keyed by its path relative to the forwarder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SideFile {
    pub path: String,
    #[serde(flatten)]
    pub source: SideFileSource,
}

impl SideFile {
    pub fn content(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source: SideFileSource::Content(content.into()),
        }
    }

    pub fn url(path: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source: SideFileSource::Url(url.into()),
        }
    }
}

/// Ordered side files: rule-sets, hosts, merged buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SideFileManifest {
    pub files: Vec<SideFile>,
}

impl SideFileManifest {
    pub fn push(&mut self, file: SideFile) {
        self.files.push(file);
    }

    pub fn get(&self, path: &str) -> Option<&SideFile> {
        self.files.iter().find(|f| f.path == path)
    }

    /// Files with literal content.
    pub fn literals(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().filter_map(|f| match &f.source {
            SideFileSource::Content(c) => Some((f.path.as_str(), c.as_str())),
            SideFileSource::Url(_) => None,
        })
    }

    /// Files the downloader must fetch.
    pub fn downloads(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().filter_map(|f| match &f.source {
            SideFileSource::Url(u) => Some((f.path.as_str(), u.as_str())),
            SideFileSource::Content(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// A rule-set the downloader must fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RulesetDownload {
    pub name: String,
    pub url: String,
    pub local_path: String,
}

/// Path of the hosts side file.
pub fn hosts_path() -> String {
    side_file_path(TAG_CUSTOM_HOSTS)
}

/// Hosts file content, when the policy has any usable mapping.
pub(crate) fn hosts_content(doc: &PolicyDocument) -> Option<String> {
    let entries = parse_hosts(&doc.mosdns.custom_hosts);
    (!entries.is_empty()).then(|| render_hosts(&entries))
}

/// Manifest entries for the rule-set plans, hosts and buckets of a partition.
pub(crate) fn manifest_for(partition: &Partition, hosts: Option<&str>) -> SideFileManifest {
    let mut manifest = SideFileManifest::default();
    for plan in &partition.rulesets {
        manifest.push(match &plan.source {
            RuleSetSource::Content(text) => SideFile::content(&plan.path, text),
            RuleSetSource::Url(url) => SideFile::url(&plan.path, url),
        });
    }
    push_custom(&mut manifest, hosts, &partition.buckets);
    manifest
}

fn push_custom(manifest: &mut SideFileManifest, hosts: Option<&str>, buckets: &RuleBuckets) {
    if let Some(hosts) = hosts {
        manifest.push(SideFile::content(hosts_path(), hosts));
    }
    for kind in buckets.non_empty() {
        if let Some(content) = buckets.content(kind) {
            manifest.push(SideFile::content(kind.path(), content));
        }
    }
}

/// Hosts and merged rule files, without building the pipeline.
pub fn custom_files(doc: &PolicyDocument) -> Vec<SideFile> {
    let items = doc.items();
    let items: Vec<&PolicyItem> = unique_items(&items);
    let buckets = RuleBuckets::collect(&items, &doc.mosdns);
    let mut manifest = SideFileManifest::default();
    push_custom(&mut manifest, hosts_content(doc).as_deref(), &buckets);
    manifest.files
}

/// Rule-sets that still have to be fetched, in pipeline order.
pub fn ruleset_downloads(
    doc: &PolicyDocument,
    options: &CompileOptions,
    resolved: &ResolvedContent,
) -> Vec<RulesetDownload> {
    downloads_for(&Partition::build(doc, options, resolved))
}

pub(crate) fn downloads_for(partition: &Partition) -> Vec<RulesetDownload> {
    partition
        .rulesets
        .iter()
        .filter_map(|plan| match &plan.source {
            RuleSetSource::Url(url) => Some(RulesetDownload {
                name: plan.tag.clone(),
                url: url.clone(),
                local_path: plan.path.clone(),
            }),
            RuleSetSource::Content(_) => None,
        })
        .collect()
}
