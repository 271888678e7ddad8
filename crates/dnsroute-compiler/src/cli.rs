//! CLI module for the dnsroute compiler.
//!
//! Provides the `compile`, `convert` and `check` commands of the unified
//! dnsroute binary.
//!
//! # Usage
//!
//! ```bash
//! # Compile a policy into out/config.yaml, out/rules/*.txt and out/downloads.json
//! dnsroute compile -c policy.yaml -o out --base-url https://panel.example
//!
//! # Use rule lists fetched earlier, named <rule-set id>.txt
//! dnsroute compile -c policy.yaml -o out --rules-cache cache/
//!
//! # Convert a Clash or wildcard list to canonical syntax
//! curl -s https://example.com/ads.yaml | dnsroute convert -
//!
//! # Test a query against a list
//! dnsroute check rules/ads.txt ads.example.com
//! ```

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use clap::Parser;
use tabled::{Table, Tabled};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use dnsroute_config::{
    CliOverrides, LoggingConfig, PolicyDocument, PolicyItem, Route, apply_overrides, load_policy,
    validate_policy,
};
use dnsroute_rules::{FileProvider, convert_document};

use crate::content::{CompileOptions, ResolvedContent};
use crate::error::CompileError;
use crate::partition::RuleSetSource;
use crate::{Compilation, compile};

/// File name of the serialized pipeline.
const CONFIG_FILE: &str = "config.yaml";
/// File name of the download list.
const DOWNLOADS_FILE: &str = "downloads.json";

/// Compile command arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "dnsroute-compile", version, about = "Compile a routing policy into a forwarder pipeline")]
pub struct CompileArgs {
    /// Policy file path (json/jsonc/yaml/toml)
    #[arg(short, long, default_value = "policy.yaml")]
    pub config: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Directory of already fetched rule lists, one `<rule-set id>.txt` each
    #[arg(long)]
    pub rules_cache: Option<PathBuf>,

    /// Print the summary without writing any file
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub overrides: CliOverrides,
}

/// Convert command arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "dnsroute-convert", version, about = "Convert a rule list to canonical syntax")]
pub struct ConvertArgs {
    /// Rule list file, or `-` for stdin
    pub input: PathBuf,

    /// Log level (trace/debug/info/warn/error)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Check command arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "dnsroute-check", version, about = "Test a domain or IP against a rule list")]
pub struct CheckArgs {
    /// Rule list file, or `-` for stdin
    pub list: PathBuf,

    /// Domain name or IP address
    pub query: String,

    /// Log level (trace/debug/info/warn/error)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Rule-set row of the compile summary.
#[derive(Tabled)]
struct RuleSetRow {
    #[tabled(rename = "Tag")]
    tag: String,
    #[tabled(rename = "Route")]
    route: String,
    #[tabled(rename = "Behavior")]
    behavior: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Rules")]
    rules: String,
    #[tabled(rename = "Dropped")]
    dropped: String,
}

/// Run the compile command.
pub fn run_compile(args: CompileArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut doc = load_policy(&args.config)?;
    apply_overrides(&mut doc, &args.overrides);

    let mut logging = doc.logging.clone();
    if let Some(level) = &args.overrides.log_level {
        logging.level = Some(level.clone());
    }
    init_tracing(&logging);

    for warning in validate_policy(&doc)? {
        warn!("{}", warning);
    }

    let options = CompileOptions {
        base_url: args.overrides.base_url.clone(),
    };
    let resolved = match &args.rules_cache {
        Some(dir) => load_rules_cache(dir, &doc)?,
        None => ResolvedContent::new(),
    };

    let out = compile(&doc, &options, &resolved)?;
    info!(
        stages = out.compiled.pipeline.len(),
        side_files = out.compiled.manifest.len(),
        skipped = out.compiled.partition.skipped.len(),
        version = %out.artifact.version,
        "pipeline compiled"
    );

    if !args.dry_run {
        write_outputs(&args.output, &out)?;
    }

    print_summary(&out);
    println!("fingerprint {}", out.artifact.fingerprint);
    println!("version {}", out.artifact.version);
    Ok(())
}

/// Run the convert command.
pub fn run_convert(args: ConvertArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(&LoggingConfig {
        level: args.log_level.clone(),
        ..Default::default()
    });

    let text = FileProvider::read(&args.input)?;
    let converted = convert_document(&text);
    let report = converted.report;
    info!(
        format = ?report.format,
        total = report.total,
        converted = report.converted,
        unsupported = report.unsupported,
        invalid = report.invalid,
        "rule list converted"
    );
    println!("{}", converted.text);
    Ok(())
}

/// Run the check command.
pub fn run_check(args: CheckArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(&LoggingConfig {
        level: args.log_level.clone(),
        ..Default::default()
    });

    let matcher = FileProvider::load_matcher(&args.list)?;
    debug!(rules = matcher.len(), "matcher loaded");
    if matcher.matches(&args.query) {
        println!("{}: match", args.query);
    } else {
        println!("{}: no match", args.query);
    }
    Ok(())
}

/// Read `<dir>/<id>.txt` for every rule-set of the document that has one.
///
/// A cached file that cannot be read marks the rule-set unavailable.
fn load_rules_cache(dir: &Path, doc: &PolicyDocument) -> Result<ResolvedContent, CompileError> {
    if !dir.is_dir() {
        return Err(CompileError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("rules cache {} is not a directory", dir.display()),
        )));
    }

    let mut resolved = ResolvedContent::new();
    for item in doc.items().iter() {
        let PolicyItem::RuleSet(set) = item else {
            continue;
        };
        let Some(path) = cache_path(dir, &set.id) else {
            warn!(ruleset = %set.id, "id is not usable as a file name, cache ignored");
            continue;
        };
        if !path.exists() {
            continue;
        }
        match fs::read_to_string(&path) {
            Ok(text) => {
                debug!(ruleset = %set.id, path = %path.display(), "using cached rule list");
                resolved.insert_available(set.id.clone(), text);
            }
            Err(e) => {
                warn!(ruleset = %set.id, error = %e, "cached rule list unreadable");
                resolved.mark_unavailable(set.id.clone());
            }
        }
    }
    Ok(resolved)
}

fn cache_path(dir: &Path, id: &str) -> Option<PathBuf> {
    let name = format!("{id}.txt");
    let relative = Path::new(&name);
    let mut components = relative.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Some(dir.join(relative)),
        _ => None,
    }
}

/// Write the pipeline, literal side files and the download list.
fn write_outputs(root: &Path, out: &Compilation) -> Result<(), CompileError> {
    fs::create_dir_all(root)?;
    fs::write(root.join(CONFIG_FILE), &out.artifact.content)?;

    for (path, content) in out.compiled.manifest.literals() {
        let target = safe_join(root, path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, content)?;
        debug!(path = %target.display(), "side file written");
    }

    let downloads = out.downloads();
    let json = serde_json::to_string_pretty(&downloads)?;
    fs::write(root.join(DOWNLOADS_FILE), json)?;
    info!(
        dir = %root.display(),
        downloads = downloads.len(),
        "outputs written"
    );
    Ok(())
}

/// Join a manifest path onto `root`, refusing anything that leaves it.
fn safe_join(root: &Path, relative: &str) -> Result<PathBuf, CompileError> {
    let mut joined = root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::CurDir => {}
            Component::Normal(part) => joined.push(part),
            _ => return Err(CompileError::UnsafePath(relative.to_string())),
        }
    }
    if joined == root {
        return Err(CompileError::UnsafePath(relative.to_string()));
    }
    Ok(joined)
}

fn print_summary(out: &Compilation) {
    let rows: Vec<RuleSetRow> = out
        .compiled
        .partition
        .rulesets
        .iter()
        .map(|plan| {
            let (rules, dropped) = match plan.report {
                Some(r) => (r.converted.to_string(), r.dropped().to_string()),
                None => ("-".to_string(), "-".to_string()),
            };
            RuleSetRow {
                tag: plan.tag.clone(),
                route: match plan.route {
                    Route::Direct => "direct",
                    Route::Proxy => "proxy",
                }
                .to_string(),
                behavior: plan.behavior.as_str().to_string(),
                source: match plan.source {
                    RuleSetSource::Content(_) => "inline",
                    RuleSetSource::Url(_) => "download",
                }
                .to_string(),
                rules,
                dropped,
            }
        })
        .collect();

    if rows.is_empty() {
        println!("No rule-sets compiled.");
    } else {
        println!("{}", Table::new(rows));
    }
    for id in &out.compiled.partition.skipped {
        println!("skipped rule-set {id}");
    }
}

/// Initialize tracing subscriber with the given logging configuration.
///
/// Supports:
/// - `level`: Base log level (trace, debug, info, warn, error)
/// - `format`: Output format (json, pretty, compact). Default: pretty
/// - `output`: Output target (stdout, stderr). Default: stderr
/// - `filters`: Per-module log level overrides
fn init_tracing(config: &LoggingConfig) {
    let base_level = config.level.as_deref().unwrap_or("info");
    let mut filter_str = base_level.to_string();

    let mut filters: Vec<_> = config.filters.iter().collect();
    filters.sort();
    for (module, level) in filters {
        filter_str.push(',');
        filter_str.push_str(module);
        filter_str.push('=');
        filter_str.push_str(level);
    }

    let filter = EnvFilter::try_new(&filter_str).unwrap_or_else(|_| EnvFilter::new("info"));

    let format = config.format.as_deref().unwrap_or("pretty");
    let output = config.output.as_deref().unwrap_or("stderr");

    // stdout carries command output, so logs only go there when asked
    match (format, output) {
        ("json", "stdout") => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(io::stdout))
                .init();
        }
        ("json", _) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(io::stderr))
                .init();
        }
        ("compact", "stdout") => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().compact().with_writer(io::stdout))
                .init();
        }
        ("compact", _) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().compact().with_writer(io::stderr))
                .init();
        }
        (_, "stdout") => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(io::stdout))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(io::stderr))
                .init();
        }
    }
}
