//! Unified dnsroute CLI.
//!
//! - `dnsroute compile` - Compile a policy into a forwarder pipeline
//! - `dnsroute convert` - Normalize a rule list to canonical syntax
//! - `dnsroute check` - Test domains and addresses against a rule list

use std::process::ExitCode;

use clap::{Parser, Subcommand};

/// dnsroute unified CLI.
#[derive(Parser)]
#[command(
    name = "dnsroute",
    version,
    about = "Compile DNS routing policies into mosdns forwarder pipelines",
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a policy into config.yaml and its side files.
    #[command(name = "compile", alias = "build")]
    Compile(Box<dnsroute_compiler::CompileArgs>),

    /// Normalize a Clash, wildcard or canonical rule list.
    #[command(name = "convert")]
    Convert(dnsroute_compiler::ConvertArgs),

    /// Test queries against a canonical rule list.
    #[command(name = "check")]
    Check(dnsroute_compiler::CheckArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Compile(args) => dnsroute_compiler::cli::run_compile(*args),
        Commands::Convert(args) => dnsroute_compiler::cli::run_convert(args),
        Commands::Check(args) => dnsroute_compiler::cli::run_check(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
