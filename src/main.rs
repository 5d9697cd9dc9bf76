//! testrig - test-automation CLI
//!
//! Merges configuration files, applies command-line overrides, and drives
//! the selected provisioning backend through the execution lifecycle.
//! The exit code is the controller's verdict: 0 success, 1 functional
//! failure, 3 success with post-processing failure.

use std::path::PathBuf;

use clap::Parser;

use testrig::common::logging::{self, Verbosity};
use testrig::common::paths;
use testrig::engine::{Engine, ProvisioningRegistry};

#[derive(Parser)]
#[command(name = "testrig", about = "Test-automation tool")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration files to merge, in order
    configs: Vec<PathBuf>,

    /// Override a configuration value: PATH=VALUE (repeatable, applied in order)
    #[arg(short = 'o', long = "option", value_name = "PATH=VALUE")]
    options: Vec<String>,

    /// More console output
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Less console output
    #[arg(short, long)]
    quiet: bool,

    /// Also write a detailed log file
    #[arg(short = 'l', long = "log", value_name = "FILE")]
    log: Option<PathBuf>,

    /// Skip the per-user base config
    #[arg(short = 'n', long = "no-system-configs")]
    no_system_configs: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let verbosity = if cli.verbose {
        Verbosity::Verbose
    } else if cli.quiet {
        Verbosity::Quiet
    } else {
        Verbosity::Normal
    };
    // Guard flushes the log file on drop
    let _guard = logging::init(verbosity, cli.log.as_deref());

    let mut sources = Vec::new();
    if !cli.no_system_configs {
        if let Some(path) = paths::user_config_path() {
            sources.push(path);
        }
    }
    sources.extend(cli.configs);

    let engine = Engine::new(ProvisioningRegistry::builtin(), cli.options);
    let code = engine.perform(&sources).await;
    std::process::exit(code);
}
