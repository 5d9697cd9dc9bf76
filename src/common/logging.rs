//! Logging and tracing configuration
//!
//! Console logging level is shifted by the -v/-q flags; an optional log
//! file gets the full detail regardless of console verbosity.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

/// Console verbosity selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    fn default_directive(self) -> &'static str {
        match self {
            Verbosity::Quiet => "testrig=warn,error",
            Verbosity::Normal => "testrig=info,warn",
            Verbosity::Verbose => "testrig=debug,info",
        }
    }
}

/// Initialize tracing for the CLI.
///
/// `RUST_LOG` takes precedence over the verbosity flags when set. When a
/// log file is given, it receives debug-level output with full detail; the
/// returned guard must be kept alive until exit so buffered lines flush.
pub fn init(verbosity: Verbosity, log_file: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.default_directive()));

    let console_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .with_filter(filter);

    let registry = tracing_subscriber::registry().with(console_layer);

    if let Some(path) = log_file {
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
        {
            Ok(file) => {
                let (writer, guard) = tracing_appender::non_blocking(file);
                let file_layer = fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_filter(EnvFilter::new("testrig=debug,info"));

                registry.with(file_layer).init();
                return Some(guard);
            }
            Err(e) => {
                eprintln!("Warning: could not open log file '{}': {}", path.display(), e);
            }
        }
    }

    registry.init();
    None
}
