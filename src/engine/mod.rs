//! Execution controller
//!
//! Builds the final configuration (files, then overrides), instantiates
//! the selected provisioning backend, and drives it through the five-phase
//! lifecycle with the gating rules below:
//!
//! - prepare always runs first; if it fails, startup and check are skipped
//! - startup runs only after a successful prepare; if it fails, check is
//!   skipped but shutdown still runs (whatever startup partially
//!   allocated must be torn down)
//! - check polls only after a successful startup, until done or failure
//! - shutdown runs whenever startup was attempted, whatever check did
//! - post_process always runs, exactly once, no matter what
//!
//! Each phase failure is caught and recorded, never propagated; the
//! recorded outcomes pick the process exit code at the end.

pub mod provisioning;

use std::path::PathBuf;
use std::time::Duration;

use colored::Colorize;
use tracing::{error, info, warn};

use crate::common::{Error, Result};
use crate::config::{self, apply_overrides, Configuration};

pub use provisioning::{CheckSignal, Provisioning, ProvisioningRegistry};

/// Default delay between check() polls, in seconds
const DEFAULT_CHECK_INTERVAL: f64 = 1.0;

/// Final process status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Every attempted phase succeeded
    Success,
    /// Functional failure: overrides, setup, or any phase before post-processing
    Failure,
    /// The run itself succeeded, only post-processing failed
    ReportingFailure,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        match self {
            ExitCode::Success => 0,
            ExitCode::Failure => 1,
            ExitCode::ReportingFailure => 3,
        }
    }
}

/// One failure slot per phase; `None` means succeeded or skipped
#[derive(Debug, Default)]
struct PhaseOutcomes {
    prepare: Option<Error>,
    startup: Option<Error>,
    check: Option<Error>,
    shutdown: Option<Error>,
    post_process: Option<Error>,
}

impl PhaseOutcomes {
    /// Derive the exit code from the recorded failures.
    ///
    /// Any functional-phase failure wins over a post-processing failure,
    /// so automation can tell "the test broke" (1) apart from "the test
    /// ran, the report didn't" (3).
    fn exit_code(&self) -> ExitCode {
        let functional_failure = self.prepare.is_some()
            || self.startup.is_some()
            || self.check.is_some()
            || self.shutdown.is_some();

        if functional_failure {
            ExitCode::Failure
        } else if self.post_process.is_some() {
            ExitCode::ReportingFailure
        } else {
            ExitCode::Success
        }
    }
}

/// The execution controller for one CLI invocation
pub struct Engine {
    registry: ProvisioningRegistry,
    overrides: Vec<String>,
}

impl Engine {
    pub fn new(registry: ProvisioningRegistry, overrides: Vec<String>) -> Self {
        Self {
            registry,
            overrides,
        }
    }

    /// Run the whole invocation and return the process exit code.
    ///
    /// Configuration or override failures abort before any phase runs and
    /// map to exit code 1. Phase failures are recorded per phase and only
    /// influence gating and the final code.
    pub async fn perform(&self, sources: &[PathBuf]) -> i32 {
        let config = match self.configure(sources) {
            Ok(config) => config,
            Err(e) => {
                error!("{e}");
                return ExitCode::Failure.code();
            }
        };

        let prov = match self.resolve_provisioning(&config) {
            Ok(prov) => prov,
            Err(e) => {
                error!("{e}");
                return ExitCode::Failure.code();
            }
        };

        let check_interval = config
            .get_f64("settings.check-interval")
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or_else(|| Duration::from_secs_f64(DEFAULT_CHECK_INTERVAL));

        let outcomes = run_lifecycle(prov, check_interval).await;
        let exit_code = outcomes.exit_code();

        match exit_code {
            ExitCode::Success => println!("{}", "Done, no failures".green().bold()),
            ExitCode::ReportingFailure => println!(
                "{}",
                "Execution finished, but post-processing failed".yellow().bold()
            ),
            ExitCode::Failure => println!("{}", "Execution failed".red().bold()),
        }

        exit_code.code()
    }

    /// Load and merge config sources, then apply the overrides in order
    fn configure(&self, sources: &[PathBuf]) -> Result<Configuration> {
        let mut config = config::loader::load(sources)?;
        apply_overrides(&self.overrides, &mut config)?;
        Ok(config)
    }

    /// Read the provisioning selection from the tree and instantiate it
    fn resolve_provisioning(&self, config: &Configuration) -> Result<Box<dyn Provisioning>> {
        let name = match config.get("provisioning") {
            None => "local",
            Some(value) => value
                .as_str()
                .ok_or_else(|| Error::InvalidProvisioning(value.to_string()))?,
        };
        info!("Provisioning: {name}");
        self.registry.create(name, config)
    }
}

/// Drive the backend through the five phases per the gating rules
async fn run_lifecycle(mut prov: Box<dyn Provisioning>, check_interval: Duration) -> PhaseOutcomes {
    let mut outcomes = PhaseOutcomes::default();

    let prepared = record("prepare", prov.prepare().await, &mut outcomes.prepare);

    if prepared {
        let started = record("startup", prov.startup().await, &mut outcomes.startup);

        if started {
            record(
                "check",
                poll(prov.as_mut(), check_interval).await,
                &mut outcomes.check,
            );
        }

        // Cleanup is owed for whatever startup may have allocated, even
        // partially, so shutdown runs whenever startup was attempted
        record("shutdown", prov.shutdown().await, &mut outcomes.shutdown);
    }

    // Unconditional finalization: reporting must run even after failures
    record(
        "post_process",
        prov.post_process().await,
        &mut outcomes.post_process,
    );

    outcomes
}

/// Poll check() until it reports done or fails
async fn poll(prov: &mut dyn Provisioning, interval: Duration) -> Result<()> {
    loop {
        match prov.check().await? {
            CheckSignal::Done => return Ok(()),
            CheckSignal::Continue => tokio::time::sleep(interval).await,
        }
    }
}

/// Record a phase result in its outcome slot, returning whether it succeeded
fn record(phase: &str, result: Result<()>, slot: &mut Option<Error>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!("Phase {phase} failed: {e}");
            *slot = Some(e);
            false
        }
    }
}
