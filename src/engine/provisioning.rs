//! Provisioning capability interface
//!
//! A provisioning backend owns the actual test executors. The engine only
//! knows the five lifecycle operations and the continue/done signal from
//! the check loop; everything else is the backend's business.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::common::{Error, Result};
use crate::config::Configuration;

/// Signal returned by a successful `check()` poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckSignal {
    /// Still running, poll again
    Continue,
    /// Execution finished
    Done,
}

/// A pluggable backend driven through the fixed lifecycle.
///
/// Every operation runs at most once per invocation, except `check`,
/// which is polled until it reports `Done` or fails. Implementations
/// report failure by returning an error; the engine decides what still
/// runs afterwards.
#[async_trait]
pub trait Provisioning: Send {
    async fn prepare(&mut self) -> Result<()>;
    async fn startup(&mut self) -> Result<()>;
    async fn check(&mut self) -> Result<CheckSignal>;
    async fn shutdown(&mut self) -> Result<()>;
    async fn post_process(&mut self) -> Result<()>;
}

impl std::fmt::Debug for dyn Provisioning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Provisioning")
    }
}

/// Factory building a backend from the final configuration tree
pub type ProvisioningFactory = Box<dyn Fn(&Configuration) -> Box<dyn Provisioning> + Send + Sync>;

/// Name-to-factory registry for provisioning backends
#[derive(Default)]
pub struct ProvisioningRegistry {
    factories: BTreeMap<String, ProvisioningFactory>,
}

impl ProvisioningRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in backends registered
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("local", |config| Box::new(LocalProvisioning::new(config)));
        registry
    }

    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&Configuration) -> Box<dyn Provisioning> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    /// Instantiate the named backend for this configuration
    pub fn create(&self, name: &str, config: &Configuration) -> Result<Box<dyn Provisioning>> {
        self.factories
            .get(name)
            .map(|factory| factory(config))
            .ok_or_else(|| Error::UnknownProvisioning {
                name: name.to_string(),
                available: self.names().join(", "),
            })
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

/// Built-in backend that runs the configured executions in-process.
///
/// Kept deliberately small: it validates the `execution` section, honors
/// `settings.hold-for` as a running time, and reports completion. Real
/// executors plug in as their own `Provisioning` implementations.
pub struct LocalProvisioning {
    executions: Vec<Value>,
    hold_for: Duration,
    started_at: Option<Instant>,
}

impl LocalProvisioning {
    pub fn new(config: &Configuration) -> Self {
        let executions = config
            .get("execution")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let hold_for = config
            .get_f64("settings.hold-for")
            .filter(|secs| *secs > 0.0)
            .map(Duration::from_secs_f64)
            .unwrap_or(Duration::ZERO);

        Self {
            executions,
            hold_for,
            started_at: None,
        }
    }
}

#[async_trait]
impl Provisioning for LocalProvisioning {
    async fn prepare(&mut self) -> Result<()> {
        if self.executions.is_empty() {
            return Err(Error::phase(
                "prepare",
                "no 'execution' entries configured, nothing to run",
            ));
        }
        info!("Prepared {} execution(s)", self.executions.len());
        Ok(())
    }

    async fn startup(&mut self) -> Result<()> {
        for (index, execution) in self.executions.iter().enumerate() {
            let scenario = execution
                .get("scenario")
                .and_then(Value::as_str)
                .unwrap_or("unnamed");
            info!("Starting execution {index}: {scenario}");
        }
        self.started_at = Some(Instant::now());
        Ok(())
    }

    async fn check(&mut self) -> Result<CheckSignal> {
        let started_at = self
            .started_at
            .ok_or_else(|| Error::phase("check", "check before startup"))?;
        if started_at.elapsed() >= self.hold_for {
            Ok(CheckSignal::Done)
        } else {
            Ok(CheckSignal::Continue)
        }
    }

    async fn shutdown(&mut self) -> Result<()> {
        info!("Executions stopped");
        Ok(())
    }

    async fn post_process(&mut self) -> Result<()> {
        info!("Post-processing finished");
        Ok(())
    }
}
