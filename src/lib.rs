//! testrig - a test-automation CLI
//!
//! Drives pluggable provisioning backends through a fixed five-phase
//! lifecycle (prepare, startup, check, shutdown, post-process), configured
//! by a merged configuration tree that can be patched from the command line.

pub mod common;
pub mod config;
pub mod engine;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use config::Configuration;
pub use engine::{Engine, ExitCode};
