//! Error types for the testrig CLI
//!
//! Error messages are written for the command line: they name the file or
//! override that caused the problem and, where possible, how to fix it.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the testrig CLI
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("Failed to read config file '{path}': {error}")]
    ConfigLoad { path: String, error: String },

    #[error("Failed to parse config file '{path}': {error}")]
    ConfigParse { path: String, error: String },

    #[error("Config file must contain a mapping at the top level: '{0}'")]
    ConfigNotMapping(String),

    // === Override Errors ===
    #[error("Malformed override '{override_text}': {reason}")]
    OverrideParse {
        override_text: String,
        reason: String,
    },

    #[error("Conflicting overrides:\n{}", .conflicts.join("\n"))]
    OverrideConflict { conflicts: Vec<String> },

    // === Provisioning Errors ===
    #[error("Unknown provisioning '{name}'. Available: {available}")]
    UnknownProvisioning { name: String, available: String },

    #[error("Provisioning '{0}' selection must be a string")]
    InvalidProvisioning(String),

    #[error("{phase} failed: {message}")]
    Phase { phase: String, message: String },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a phase failure error with a phase name and cause
    pub fn phase(phase: &str, message: impl std::fmt::Display) -> Self {
        Self::Phase {
            phase: phase.to_string(),
            message: message.to_string(),
        }
    }

    /// Create an override parse error
    pub fn override_parse(override_text: &str, reason: &str) -> Self {
        Self::OverrideParse {
            override_text: override_text.to_string(),
            reason: reason.to_string(),
        }
    }
}
