//! Configuration file discovery
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/testrig/`
//! - macOS: `~/Library/Application Support/testrig/`
//! - Windows: `%APPDATA%\testrig\`

use std::path::PathBuf;

const APP_NAME: &str = "testrig";

/// Get the per-user configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the per-user base config file, if one exists on disk.
///
/// Checked names, in order: `config.yml`, `config.yaml`, `config.json`,
/// `config.toml`. This file is merged before any configs given on the
/// command line, unless `--no-system-configs` was passed.
pub fn user_config_path() -> Option<PathBuf> {
    let dir = config_dir()?;
    for name in ["config.yml", "config.yaml", "config.json", "config.toml"] {
        let candidate = dir.join(name);
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}
