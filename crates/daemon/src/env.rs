// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::config::ConfigError;

/// Crate version reported by the health endpoint
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Resolve state directory: RST_STATE_DIR > XDG_STATE_HOME/rst > ~/.local/state/rst
pub fn state_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("RST_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("rst"));
    }
    let home = dirs::home_dir().ok_or(ConfigError::NoStateDir)?;
    Ok(home.join(".local/state/rst"))
}

/// Explicit config file, overriding `<state_dir>/config.toml`
pub fn config_path() -> Option<PathBuf> {
    non_empty("RST_CONFIG").map(PathBuf::from)
}

pub fn listen_addr() -> Option<String> {
    non_empty("RST_LISTEN_ADDR")
}

pub fn workers() -> Option<usize> {
    parsed("RST_WORKERS")
}

pub fn scripts_dir() -> Option<PathBuf> {
    non_empty("RST_SCRIPTS_DIR").map(PathBuf::from)
}

/// Snapshots kept per resource
pub fn snapshot_history() -> Option<usize> {
    parsed("RST_SNAPSHOT_HISTORY")
}

/// Root device used as the source of self backups
pub fn system_root() -> Option<String> {
    non_empty("RST_SYSTEM_ROOT")
}

pub fn catalog_path() -> Option<PathBuf> {
    non_empty("RST_CATALOG_PATH").map(PathBuf::from)
}

/// Accepts `1/0`, `true/false`, `yes/no`
pub fn verify_devices() -> Option<bool> {
    match non_empty("RST_VERIFY_DEVICES")?.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Shutdown drain timeout (`RST_DRAIN_TIMEOUT_MS`)
pub fn drain_timeout() -> Option<Duration> {
    parsed::<u64>("RST_DRAIN_TIMEOUT_MS").map(Duration::from_millis)
}

/// Operational job timeout (`RST_JOB_TIMEOUT_SECS`); zero disables it
pub fn job_timeout() -> Option<Duration> {
    parsed::<u64>("RST_JOB_TIMEOUT_SECS").map(Duration::from_secs)
}

/// Finished job retention (`RST_JOB_RETENTION_SECS`); zero keeps jobs forever
pub fn job_retention() -> Option<Duration> {
    parsed::<u64>("RST_JOB_RETENTION_SECS").map(Duration::from_secs)
}

fn non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    non_empty(key).and_then(|s| s.trim().parse().ok())
}
