// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration.
//!
//! Built-in defaults, then an optional TOML file, then environment
//! variables. Later sources win field by field.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::env;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:5000";
const DEFAULT_SCRIPTS_DIR: &str = "/usr/lib/rst/scripts";
const FALLBACK_SYSTEM_ROOT: &str = "/dev/root";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to read config {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Invalid config {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("Invalid {field}: {value:?}")]
    Invalid { field: &'static str, value: String },
}

/// Fields accepted in `config.toml`. All optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub listen_addr: Option<String>,
    pub workers: Option<usize>,
    pub scripts_dir: Option<PathBuf>,
    pub snapshot_history: Option<usize>,
    pub system_root: Option<String>,
    pub catalog_path: Option<PathBuf>,
    pub verify_devices: Option<bool>,
    pub drain_timeout_ms: Option<u64>,
    pub job_timeout_secs: Option<u64>,
    pub job_retention_secs: Option<u64>,
}

impl FileConfig {
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        toml::from_str(&text).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }

    /// Overlay environment variables onto the file values.
    fn with_env(mut self) -> Self {
        self.listen_addr = env::listen_addr().or(self.listen_addr);
        self.workers = env::workers().or(self.workers);
        self.scripts_dir = env::scripts_dir().or(self.scripts_dir);
        self.snapshot_history = env::snapshot_history().or(self.snapshot_history);
        self.system_root = env::system_root().or(self.system_root);
        self.catalog_path = env::catalog_path().or(self.catalog_path);
        self.verify_devices = env::verify_devices().or(self.verify_devices);
        if let Some(drain) = env::drain_timeout() {
            self.drain_timeout_ms = Some(drain.as_millis() as u64);
        }
        if let Some(timeout) = env::job_timeout() {
            self.job_timeout_secs = Some(timeout.as_secs());
        }
        if let Some(retention) = env::job_retention() {
            self.job_retention_secs = Some(retention.as_secs());
        }
        self
    }
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/rst)
    pub state_dir: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    pub listen_addr: SocketAddr,
    /// Concurrently running jobs
    pub workers: usize,
    /// Directory holding the operation scripts
    pub scripts_dir: PathBuf,
    /// Snapshots kept per resource
    pub snapshot_history: usize,
    /// Explicit root device; detected from the mount table when unset
    pub system_root: Option<String>,
    /// JSON catalog file; the built-in catalog is served when unset
    pub catalog_path: Option<PathBuf>,
    pub verify_devices: bool,
    pub drain_timeout: Duration,
    /// Running jobs older than this are cancelled with reason `timeout`
    pub job_timeout: Option<Duration>,
    /// Finished jobs older than this are dropped from the store
    pub job_retention: Option<Duration>,
}

impl Config {
    /// Load configuration for the daemon from file and environment.
    pub fn load() -> Result<Self, ConfigError> {
        let state_dir = env::state_dir()?;
        let path = env::config_path().unwrap_or_else(|| state_dir.join("config.toml"));
        let file = if path.exists() { FileConfig::read(&path)? } else { FileConfig::default() };
        Self::resolve(state_dir, file.with_env())
    }

    /// Defaults for everything not set in `file`.
    pub fn resolve(state_dir: PathBuf, file: FileConfig) -> Result<Self, ConfigError> {
        let listen = file.listen_addr.unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = listen
            .parse()
            .map_err(|_| ConfigError::Invalid { field: "listen_addr", value: listen.clone() })?;
        let workers = file.workers.unwrap_or(2);
        if workers == 0 {
            return Err(ConfigError::Invalid { field: "workers", value: workers.to_string() });
        }
        let snapshot_history = file.snapshot_history.unwrap_or(4);
        if snapshot_history == 0 {
            return Err(ConfigError::Invalid {
                field: "snapshot_history",
                value: snapshot_history.to_string(),
            });
        }

        Ok(Self {
            lock_path: state_dir.join("daemon.pid"),
            log_path: state_dir.join("daemon.log"),
            state_dir,
            listen_addr,
            workers,
            scripts_dir: file.scripts_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_SCRIPTS_DIR)),
            snapshot_history,
            system_root: file.system_root,
            catalog_path: file.catalog_path,
            verify_devices: file.verify_devices.unwrap_or(true),
            drain_timeout: Duration::from_millis(file.drain_timeout_ms.unwrap_or(5_000)),
            job_timeout: file.job_timeout_secs.filter(|s| *s > 0).map(Duration::from_secs),
            job_retention: file.job_retention_secs.filter(|s| *s > 0).map(Duration::from_secs),
        })
    }

    /// Root device for self backups: configured, detected, or `/dev/root`.
    pub fn system_root_device(&self) -> String {
        self.system_root
            .clone()
            .or_else(rst_adapters::system_root_device)
            .unwrap_or_else(|| FALLBACK_SYSTEM_ROOT.to_string())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
