// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pre-action snapshot capture.

use crate::script::{ScriptArgs, ScriptError, ScriptRunner};
use async_trait::async_trait;
use rst_core::ResourceId;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error("snapshot of {resource} failed: {reason}")]
    Failed { resource: ResourceId, reason: String },
}

/// Captures a recoverable reference for a resource's current state.
#[async_trait]
pub trait SnapshotProvider: Send + Sync + 'static {
    /// Returns an opaque reference later handed back to `rollback.sh`.
    async fn capture(&self, resource: &ResourceId) -> Result<String, SnapshotError>;
}

/// Arguments for `snapshot.sh`.
#[derive(Debug, Clone)]
pub struct SnapshotArgs {
    pub device: String,
}

impl ScriptArgs for SnapshotArgs {
    fn script_name(&self) -> &'static str {
        "snapshot.sh"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["--device".into(), self.device.clone()]
    }
}

/// Runs `snapshot.sh`; the reference is the last non-empty stdout line.
#[derive(Debug, Clone)]
pub struct ScriptSnapshotProvider {
    runner: ScriptRunner,
}

impl ScriptSnapshotProvider {
    pub fn new(runner: ScriptRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl SnapshotProvider for ScriptSnapshotProvider {
    async fn capture(&self, resource: &ResourceId) -> Result<String, SnapshotError> {
        let args = SnapshotArgs { device: resource.to_string() };
        // Snapshots are short and must not be left half-written
        let output = self.runner.run_raw(&args, &CancellationToken::new()).await?;
        let failed = |reason: String| SnapshotError::Failed { resource: resource.clone(), reason };
        if !output.success() {
            let code = output.exit_code.map_or_else(|| "signal".to_string(), |c| c.to_string());
            return Err(failed(format!("snapshot.sh exited with {code}: {}", output.stderr.trim())));
        }
        let reference = output
            .last_line()
            .map(str::to_string)
            .ok_or_else(|| failed("snapshot.sh printed no reference".to_string()))?;
        debug!(resource = %resource, reference = %reference, "snapshot captured");
        Ok(reference)
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
