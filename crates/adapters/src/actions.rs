// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Script-backed actions, one per operation kind.

use crate::action::{expect_kind, targets_for, writes_targets, Action};
use crate::script::{ScriptArgs, ScriptRunner};
use async_trait::async_trait;
use rst_core::{
    ActionError, ActionOutput, JobKind, JobParams, ResourceId, SnapshotRecord, ValidationError,
};
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

fn confirm(var: &str) -> Vec<(String, String)> {
    vec![(var.to_string(), "yes".to_string())]
}

/// Arguments for `install.sh`.
#[derive(Debug, Clone)]
pub struct InstallArgs {
    pub image: String,
    pub device: String,
}

impl ScriptArgs for InstallArgs {
    fn script_name(&self) -> &'static str {
        "install.sh"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["--image".into(), self.image.clone(), "--device".into(), self.device.clone()]
    }

    /// The installer refuses to wipe a disk without this confirmation.
    fn env_vars(&self) -> Vec<(String, String)> {
        confirm("CONFIRM_INSTALL")
    }
}

/// Arguments for `backup_external.sh`.
#[derive(Debug, Clone)]
pub struct BackupExternalArgs {
    pub source: String,
    pub destination: String,
}

impl ScriptArgs for BackupExternalArgs {
    fn script_name(&self) -> &'static str {
        "backup_external.sh"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![
            "--source".into(),
            self.source.clone(),
            "--destination".into(),
            self.destination.clone(),
        ]
    }

    fn env_vars(&self) -> Vec<(String, String)> {
        confirm("CONFIRM_BACKUP")
    }

    // A partial image at the destination is discarded by the script on SIGTERM
    fn interruptible(&self) -> bool {
        true
    }
}

/// Arguments for `backup_self.sh`.
#[derive(Debug, Clone)]
pub struct BackupSelfArgs {
    pub root: String,
    pub destination: String,
}

impl ScriptArgs for BackupSelfArgs {
    fn script_name(&self) -> &'static str {
        "backup_self.sh"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["--root".into(), self.root.clone(), "--destination".into(), self.destination.clone()]
    }

    fn env_vars(&self) -> Vec<(String, String)> {
        confirm("CONFIRM_BACKUP")
    }
}

/// Arguments for `restore.sh`.
#[derive(Debug, Clone)]
pub struct RestoreArgs {
    pub source: String,
    pub destination: String,
}

impl ScriptArgs for RestoreArgs {
    fn script_name(&self) -> &'static str {
        "restore.sh"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![
            "--source".into(),
            self.source.clone(),
            "--destination".into(),
            self.destination.clone(),
        ]
    }

    fn env_vars(&self) -> Vec<(String, String)> {
        confirm("CONFIRM_RESTORE")
    }
}

/// Arguments for `fsck.sh`.
#[derive(Debug, Clone)]
pub struct FsckArgs {
    pub device: String,
    pub repair: bool,
}

impl ScriptArgs for FsckArgs {
    fn script_name(&self) -> &'static str {
        "fsck.sh"
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec!["--device".into(), self.device.clone()];
        if self.repair {
            args.push("--repair".into());
        }
        args
    }

    fn env_vars(&self) -> Vec<(String, String)> {
        if self.repair {
            confirm("CONFIRM_REPAIR")
        } else {
            Vec::new()
        }
    }

    fn interruptible(&self) -> bool {
        !self.repair
    }
}

/// Arguments for `rollback.sh`, one invocation per snapshot.
#[derive(Debug, Clone)]
pub struct RollbackArgs {
    pub target: String,
    pub reference: String,
}

impl ScriptArgs for RollbackArgs {
    fn script_name(&self) -> &'static str {
        "rollback.sh"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["--target".into(), self.target.clone(), "--reference".into(), self.reference.clone()]
    }

    fn env_vars(&self) -> Vec<(String, String)> {
        confirm("CONFIRM_ROLLBACK")
    }
}

impl From<&SnapshotRecord> for RollbackArgs {
    fn from(record: &SnapshotRecord) -> Self {
        Self { target: record.resource.to_string(), reference: record.reference.clone() }
    }
}

/// Writes an OS image to a whole device.
pub struct InstallAction {
    runner: ScriptRunner,
}

impl InstallAction {
    pub fn new(runner: ScriptRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl Action for InstallAction {
    fn kind(&self) -> JobKind {
        JobKind::Install
    }

    fn is_destructive(&self, params: &JobParams) -> bool {
        writes_targets(params)
    }

    fn targets(&self, params: &JobParams) -> Result<Vec<ResourceId>, ValidationError> {
        expect_kind(JobKind::Install, params)?;
        Ok(targets_for(params, None))
    }

    async fn execute(
        &self,
        params: &JobParams,
        cancel: CancellationToken,
    ) -> Result<ActionOutput, ActionError> {
        match params {
            JobParams::Install { image_url, device } => {
                let args = InstallArgs { image: image_url.clone(), device: device.clone() };
                self.runner.run(&args, &cancel).await
            }
            other => Err(mismatch(JobKind::Install, other)),
        }
    }
}

/// Copies a source device or path to an external destination.
pub struct BackupExternalAction {
    runner: ScriptRunner,
}

impl BackupExternalAction {
    pub fn new(runner: ScriptRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl Action for BackupExternalAction {
    fn kind(&self) -> JobKind {
        JobKind::BackupExternal
    }

    fn is_destructive(&self, params: &JobParams) -> bool {
        writes_targets(params)
    }

    fn targets(&self, params: &JobParams) -> Result<Vec<ResourceId>, ValidationError> {
        expect_kind(JobKind::BackupExternal, params)?;
        Ok(targets_for(params, None))
    }

    async fn execute(
        &self,
        params: &JobParams,
        cancel: CancellationToken,
    ) -> Result<ActionOutput, ActionError> {
        match params {
            JobParams::BackupExternal { source, destination } => {
                let args =
                    BackupExternalArgs { source: source.clone(), destination: destination.clone() };
                self.runner.run(&args, &cancel).await
            }
            other => Err(mismatch(JobKind::BackupExternal, other)),
        }
    }
}

/// Images the running system's root device onto a destination partition.
pub struct BackupSelfAction {
    runner: ScriptRunner,
    system_root: ResourceId,
}

impl BackupSelfAction {
    pub fn new(runner: ScriptRunner, system_root: ResourceId) -> Self {
        Self { runner, system_root }
    }
}

#[async_trait]
impl Action for BackupSelfAction {
    fn kind(&self) -> JobKind {
        JobKind::BackupSelf
    }

    fn is_destructive(&self, params: &JobParams) -> bool {
        writes_targets(params)
    }

    fn targets(&self, params: &JobParams) -> Result<Vec<ResourceId>, ValidationError> {
        expect_kind(JobKind::BackupSelf, params)?;
        let targets = targets_for(params, Some(&self.system_root));
        if targets.len() < 2 {
            return Err(ValidationError::new(
                "destination",
                "must not be on the same device as the running system",
            ));
        }
        Ok(targets)
    }

    async fn execute(
        &self,
        params: &JobParams,
        cancel: CancellationToken,
    ) -> Result<ActionOutput, ActionError> {
        match params {
            JobParams::BackupSelf { destination } => {
                let args = BackupSelfArgs {
                    root: self.system_root.to_string(),
                    destination: destination.clone(),
                };
                self.runner.run(&args, &cancel).await
            }
            other => Err(mismatch(JobKind::BackupSelf, other)),
        }
    }
}

/// Writes a backup back onto a device.
pub struct RestoreAction {
    runner: ScriptRunner,
}

impl RestoreAction {
    pub fn new(runner: ScriptRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl Action for RestoreAction {
    fn kind(&self) -> JobKind {
        JobKind::Restore
    }

    fn is_destructive(&self, params: &JobParams) -> bool {
        writes_targets(params)
    }

    fn targets(&self, params: &JobParams) -> Result<Vec<ResourceId>, ValidationError> {
        expect_kind(JobKind::Restore, params)?;
        Ok(targets_for(params, None))
    }

    async fn execute(
        &self,
        params: &JobParams,
        cancel: CancellationToken,
    ) -> Result<ActionOutput, ActionError> {
        match params {
            JobParams::Restore { source, destination } => {
                let args = RestoreArgs { source: source.clone(), destination: destination.clone() };
                self.runner.run(&args, &cancel).await
            }
            other => Err(mismatch(JobKind::Restore, other)),
        }
    }
}

/// Checks (and optionally repairs) a filesystem.
pub struct FilesystemCheckAction {
    runner: ScriptRunner,
}

impl FilesystemCheckAction {
    pub fn new(runner: ScriptRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl Action for FilesystemCheckAction {
    fn kind(&self) -> JobKind {
        JobKind::FilesystemCheck
    }

    fn is_destructive(&self, params: &JobParams) -> bool {
        writes_targets(params)
    }

    fn targets(&self, params: &JobParams) -> Result<Vec<ResourceId>, ValidationError> {
        expect_kind(JobKind::FilesystemCheck, params)?;
        Ok(targets_for(params, None))
    }

    async fn execute(
        &self,
        params: &JobParams,
        cancel: CancellationToken,
    ) -> Result<ActionOutput, ActionError> {
        match params {
            JobParams::FilesystemCheck { device, repair } => {
                let args = FsckArgs { device: device.clone(), repair: *repair };
                self.runner.run(&args, &cancel).await
            }
            other => Err(mismatch(JobKind::FilesystemCheck, other)),
        }
    }
}

/// Re-applies the snapshots recorded for the last destructive job.
pub struct RollbackAction {
    runner: ScriptRunner,
}

impl RollbackAction {
    pub fn new(runner: ScriptRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl Action for RollbackAction {
    fn kind(&self) -> JobKind {
        JobKind::Rollback
    }

    fn is_destructive(&self, params: &JobParams) -> bool {
        writes_targets(params)
    }

    fn targets(&self, params: &JobParams) -> Result<Vec<ResourceId>, ValidationError> {
        expect_kind(JobKind::Rollback, params)?;
        let targets = targets_for(params, None);
        if targets.is_empty() {
            return Err(ValidationError::new("snapshots", "must not be empty"));
        }
        Ok(targets)
    }

    /// Restores each snapshot in order, stopping at the first failure.
    async fn execute(
        &self,
        params: &JobParams,
        cancel: CancellationToken,
    ) -> Result<ActionOutput, ActionError> {
        let JobParams::Rollback { of_job, snapshots } = params else {
            return Err(mismatch(JobKind::Rollback, params));
        };
        let mut restored = Vec::with_capacity(snapshots.len());
        for record in snapshots {
            let output = self.runner.run(&RollbackArgs::from(record), &cancel).await?;
            info!(job_id = %of_job, resource = %record.resource, "snapshot restored");
            restored.push(json!({
                "resource": record.resource,
                "reference": record.reference,
                "detail": output.detail,
            }));
        }
        Ok(ActionOutput::new(Some(0), json!({ "of_job": of_job, "restored": restored })))
    }
}

fn mismatch(expected: JobKind, params: &JobParams) -> ActionError {
    ActionError::invalid_input(format!("{expected} action cannot run {} parameters", params.kind()))
}

/// The full set of script-backed actions, ready to register.
pub fn script_actions(runner: &ScriptRunner, system_root: &ResourceId) -> Vec<Arc<dyn Action>> {
    vec![
        Arc::new(InstallAction::new(runner.clone())),
        Arc::new(BackupExternalAction::new(runner.clone())),
        Arc::new(BackupSelfAction::new(runner.clone(), system_root.clone())),
        Arc::new(RestoreAction::new(runner.clone())),
        Arc::new(FilesystemCheckAction::new(runner.clone())),
        Arc::new(RollbackAction::new(runner.clone())),
    ]
}

#[cfg(test)]
#[path = "actions_tests.rs"]
mod tests;
