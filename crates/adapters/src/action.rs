// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executable action contract.
//!
//! The engine never knows what an operation kind does. It asks the
//! registered [`Action`] three things: which resources to reserve, whether
//! a pre-action snapshot is required, and to execute. Adding a new kind
//! means registering another implementation, nothing else.

use async_trait::async_trait;
use rst_core::{
    dedup_targets, ActionError, ActionOutput, JobKind, JobParams, ResourceId, ValidationError,
};
use tokio_util::sync::CancellationToken;

/// An opaque executable step for one operation kind.
#[async_trait]
pub trait Action: Send + Sync + 'static {
    /// Operation kind this action handles.
    fn kind(&self) -> JobKind;

    /// Whether a snapshot of every target must be captured before `execute`.
    fn is_destructive(&self, params: &JobParams) -> bool;

    /// Resources the job must hold exclusively, in reservation order.
    fn targets(&self, params: &JobParams) -> Result<Vec<ResourceId>, ValidationError>;

    /// Run the operation.
    ///
    /// `cancel` is a cooperative signal. An action that stops on request
    /// returns an error of kind `Cancelled`; an action that cannot stop
    /// safely (mid-write) ignores it and finishes normally.
    async fn execute(
        &self,
        params: &JobParams,
        cancel: CancellationToken,
    ) -> Result<ActionOutput, ActionError>;
}

/// Standard target derivation shared by every action implementation.
///
/// `system_root` is the device holding the running system; self backups
/// reserve it as their implicit source. Other kinds ignore it.
pub fn targets_for(params: &JobParams, system_root: Option<&ResourceId>) -> Vec<ResourceId> {
    match params {
        JobParams::Install { device, .. } | JobParams::FilesystemCheck { device, .. } => {
            vec![ResourceId::for_device(device)]
        }
        JobParams::BackupExternal { source, destination }
        | JobParams::Restore { source, destination } => dedup_targets([
            ResourceId::from_location(source),
            ResourceId::from_location(destination),
        ]),
        JobParams::BackupSelf { destination } => {
            let destination = ResourceId::for_device(destination);
            dedup_targets(system_root.cloned().into_iter().chain([destination]))
        }
        JobParams::Rollback { snapshots, .. } => {
            dedup_targets(snapshots.iter().map(|s| s.resource.clone()))
        }
    }
}

/// Whether `params` describe an operation that writes to its targets.
///
/// Rollback is excluded: it consumes snapshots rather than producing them.
pub fn writes_targets(params: &JobParams) -> bool {
    match params {
        JobParams::Install { .. }
        | JobParams::BackupExternal { .. }
        | JobParams::BackupSelf { .. }
        | JobParams::Restore { .. } => true,
        JobParams::FilesystemCheck { repair, .. } => *repair,
        JobParams::Rollback { .. } => false,
    }
}

/// Guard used by actions handed parameters of another kind.
pub fn expect_kind(expected: JobKind, params: &JobParams) -> Result<(), ValidationError> {
    if params.kind() == expected {
        Ok(())
    } else {
        Err(ValidationError::new(
            "kind",
            format!("{} action cannot run {} parameters", expected, params.kind()),
        ))
    }
}

#[cfg(test)]
#[path = "action_tests.rs"]
mod tests;
