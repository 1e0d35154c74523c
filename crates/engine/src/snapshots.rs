// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot history and the single-undo "last action".
//!
//! Every destructive job snapshots its targets before the action runs. The
//! most recent destructive job whose action was invoked becomes the global
//! last action; a rollback re-applies exactly the snapshots that job
//! captured and, once it succeeds, consumes them.

use crate::error::EngineError;
use parking_lot::Mutex;
use rst_adapters::{SnapshotError, SnapshotProvider};
use rst_core::{Clock, JobId, JobKind, ResourceId, SnapshotRecord};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info};

/// The destructive job a rollback would undo.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LastAction {
    pub job_id: JobId,
    pub kind: JobKind,
    pub snapshots: Vec<SnapshotRecord>,
}

#[derive(Default)]
struct History {
    by_resource: HashMap<ResourceId, VecDeque<SnapshotRecord>>,
    last_action: Option<LastAction>,
}

pub struct SnapshotManager<C: Clock> {
    provider: Arc<dyn SnapshotProvider>,
    clock: C,
    depth: usize,
    history: Mutex<History>,
}

impl<C: Clock> SnapshotManager<C> {
    /// `depth` is the number of records kept per resource (at least one).
    pub fn new(provider: Arc<dyn SnapshotProvider>, clock: C, depth: usize) -> Self {
        Self { provider, clock, depth: depth.max(1), history: Mutex::new(History::default()) }
    }

    /// Capture and record a snapshot of `resource`.
    pub async fn capture(&self, resource: &ResourceId) -> Result<SnapshotRecord, SnapshotError> {
        let reference = self.provider.capture(resource).await?;
        let record = SnapshotRecord {
            resource: resource.clone(),
            captured_at_ms: self.clock.epoch_ms(),
            reference,
        };
        let mut history = self.history.lock();
        let entries = history.by_resource.entry(resource.clone()).or_default();
        entries.push_back(record.clone());
        while entries.len() > self.depth {
            entries.pop_front();
        }
        debug!(resource = %resource, reference = %record.reference, "snapshot recorded");
        Ok(record)
    }

    pub fn most_recent(&self, resource: &ResourceId) -> Result<SnapshotRecord, EngineError> {
        self.history
            .lock()
            .by_resource
            .get(resource)
            .and_then(|entries| entries.back().cloned())
            .ok_or_else(|| EngineError::NoSnapshot(resource.clone()))
    }

    /// Records kept for `resource`, oldest first.
    pub fn history(&self, resource: &ResourceId) -> Vec<SnapshotRecord> {
        self.history
            .lock()
            .by_resource
            .get(resource)
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Mark `job` as the last action, superseding any earlier one.
    pub fn record_completed(&self, job: &JobId, kind: JobKind, snapshots: Vec<SnapshotRecord>) {
        info!(job_id = %job, %kind, count = snapshots.len(), "last action recorded");
        self.history.lock().last_action =
            Some(LastAction { job_id: job.clone(), kind, snapshots });
    }

    pub fn last_action(&self) -> Option<LastAction> {
        self.history.lock().last_action.clone()
    }

    /// Forget the last action after it was rolled back.
    ///
    /// Returns `false` when `of_job` is no longer the last action, in which
    /// case nothing changes.
    pub fn consume(&self, of_job: &JobId) -> bool {
        let mut history = self.history.lock();
        if history.last_action.as_ref().map(|last| &last.job_id) != Some(of_job) {
            return false;
        }
        let Some(last) = history.last_action.take() else {
            return false;
        };
        for record in &last.snapshots {
            if let Some(entries) = history.by_resource.get_mut(&record.resource) {
                entries.retain(|r| r.reference != record.reference);
            }
        }
        info!(job_id = %of_job, "last action rolled back");
        true
    }
}

#[cfg(test)]
#[path = "snapshots_tests.rs"]
mod tests;
