// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource lock table.
//!
//! Each resource is held by at most one job. Acquisition covers a job's
//! whole target set at once: every resource is granted together or none is,
//! and a denied request returns immediately naming the holder. Nothing ever
//! waits on a lock, so there is no lock ordering to get wrong.

use parking_lot::Mutex;
use rst_core::{JobId, ResourceId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Result of [`LockTable::try_acquire`].
#[derive(Debug)]
#[must_use]
pub enum Acquire {
    Granted(LockLease),
    Denied { resource: ResourceId, held_by: JobId },
}

#[derive(Debug, Clone, Default)]
pub struct LockTable {
    held: Arc<Mutex<HashMap<ResourceId, JobId>>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve every resource in `targets` for `job`, or none of them.
    pub fn try_acquire(&self, job: &JobId, targets: &[ResourceId]) -> Acquire {
        let mut held = self.held.lock();
        if let Some((resource, holder)) =
            targets.iter().find_map(|r| held.get(r).map(|h| (r.clone(), h.clone())))
        {
            return Acquire::Denied { resource, held_by: holder };
        }
        for resource in targets {
            held.insert(resource.clone(), job.clone());
        }
        debug!(job_id = %job, count = targets.len(), "resources acquired");
        Acquire::Granted(LockLease { table: self.clone(), job: job.clone() })
    }

    /// Release everything held by `job`. Releasing twice is a no-op.
    pub fn release(&self, job: &JobId) -> usize {
        let mut held = self.held.lock();
        let before = held.len();
        held.retain(|_, holder| holder != job);
        let released = before - held.len();
        if released > 0 {
            debug!(job_id = %job, released, "resources released");
        }
        released
    }

    /// Run `finish` and, when `releases` accepts its result, release `job`'s
    /// resources inside the same critical section.
    ///
    /// A submitter that observes the outcome of `finish` never finds the
    /// resources still held. `finish` must not touch the lock table.
    pub fn settle<T>(
        &self,
        job: &JobId,
        finish: impl FnOnce() -> T,
        releases: impl FnOnce(&T) -> bool,
    ) -> T {
        let mut held = self.held.lock();
        let outcome = finish();
        if releases(&outcome) {
            let before = held.len();
            held.retain(|_, holder| holder != job);
            let released = before - held.len();
            if released > 0 {
                debug!(job_id = %job, released, "resources released");
            }
        }
        outcome
    }

    pub fn holder(&self, resource: &ResourceId) -> Option<JobId> {
        self.held.lock().get(resource).cloned()
    }

    /// Snapshot of all held resources, sorted by resource.
    pub fn held(&self) -> Vec<(ResourceId, JobId)> {
        let mut entries: Vec<_> =
            self.held.lock().iter().map(|(r, j)| (r.clone(), j.clone())).collect();
        entries.sort();
        entries
    }
}

/// Scoped ownership of a job's resources; dropping it releases them.
#[derive(Debug)]
pub struct LockLease {
    table: LockTable,
    job: JobId,
}

impl LockLease {
    pub fn job(&self) -> &JobId {
        &self.job
    }

    /// Record the job's outcome with `finish` and release its resources atomically.
    pub fn settle<T>(self, finish: impl FnOnce() -> T) -> T {
        self.table.settle(&self.job, finish, |_| true)
    }
}

impl Drop for LockLease {
    fn drop(&mut self) {
        self.table.release(&self.job);
    }
}

#[cfg(test)]
#[path = "locks_tests.rs"]
mod tests;
