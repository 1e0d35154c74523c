// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authoritative job records.
//!
//! The store holds no business logic beyond applying state-machine
//! transitions. Writers hold the lock only for the duration of one
//! transition, so status queries never wait on a running action.

use indexmap::IndexMap;
use parking_lot::RwLock;
use rst_core::{CancelOutcome, CancelReason, Job, JobId, JobState, Transition, TransitionError};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("job already exists: {0}")]
    Duplicate(JobId),
    #[error("job {id}: {source}")]
    Transition {
        id: JobId,
        #[source]
        source: TransitionError,
    },
}

/// Jobs in creation order.
#[derive(Debug, Clone, Default)]
pub struct JobStore {
    jobs: Arc<RwLock<IndexMap<JobId, Job>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, job: Job) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write();
        if jobs.contains_key(&job.id) {
            return Err(StoreError::Duplicate(job.id));
        }
        jobs.insert(job.id.clone(), job);
        Ok(())
    }

    pub fn get(&self, id: &JobId) -> Result<Job, StoreError> {
        self.jobs.read().get(id).cloned().ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    pub fn contains(&self, id: &JobId) -> bool {
        self.jobs.read().contains_key(id)
    }

    pub fn list(&self) -> Vec<Job> {
        self.jobs.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply a transition and return the updated record.
    pub fn transition(&self, id: &JobId, transition: Transition) -> Result<Job, StoreError> {
        let mut jobs = self.jobs.write();
        let job = jobs.get_mut(id).ok_or_else(|| StoreError::NotFound(id.clone()))?;
        job.apply(transition).map_err(|source| StoreError::Transition { id: id.clone(), source })?;
        Ok(job.clone())
    }

    pub fn request_cancel(
        &self,
        id: &JobId,
        reason: CancelReason,
        at_ms: u64,
    ) -> Result<CancelOutcome, StoreError> {
        let mut jobs = self.jobs.write();
        let job = jobs.get_mut(id).ok_or_else(|| StoreError::NotFound(id.clone()))?;
        Ok(job.request_cancel(reason, at_ms))
    }

    /// Ids of jobs still waiting for a worker.
    pub fn pending(&self) -> Vec<JobId> {
        self.jobs
            .read()
            .values()
            .filter(|j| j.state == JobState::Pending)
            .map(|j| j.id.clone())
            .collect()
    }

    /// Drop terminal jobs that finished before `before_ms`.
    ///
    /// Retention policy belongs to the caller; the store only offers the hook.
    pub fn prune_finished(&self, before_ms: u64) -> usize {
        let mut jobs = self.jobs.write();
        let before = jobs.len();
        jobs.retain(|_, job| {
            let expired = job.finished_at_ms.is_some_and(|t| t < before_ms);
            !(job.is_terminal() && expired)
        });
        before - jobs.len()
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
