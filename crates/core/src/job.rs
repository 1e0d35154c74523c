// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job identifier and state machine.
//!
//! ```text
//! Pending --start--> Running --succeed--> Succeeded
//!    |                  |----fail------> Failed
//!    |                  `----cancel----> Cancelled   (action acknowledged)
//!    `------cancel--------------------> Cancelled
//! ```
//!
//! Terminal states reject every further transition, so a job's history is
//! strictly `Pending → Running → terminal` (or `Pending → Cancelled`).

use crate::outcome::{ActionOutput, FailureKind, JobError};
use crate::params::{JobKind, JobParams};
use crate::resource::ResourceId;
use crate::snapshot::SnapshotRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

crate::define_id! {
    /// Unique identifier for a job.
    ///
    /// Generated at creation and stable for the job's lifetime; status
    /// lookups by id are idempotent.
    pub struct JobId("job-");
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

crate::simple_display! {
    JobState {
        Pending => "pending",
        Running => "running",
        Succeeded => "succeeded",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed | JobState::Cancelled)
    }

    fn can_move_to(self, to: JobState) -> bool {
        matches!(
            (self, to),
            (JobState::Pending, JobState::Running)
                | (JobState::Pending, JobState::Cancelled)
                | (JobState::Running, JobState::Succeeded)
                | (JobState::Running, JobState::Failed)
                | (JobState::Running, JobState::Cancelled)
        )
    }
}

/// Why cancellation was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// Explicit request from an API client
    User,
    /// Operational timeout imposed by a supervising layer
    Timeout,
    /// Daemon is shutting down
    Shutdown,
}

crate::simple_display! {
    CancelReason {
        User => "user",
        Timeout => "timeout",
        Shutdown => "shutdown",
    }
}

impl CancelReason {
    /// Failure kind recorded when a cancellation with this reason is honored.
    pub fn failure_kind(self) -> FailureKind {
        match self {
            CancelReason::Timeout => FailureKind::Timeout,
            CancelReason::User | CancelReason::Shutdown => FailureKind::Cancelled,
        }
    }
}

/// Cancellation request recorded on a running job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancellation {
    pub reason: CancelReason,
    pub requested_at_ms: u64,
    /// Set when the action ran to completion instead of honoring the request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<JobError>,
}

/// Result set exactly once, at the terminal transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobResult {
    Succeeded { output: ActionOutput },
    Failed { error: JobError },
    Cancelled { error: JobError },
}

impl JobResult {
    pub fn error(&self) -> Option<&JobError> {
        match self {
            JobResult::Succeeded { .. } => None,
            JobResult::Failed { error } | JobResult::Cancelled { error } => Some(error),
        }
    }
}

/// A single state change applied by the job store.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Start { at_ms: u64 },
    Succeed { at_ms: u64, output: ActionOutput, snapshots: Vec<SnapshotRecord> },
    Fail { at_ms: u64, error: JobError, snapshots: Vec<SnapshotRecord> },
    Cancel { at_ms: u64, error: JobError, snapshots: Vec<SnapshotRecord> },
}

impl Transition {
    pub fn target(&self) -> JobState {
        match self {
            Transition::Start { .. } => JobState::Running,
            Transition::Succeed { .. } => JobState::Succeeded,
            Transition::Fail { .. } => JobState::Failed,
            Transition::Cancel { .. } => JobState::Cancelled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot move job from {from} to {to}")]
pub struct TransitionError {
    pub from: JobState,
    pub to: JobState,
}

/// What a cancellation request did to a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelOutcome {
    /// Job was still pending and is now cancelled
    Cancelled,
    /// Job is running; its action was asked to stop
    Requested,
    /// Job is running and cancellation had already been requested
    AlreadyRequested,
    /// Job had already reached a terminal state
    AlreadyFinished,
}

/// A unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub kind: JobKind,
    pub params: JobParams,
    /// Resources held exclusively while the job is non-terminal
    pub targets: Vec<ResourceId>,
    pub state: JobState,
    pub created_at_ms: u64,
    pub started_at_ms: Option<u64>,
    pub finished_at_ms: Option<u64>,
    pub result: Option<JobResult>,
    /// Snapshots captured before a destructive action
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub snapshots: Vec<SnapshotRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation: Option<Cancellation>,
}

impl Job {
    /// Create a pending job.
    pub fn new(id: JobId, params: JobParams, targets: Vec<ResourceId>, created_at_ms: u64) -> Self {
        Self {
            id,
            kind: params.kind(),
            params,
            targets,
            state: JobState::Pending,
            created_at_ms,
            started_at_ms: None,
            finished_at_ms: None,
            result: None,
            snapshots: Vec::new(),
            cancellation: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Apply a transition, rejecting anything the state machine forbids.
    pub fn apply(&mut self, transition: Transition) -> Result<(), TransitionError> {
        let to = transition.target();
        if !self.state.can_move_to(to) {
            return Err(TransitionError { from: self.state, to });
        }
        match transition {
            Transition::Start { at_ms } => {
                self.started_at_ms = Some(at_ms);
            }
            Transition::Succeed { at_ms, output, snapshots } => {
                self.finish(at_ms, snapshots);
                self.note_unhonored_cancellation();
                self.result = Some(JobResult::Succeeded { output });
            }
            Transition::Fail { at_ms, error, snapshots } => {
                self.finish(at_ms, snapshots);
                // A snapshot failure means the action was never invoked
                if error.kind != FailureKind::SnapshotFailure {
                    self.note_unhonored_cancellation();
                }
                self.result = Some(JobResult::Failed { error });
            }
            Transition::Cancel { at_ms, error, snapshots } => {
                self.finish(at_ms, snapshots);
                self.result = Some(JobResult::Cancelled { error });
            }
        }
        self.state = to;
        Ok(())
    }

    /// Handle a cancellation request.
    ///
    /// Pending jobs are cancelled outright. Running jobs only record the
    /// request; the state becomes `Cancelled` once the action acknowledges.
    pub fn request_cancel(&mut self, reason: CancelReason, at_ms: u64) -> CancelOutcome {
        match self.state {
            JobState::Pending => {
                let error = JobError::new(reason.failure_kind(), format!("cancelled before start ({reason})"));
                match self.apply(Transition::Cancel { at_ms, error, snapshots: Vec::new() }) {
                    Ok(()) => CancelOutcome::Cancelled,
                    Err(_) => CancelOutcome::AlreadyFinished,
                }
            }
            JobState::Running if self.cancellation.is_some() => CancelOutcome::AlreadyRequested,
            JobState::Running => {
                self.cancellation =
                    Some(Cancellation { reason, requested_at_ms: at_ms, failure: None });
                CancelOutcome::Requested
            }
            _ => CancelOutcome::AlreadyFinished,
        }
    }

    /// Reason of a pending cancellation request, if any.
    pub fn cancel_reason(&self) -> Option<CancelReason> {
        self.cancellation.as_ref().map(|c| c.reason)
    }

    fn finish(&mut self, at_ms: u64, snapshots: Vec<SnapshotRecord>) {
        self.finished_at_ms = Some(at_ms);
        self.snapshots = snapshots;
    }

    fn note_unhonored_cancellation(&mut self) {
        if let Some(cancellation) = self.cancellation.as_mut() {
            cancellation.failure = Some(JobError::new(
                FailureKind::CancellationFailure,
                "action could not be interrupted safely and ran to completion",
            ));
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
