// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::store::StoreError;
use rst_core::{JobId, JobKind, ResourceId, ValidationError};
use thiserror::Error;

/// Errors surfaced synchronously to callers of the engine.
///
/// Failures that happen while a job runs are never returned here; they are
/// recorded on the terminal job and read back through status queries.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{resource} is held by {held_by}")]
    Conflict { resource: ResourceId, held_by: JobId },
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("no snapshot recorded for {0}")]
    NoSnapshot(ResourceId),
    #[error("nothing to roll back")]
    NothingToRollback,
    #[error("job {0} has already finished")]
    AlreadyFinished(JobId),
    #[error("no action registered for {0}")]
    Unsupported(JobKind),
    #[error("not accepting jobs: shutting down")]
    ShuttingDown,
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => EngineError::NotFound(id),
            other => EngineError::Internal(other.to_string()),
        }
    }
}
