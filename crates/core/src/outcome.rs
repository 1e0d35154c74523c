// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Action results and the failures recorded on terminal jobs.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Structured result of a successful action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutput {
    /// Exit status of the underlying executable, if any
    pub exit_code: Option<i32>,
    /// Machine-readable detail reported by the action
    #[serde(default)]
    pub detail: Value,
}

impl ActionOutput {
    pub fn new(exit_code: Option<i32>, detail: Value) -> Self {
        Self { exit_code, detail }
    }
}

/// Classification an action attaches to its error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionErrorKind {
    InvalidInput,
    ExecutionFailure,
    Cancelled,
    Timeout,
}

crate::simple_display! {
    ActionErrorKind {
        InvalidInput => "invalid input",
        ExecutionFailure => "execution failure",
        Cancelled => "cancelled",
        Timeout => "timeout",
    }
}

/// Error returned by an action's `execute`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ActionError {
    pub kind: ActionErrorKind,
    pub message: String,
}

impl ActionError {
    pub fn new(kind: ActionErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ActionErrorKind::InvalidInput, message)
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(ActionErrorKind::ExecutionFailure, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ActionErrorKind::Cancelled, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ActionErrorKind::Timeout, message)
    }
}

/// Failure classes recorded on a terminal job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Pre-action snapshot could not be captured; the action never ran
    SnapshotFailure,
    ExecutionFailure,
    InvalidInput,
    Timeout,
    Cancelled,
    /// Cancellation was requested but the action ran to completion
    CancellationFailure,
}

crate::simple_display! {
    FailureKind {
        SnapshotFailure => "snapshot_failure",
        ExecutionFailure => "execution_failure",
        InvalidInput => "invalid_input",
        Timeout => "timeout",
        Cancelled => "cancelled",
        CancellationFailure => "cancellation_failure",
    }
}

impl From<ActionErrorKind> for FailureKind {
    fn from(kind: ActionErrorKind) -> Self {
        match kind {
            ActionErrorKind::InvalidInput => FailureKind::InvalidInput,
            ActionErrorKind::ExecutionFailure => FailureKind::ExecutionFailure,
            ActionErrorKind::Cancelled => FailureKind::Cancelled,
            ActionErrorKind::Timeout => FailureKind::Timeout,
        }
    }
}

/// Error detail carried by every non-succeeded terminal job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobError {
    pub kind: FailureKind,
    pub message: String,
}

impl JobError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

impl From<ActionError> for JobError {
    fn from(err: ActionError) -> Self {
        Self { kind: err.kind.into(), message: err.message }
    }
}
