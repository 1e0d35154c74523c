// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rst-core: data model shared by the Remote System Toolkit crates

pub mod macros;

pub mod clock;
pub mod id;
pub mod job;
pub mod outcome;
pub mod params;
pub mod resource;
pub mod snapshot;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use id::{IdGen, NanoIdGen, SequentialIdGen};
pub use job::{
    CancelOutcome, CancelReason, Cancellation, Job, JobId, JobResult, JobState, Transition,
    TransitionError,
};
pub use outcome::{ActionError, ActionErrorKind, ActionOutput, FailureKind, JobError};
pub use params::{JobKind, JobParams, ValidationError};
pub use resource::{dedup_targets, ResourceId};
pub use snapshot::SnapshotRecord;
