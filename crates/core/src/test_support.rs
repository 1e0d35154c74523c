// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{ActionOutput, Job, JobId, JobParams, ResourceId};

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for the job state machine.
pub mod strategies {
    use crate::job::{CancelReason, Transition};
    use crate::outcome::{ActionOutput, FailureKind, JobError};
    use proptest::prelude::*;

    pub fn arb_cancel_reason() -> impl Strategy<Value = CancelReason> {
        prop_oneof![
            Just(CancelReason::User),
            Just(CancelReason::Timeout),
            Just(CancelReason::Shutdown),
        ]
    }

    pub fn arb_transition() -> impl Strategy<Value = Transition> {
        let at = 1_000u64..2_000_000u64;
        prop_oneof![
            at.clone().prop_map(|at_ms| Transition::Start { at_ms }),
            at.clone().prop_map(|at_ms| Transition::Succeed {
                at_ms,
                output: ActionOutput::new(Some(0), serde_json::Value::Null),
                snapshots: Vec::new(),
            }),
            at.clone().prop_map(|at_ms| Transition::Fail {
                at_ms,
                error: JobError::new(FailureKind::ExecutionFailure, "boom"),
                snapshots: Vec::new(),
            }),
            at.prop_map(|at_ms| Transition::Cancel {
                at_ms,
                error: JobError::new(FailureKind::Cancelled, "stop"),
                snapshots: Vec::new(),
            }),
        ]
    }
}

// ── Fixtures ────────────────────────────────────────────────────────────

pub fn install_params(device: &str) -> JobParams {
    JobParams::Install { image_url: "iso://test".to_string(), device: device.to_string() }
}

/// Pending install job targeting `device`, created at t=1_000_000.
pub fn pending_install(id: &str, device: &str) -> Job {
    Job::new(JobId::new(id), install_params(device), vec![ResourceId::for_device(device)], 1_000_000)
}

pub fn ok_output() -> ActionOutput {
    ActionOutput::new(Some(0), serde_json::json!({"ok": true}))
}
