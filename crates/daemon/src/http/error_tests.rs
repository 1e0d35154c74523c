// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rst_core::{JobId, JobKind, ResourceId, ValidationError};

fn engine(e: EngineError) -> ApiError {
    ApiError::Engine(e)
}

#[yare::parameterized(
    validation     = { engine(EngineError::Validation(ValidationError::new("device", "is required"))), 400 },
    conflict       = { engine(EngineError::Conflict { resource: ResourceId::for_device("/dev/sdc"), held_by: JobId::new("job-1") }), 409 },
    finished       = { engine(EngineError::AlreadyFinished(JobId::new("job-1"))), 409 },
    not_found      = { engine(EngineError::NotFound(JobId::new("job-9"))), 404 },
    nothing        = { engine(EngineError::NothingToRollback), 422 },
    unsupported    = { engine(EngineError::Unsupported(JobKind::Restore)), 501 },
    shutting_down  = { engine(EngineError::ShuttingDown), 503 },
    internal       = { engine(EngineError::Internal("boom".into())), 500 },
    no_snapshot    = { engine(EngineError::NoSnapshot(ResourceId::for_device("/dev/sdc"))), 404 },
    bad_body       = { ApiError::Body("expected object".into()), 400 },
    missing_param  = { ApiError::MissingParam("resource"), 400 },
)]
fn status_for_error(err: ApiError, expected: u16) {
    assert_eq!(err.status().as_u16(), expected);
}

#[test]
fn validation_body_names_the_field() {
    let err = engine(EngineError::Validation(ValidationError::new("device", "is required")));
    let body = err.body();
    assert_eq!(body["field"], "device");
    assert!(body["error"].as_str().unwrap().contains("device"));
}

#[test]
fn conflict_body_names_resource_and_holder() {
    let err = engine(EngineError::Conflict {
        resource: ResourceId::for_device("/dev/sdc"),
        held_by: JobId::new("job-1"),
    });
    let body = err.body();
    assert_eq!(body["resource"], "/dev/sdc");
    assert_eq!(body["held_by"], "job-1");
}

#[test]
fn other_errors_carry_only_a_message() {
    let body = engine(EngineError::NothingToRollback).body();
    assert_eq!(body, serde_json::json!({ "error": "nothing to roll back" }));
}
