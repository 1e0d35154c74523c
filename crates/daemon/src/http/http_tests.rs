// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::{app_state, tweak, wait_terminal, Fakes};
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use rst_adapters::FakeAction;
use rst_core::{JobId, JobKind, JobState};
use serde_json::{json, Value};
use std::collections::HashMap;
use tower::ServiceExt;

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

fn serve(
    customise: impl FnOnce(&mut HashMap<JobKind, FakeAction>),
) -> (Router, AppState, Fakes) {
    let (state, fakes) = app_state(customise);
    (router(state.clone()), state, fakes)
}

#[tokio::test]
async fn submit_returns_accepted_with_job_id() {
    let (app, state, _) = serve(|_| {});
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/jobs/install",
        Some(json!({ "url": "https://example.org/u.iso", "device": "/dev/sdc" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let id = JobId::new(body["job_id"].as_str().unwrap());
    assert_eq!(wait_terminal(&state.dispatcher, &id).await.state, JobState::Succeeded);

    let (status, job) = call(&app, Method::GET, &format!("/api/v1/jobs/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job["state"], "succeeded");
    assert_eq!(job["kind"], "install");
}

#[tokio::test]
async fn kebab_case_kind_is_accepted() {
    let (app, _, _) = serve(|_| {});
    let (status, _) = call(
        &app,
        Method::POST,
        "/api/v1/jobs/filesystem-check",
        Some(json!({ "device": "/dev/sdb" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
}

#[tokio::test]
async fn missing_field_is_bad_request_naming_it() {
    let (app, _, _) = serve(|_| {});
    let (status, body) =
        call(&app, Method::POST, "/api/v1/jobs/filesystem_check", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "device");

    let (status, body) = call(&app, Method::POST, "/api/v1/jobs/filesystem_check", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "device");
}

#[tokio::test]
async fn unknown_kind_and_non_object_bodies_are_rejected() {
    let (app, _, _) = serve(|_| {});
    let (status, body) = call(&app, Method::POST, "/api/v1/jobs/format", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "kind");

    let (status, _) =
        call(&app, Method::POST, "/api/v1/jobs/install", Some(json!(["/dev/sda"]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn conflicting_submission_is_409_with_holder() {
    let (app, _, fakes) = serve(|a| tweak(a, JobKind::Install, FakeAction::gated));
    let install = json!({ "url": "iso://a", "device": "/dev/sdc" });
    let (_, first) = call(&app, Method::POST, "/api/v1/jobs/install", Some(install.clone())).await;
    fakes.action(JobKind::Install).wait_for_calls(1).await;

    let (status, body) = call(&app, Method::POST, "/api/v1/jobs/install", Some(install)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["held_by"], first["job_id"]);
    assert_eq!(body["resource"], "/dev/sdc");

    let (status, locks) = call(&app, Method::GET, "/api/v1/locks", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(locks, json!([{ "resource": "/dev/sdc", "job_id": first["job_id"] }]));
    fakes.action(JobKind::Install).release();
}

#[tokio::test]
async fn unknown_job_is_404() {
    let (app, _, _) = serve(|_| {});
    let (status, body) = call(&app, Method::GET, "/api/v1/jobs/job-missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("job-missing"));

    let (status, _) = call(&app, Method::POST, "/api/v1/jobs/job-missing/cancel", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancel_reports_outcome_and_finished_jobs_conflict() {
    let (app, state, fakes) =
        serve(|a| tweak(a, JobKind::Restore, |f| f.gated().honoring_cancel()));
    let (_, body) = call(
        &app,
        Method::POST,
        "/api/v1/jobs/restore",
        Some(json!({ "source": "/srv/images/sdc.img", "destination": "/dev/sdc" })),
    )
    .await;
    let id = body["job_id"].as_str().unwrap().to_string();
    fakes.action(JobKind::Restore).wait_for_calls(1).await;

    let (status, body) =
        call(&app, Method::POST, &format!("/api/v1/jobs/{id}/cancel"), None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body, json!({ "job_id": id, "outcome": "requested" }));

    wait_terminal(&state.dispatcher, &JobId::new(id.clone())).await;
    let (status, _) = call(&app, Method::POST, &format!("/api/v1/jobs/{id}/cancel"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn rollback_endpoints() {
    let (app, state, _) = serve(|_| {});
    let (status, _) = call(&app, Method::POST, "/api/v1/rollback", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (_, body) = call(&app, Method::GET, "/api/v1/rollback", None).await;
    assert_eq!(body, json!({ "last_action": null }));

    let (_, body) = call(
        &app,
        Method::POST,
        "/api/v1/jobs/backup_self",
        Some(json!({ "destination": "/dev/sdd" })),
    )
    .await;
    let backup = JobId::new(body["job_id"].as_str().unwrap());
    wait_terminal(&state.dispatcher, &backup).await;

    let (_, body) = call(&app, Method::GET, "/api/v1/rollback", None).await;
    assert_eq!(body["last_action"]["job_id"], backup.as_str());
    assert_eq!(body["last_action"]["kind"], "backup_self");

    let (status, body) = call(&app, Method::POST, "/api/v1/rollback", None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let rollback = JobId::new(body["job_id"].as_str().unwrap());
    assert_eq!(wait_terminal(&state.dispatcher, &rollback).await.kind, JobKind::Rollback);
}

#[tokio::test]
async fn snapshot_history_by_resource() {
    let (app, state, _) = serve(|_| {});
    let (status, body) = call(&app, Method::GET, "/api/v1/snapshots", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "resource");

    let (status, _) =
        call(&app, Method::GET, "/api/v1/snapshots/latest?resource=/dev/sdc", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = call(
        &app,
        Method::POST,
        "/api/v1/jobs/install",
        Some(json!({ "url": "https://example.org/u.iso", "device": "/dev/sdc" })),
    )
    .await;
    let id = JobId::new(body["job_id"].as_str().unwrap());
    wait_terminal(&state.dispatcher, &id).await;

    let (status, history) =
        call(&app, Method::GET, "/api/v1/snapshots?resource=/dev/sdc1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["resource"], "/dev/sdc");

    let (status, latest) =
        call(&app, Method::GET, "/api/v1/snapshots/latest?resource=/dev/sdc", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(latest, history[0]);
}

#[tokio::test]
async fn devices_and_distros_are_listed() {
    let (app, _, fakes) = serve(|_| {});
    let (status, devices) = call(&app, Method::GET, "/api/v1/devices", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(devices.as_array().unwrap().len(), 5);
    assert!(devices[0].get("is_removable").is_some());

    let (status, distros) = call(&app, Method::GET, "/api/v1/distros", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(distros.as_array().unwrap().iter().any(|d| d["name"] == "Ubuntu Server"));

    fakes.devices.break_enumeration();
    let (status, _) = call(&app, Method::GET, "/api/v1/devices", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn health_reports_draining_after_shutdown() {
    let (app, state, _) = serve(|_| {});
    let (status, body) = call(&app, Method::GET, "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["workers"], 2);

    state.dispatcher.shutdown(std::time::Duration::from_secs(1)).await;
    let (_, body) = call(&app, Method::GET, "/api/v1/health", None).await;
    assert_eq!(body["status"], "draining");
    let (status, _) = call(
        &app,
        Method::POST,
        "/api/v1/jobs/filesystem_check",
        Some(json!({ "device": "/dev/sdb" })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
