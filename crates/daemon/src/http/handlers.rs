// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum::body::Bytes;
use axum::extract::{Path, Query as QueryParams, State};
use axum::http::StatusCode;
use axum::Json;
use rst_adapters::{Device, Distro};
use rst_core::{CancelReason, Job, JobId, JobKind, SnapshotRecord};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::info;

use super::{ApiError, AppState};
use crate::env::VERSION;

type Accepted = (StatusCode, Json<Value>);

/// Empty bodies count as `{}`; anything else must be a JSON object.
fn parse_body(bytes: &[u8]) -> Result<Map<String, Value>, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::Body("expected a JSON object".to_string())),
        Err(e) => Err(ApiError::Body(e.to_string())),
    }
}

pub async fn submit_job(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    body: Bytes,
) -> Result<Accepted, ApiError> {
    let kind: JobKind = kind.parse().map_err(rst_engine::EngineError::from)?;
    let body = parse_body(&body)?;
    let job_id = state.dispatcher.submit(kind, &body)?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "job_id": job_id }))))
}

pub async fn list_jobs(State(state): State<AppState>) -> Json<Vec<Job>> {
    Json(state.query.jobs())
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    Ok(Json(state.query.job(&JobId::new(id))?))
}

pub async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Accepted, ApiError> {
    let id = JobId::new(id);
    let outcome = state.dispatcher.cancel(&id, CancelReason::User)?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "job_id": id, "outcome": outcome }))))
}

pub async fn rollback(State(state): State<AppState>) -> Result<Accepted, ApiError> {
    let job_id = state.dispatcher.rollback()?;
    info!(%job_id, "rollback accepted");
    Ok((StatusCode::ACCEPTED, Json(json!({ "job_id": job_id }))))
}

/// What a rollback would undo right now.
pub async fn last_action(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "last_action": state.query.last_action() }))
}

pub async fn locks(State(state): State<AppState>) -> Json<Value> {
    let held: Vec<Value> = state
        .query
        .locks()
        .into_iter()
        .map(|(resource, job_id)| json!({ "resource": resource, "job_id": job_id }))
        .collect();
    Json(Value::Array(held))
}

#[derive(Debug, Deserialize)]
pub struct SnapshotParams {
    resource: Option<String>,
}

impl SnapshotParams {
    fn resource(&self) -> Result<&str, ApiError> {
        self.resource.as_deref().filter(|r| !r.is_empty()).ok_or(ApiError::MissingParam("resource"))
    }
}

/// Retained snapshots of a device or path, oldest first.
pub async fn snapshots(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<SnapshotParams>,
) -> Result<Json<Vec<SnapshotRecord>>, ApiError> {
    Ok(Json(state.query.snapshots(params.resource()?)))
}

pub async fn latest_snapshot(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<SnapshotParams>,
) -> Result<Json<SnapshotRecord>, ApiError> {
    Ok(Json(state.query.latest_snapshot(params.resource()?)?))
}

pub async fn devices(State(state): State<AppState>) -> Result<Json<Vec<Device>>, ApiError> {
    Ok(Json(state.query.devices()?))
}

pub async fn distros(State(state): State<AppState>) -> Result<Json<Vec<Distro>>, ApiError> {
    Ok(Json(state.query.catalog()?))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let status = if state.dispatcher.is_accepting() { "ok" } else { "draining" };
    Json(json!({
        "status": status,
        "version": VERSION,
        "workers": state.dispatcher.workers(),
    }))
}
