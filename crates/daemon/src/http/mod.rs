// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON API over the engine.

mod error;
mod handlers;

pub use error::ApiError;

use axum::routing::{get, post};
use axum::Router;
use rst_core::SystemClock;
use rst_engine::{Dispatcher, Query};
use tower_http::trace::TraceLayer;

/// Handles shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher<SystemClock>,
    pub query: Query<SystemClock>,
}

/// Routes under `/api/v1`, with request tracing.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/jobs", get(handlers::list_jobs))
        // Same segment is a kind on POST and a job id on GET
        .route("/jobs/{id}", get(handlers::get_job).post(handlers::submit_job))
        .route("/jobs/{id}/cancel", post(handlers::cancel_job))
        .route("/rollback", get(handlers::last_action).post(handlers::rollback))
        .route("/locks", get(handlers::locks))
        .route("/snapshots", get(handlers::snapshots))
        .route("/snapshots/latest", get(handlers::latest_snapshot))
        .route("/devices", get(handlers::devices))
        .route("/distros", get(handlers::distros))
        .route("/health", get(handlers::health));

    Router::new().nest("/api/v1", api).layer(TraceLayer::new_for_http()).with_state(state)
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
