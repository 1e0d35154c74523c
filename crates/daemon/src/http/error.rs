// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mapping of engine and collaborator errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rst_adapters::{CatalogError, DeviceError};
use rst_engine::EngineError;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("device enumeration failed: {0}")]
    Devices(#[from] DeviceError),

    #[error("catalog unavailable: {0}")]
    Catalog(#[from] CatalogError),

    /// Body was not a JSON object
    #[error("invalid request body: {0}")]
    Body(String),

    #[error("missing query parameter: {0}")]
    MissingParam(&'static str),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Engine(e) => match e {
                EngineError::Validation(_) => StatusCode::BAD_REQUEST,
                EngineError::Conflict { .. } | EngineError::AlreadyFinished(_) => {
                    StatusCode::CONFLICT
                }
                EngineError::NotFound(_) | EngineError::NoSnapshot(_) => StatusCode::NOT_FOUND,
                EngineError::NothingToRollback => StatusCode::UNPROCESSABLE_ENTITY,
                EngineError::Unsupported(_) => StatusCode::NOT_IMPLEMENTED,
                EngineError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
                EngineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Devices(_) | Self::Catalog(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Body(_) | Self::MissingParam(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn body(&self) -> Value {
        match self {
            Self::Engine(EngineError::Validation(v)) => {
                json!({ "error": v.to_string(), "field": v.field })
            }
            Self::Engine(EngineError::Conflict { resource, held_by }) => json!({
                "error": self.to_string(),
                "resource": resource,
                "held_by": held_by,
            }),
            Self::Body(_) => json!({ "error": self.to_string(), "field": Value::Null }),
            Self::MissingParam(name) => json!({ "error": self.to_string(), "field": name }),
            _ => json!({ "error": self.to_string() }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
