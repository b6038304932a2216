use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use models::errors::ModelError;
use service::errors::ServiceError;

/// Uniform response body for every stock operation, success or failure.
/// A zero `id` and an absent `data` are left out of the JSON.
#[derive(Debug, Serialize, PartialEq)]
pub struct Envelope<T = ()> {
    #[serde(skip_serializing_if = "is_zero")]
    pub id: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

fn is_zero(id: &i64) -> bool {
    *id == 0
}

impl Envelope {
    pub fn new(id: i64, message: impl Into<String>) -> Self {
        Self { id, message: message.into(), data: None }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(0, message)
    }
}

impl<T> Envelope<T> {
    pub fn with_data(id: i64, message: impl Into<String>, data: T) -> Self {
        Self { id, message: message.into(), data: Some(data) }
    }
}

/// Failures a stock handler can hit. Each renders as `{"message": ...}` with
/// status 200; `message` is the only failure signal on the wire.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("decode error")]
    Decode(#[source] ModelError),
    #[error("id parse error")]
    PathParam(String),
    #[error("Stock not found")]
    NotFound,
    #[error("storage error")]
    Storage(#[source] ServiceError),
    #[error("storage timeout")]
    Timeout,
}

impl From<ServiceError> for HandlerError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::NotFound(_) => HandlerError::NotFound,
            ServiceError::Timeout(_) => HandlerError::Timeout,
            other => HandlerError::Storage(other),
        }
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        match &self {
            HandlerError::Decode(e) => warn!(event = "decode_failed", error = %e, "request body rejected"),
            HandlerError::PathParam(raw) => warn!(event = "id_parse_failed", raw = %raw, "path id is not an integer"),
            HandlerError::NotFound => warn!(event = "stock_not_found", "no stock with that id"),
            HandlerError::Storage(e) => error!(event = "storage_failed", error = %e, "storage call failed"),
            HandlerError::Timeout => error!(event = "storage_timeout", "storage call timed out"),
        }
        (StatusCode::OK, Json(Envelope::failure(self.to_string()))).into_response()
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("database unavailable: {0}")]
    Database(String),
}
