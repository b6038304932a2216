//! Stock operation handlers.
//!
//! Every handler is a stateless pipeline: decode the request, call the
//! gateway, wrap the outcome in an [`Envelope`]. Failures never change the
//! HTTP status; see [`HandlerError`].

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use configs::IdPolicy;
use models::errors::ModelError;
use models::stock::{self, StockEntry};
use service::stock::{FetchOutcome, StockGateway};
use tracing::info;

use crate::errors::{Envelope, HandlerError};

pub const MSG_CREATED: &str = "Stock created successfully";
pub const MSG_LISTED: &str = "Stocks fetched successfully";
pub const MSG_FETCHED: &str = "Stock fetched successfully";
pub const MSG_UPDATED: &str = "Stock updated successfully";
pub const MSG_DELETED: &str = "Stock deleted successfully";

#[derive(Clone)]
pub struct ServerState {
    pub gateway: Arc<dyn StockGateway>,
    pub id_policy: IdPolicy,
}

impl ServerState {
    pub fn new(gateway: Arc<dyn StockGateway>, id_policy: IdPolicy) -> Self {
        Self { gateway, id_policy }
    }
}

fn parse_id(raw: &str) -> Result<i64, HandlerError> {
    raw.parse::<i64>().map_err(|_| HandlerError::PathParam(raw.to_string()))
}

/// Any path rejection (e.g. a segment that is not UTF-8) is an id parse failure.
fn path_id(path: Result<Path<String>, PathRejection>) -> Result<i64, HandlerError> {
    match path {
        Ok(Path(raw)) => parse_id(&raw),
        Err(rejection) => Err(HandlerError::PathParam(rejection.body_text())),
    }
}

/// A body that cannot be buffered (too large, aborted) is a decode failure.
fn body_bytes(body: Result<Bytes, BytesRejection>) -> Result<Bytes, HandlerError> {
    body.map_err(|rejection| HandlerError::Decode(ModelError::Decode(rejection.body_text())))
}

async fn fetch_existing(state: &ServerState, id: i64) -> Result<StockEntry, HandlerError> {
    match state.gateway.fetch_by_id(id).await? {
        FetchOutcome::Found(entry) => Ok(entry),
        FetchOutcome::NotFound => Err(HandlerError::NotFound),
    }
}

/// 创建股票记录
#[utoipa::path(
    post, path = "/api/v1/stocks", tag = "stocks",
    request_body = crate::openapi::StockEntryDoc,
    responses((status = 200, description = "Envelope with the new id or a failure message", body = crate::openapi::EnvelopeDoc))
)]
pub async fn create_stock(
    State(state): State<ServerState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Envelope>, HandlerError> {
    let body = body_bytes(body)?;
    let mut entry = StockEntry::decode(&body).map_err(HandlerError::Decode)?;
    entry.stamp_created(stock::now());

    let assigned = state.gateway.insert(&entry).await?;
    let id = match state.id_policy {
        IdPolicy::Storage => assigned,
        IdPolicy::Echo => entry.id,
    };
    info!(event = "stock_created", stock_id = id, assigned, name = %entry.name, "stock created");
    Ok(Json(Envelope::new(id, MSG_CREATED)))
}

/// 列出全部股票记录；空表返回空列表
#[utoipa::path(
    get, path = "/api/v1/stocks", tag = "stocks",
    responses((status = 200, description = "Envelope carrying every stock", body = crate::openapi::EnvelopeDoc))
)]
pub async fn list_stocks(
    State(state): State<ServerState>,
) -> Result<Json<Envelope<Vec<StockEntry>>>, HandlerError> {
    let stocks = state.gateway.fetch_all().await?;
    let first_id = stocks.first().map(|s| s.id).unwrap_or_default();
    info!(event = "stocks_listed", count = stocks.len(), "stocks fetched");
    Ok(Json(Envelope::with_data(first_id, MSG_LISTED, stocks)))
}

#[utoipa::path(
    get, path = "/api/v1/stocks/{id}", tag = "stocks",
    params(("id" = String, Path, description = "Stock id")),
    responses((status = 200, description = "Envelope carrying the stock", body = crate::openapi::EnvelopeDoc))
)]
pub async fn get_stock(
    State(state): State<ServerState>,
    raw_id: Result<Path<String>, PathRejection>,
) -> Result<Json<Envelope<StockEntry>>, HandlerError> {
    let id = path_id(raw_id)?;
    let entry = fetch_existing(&state, id).await?;
    info!(event = "stock_fetched", stock_id = entry.id, "stock fetched");
    Ok(Json(Envelope::with_data(entry.id, MSG_FETCHED, entry)))
}

/// Partial update: fields missing from the body keep their stored values.
#[utoipa::path(
    put, path = "/api/v1/stocks/{id}", tag = "stocks",
    params(("id" = String, Path, description = "Stock id")),
    request_body = crate::openapi::StockEntryDoc,
    responses((status = 200, description = "Envelope carrying the updated stock", body = crate::openapi::EnvelopeDoc))
)]
pub async fn update_stock(
    State(state): State<ServerState>,
    raw_id: Result<Path<String>, PathRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Envelope<StockEntry>>, HandlerError> {
    let id = path_id(raw_id)?;
    let body = body_bytes(body)?;
    let patch = StockEntry::decode_patch(&body).map_err(HandlerError::Decode)?;
    let current = fetch_existing(&state, id).await?;
    let next = current.apply_patch(&patch, stock::now()).map_err(HandlerError::Decode)?;

    let updated = state.gateway.update(&next).await?;
    info!(event = "stock_updated", stock_id = updated, "stock updated");
    Ok(Json(Envelope::with_data(updated, MSG_UPDATED, next)))
}

#[utoipa::path(
    delete, path = "/api/v1/stocks/{id}", tag = "stocks",
    params(("id" = String, Path, description = "Stock id")),
    responses((status = 200, description = "Envelope with the deleted id", body = crate::openapi::EnvelopeDoc))
)]
pub async fn delete_stock(
    State(state): State<ServerState>,
    raw_id: Result<Path<String>, PathRejection>,
) -> Result<Json<Envelope>, HandlerError> {
    let id = path_id(raw_id)?;
    let current = fetch_existing(&state, id).await?;
    let deleted = state.gateway.delete(&current).await?;
    info!(event = "stock_deleted", stock_id = deleted, "stock deleted");
    Ok(Json(Envelope::new(deleted, MSG_DELETED)))
}

/// CORS 预检：仅匹配路由，不执行业务逻辑
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_accepts_integers_only() {
        assert_eq!(parse_id("42").unwrap(), 42);
        assert_eq!(parse_id("-3").unwrap(), -3);
        for bad in ["abc", "", "1.5", "9223372036854775808"] {
            assert!(matches!(parse_id(bad), Err(HandlerError::PathParam(_))), "{bad}");
        }
    }
}
