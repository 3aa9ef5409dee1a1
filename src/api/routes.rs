//! API route definitions.

use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::codec;
use super::problem::ApiError;
use super::state::AppState;
use crate::calc::Operation;
use crate::history::HistoryEntry;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/history", get(get_history).delete(clear_history))
        .route("/calculate", get(calculate_query))
        .route("/add", post(add))
        .route("/subtract", post(subtract))
        .route("/multiply", post(multiply))
        .route("/divide", post(divide))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CalcResponse {
    pub result: f64,
}

pub(super) async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Query-string pairs in arrival order. Repeated keys are kept, and lookups
/// return the first occurrence.
type QueryPairs = Vec<(String, String)>;

fn query_pairs(query: Result<Query<QueryPairs>, QueryRejection>) -> Result<QueryPairs, ApiError> {
    query
        .map(|Query(pairs)| pairs)
        .map_err(|e| ApiError::InvalidInput(e.body_text()))
}

fn first<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// `limit` missing, unparsable, zero or negative means "everything retained".
fn history_limit(raw: Option<&str>) -> usize {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(0)
}

async fn get_history(
    State(state): State<AppState>,
    query: Result<Query<QueryPairs>, QueryRejection>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let pairs = query_pairs(query)?;
    let limit = history_limit(first(&pairs, "limit"));
    let items = state.service.history(limit);
    debug!(limit, returned = items.len(), "history requested");
    Ok(Json(items))
}

async fn clear_history(State(state): State<AppState>) -> Json<Value> {
    state.service.clear_history();
    Json(json!({ "status": "cleaned" }))
}

fn binary_op(
    state: &AppState,
    op: Operation,
    headers: &HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<CalcResponse>, ApiError> {
    let body = body.map_err(|e| ApiError::InvalidJson(e.body_text()))?;
    let (a, b) = codec::decode_operands(headers, &body)?;
    let result = state.service.calculate(op, a, b)?;
    Ok(Json(CalcResponse { result }))
}

async fn add(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<CalcResponse>, ApiError> {
    binary_op(&state, Operation::Add, &headers, body)
}

async fn subtract(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<CalcResponse>, ApiError> {
    binary_op(&state, Operation::Subtract, &headers, body)
}

async fn multiply(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<CalcResponse>, ApiError> {
    binary_op(&state, Operation::Multiply, &headers, body)
}

async fn divide(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<CalcResponse>, ApiError> {
    binary_op(&state, Operation::Divide, &headers, body)
}

async fn calculate_query(
    State(state): State<AppState>,
    query: Result<Query<QueryPairs>, QueryRejection>,
) -> Result<Json<CalcResponse>, ApiError> {
    let pairs = query_pairs(query)?;
    let present = |key| first(&pairs, key).filter(|v| !v.is_empty());
    let (Some(op), Some(a), Some(b)) = (present("op"), present("a"), present("b")) else {
        return Err(ApiError::MissingParams);
    };

    let (a, b) = match (codec::parse_query_number(a), codec::parse_query_number(b)) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            return Err(ApiError::InvalidInput(
                "a and b must be valid finite numbers".to_string(),
            ))
        }
    };

    let op: Operation = op.parse()?;
    let result = state.service.calculate(op, a, b)?;
    Ok(Json(CalcResponse { result }))
}
