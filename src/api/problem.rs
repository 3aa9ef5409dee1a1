//! Error envelope returned by every failing endpoint.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::calc::{CalcError, UnknownOperation};

/// Minimal RFC 7807 problem document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub type_url: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
}

impl Problem {
    pub fn new(status: StatusCode, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            type_url: String::new(),
            title: title.into(),
            status: status.as_u16(),
            detail: detail.into(),
        }
    }
}

/// Failures surfaced by the HTTP layer.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidJson(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Calculation(#[from] CalcError),

    #[error("op, a, and b are required")]
    MissingParams,

    #[error("use add|subtract|multiply|divide")]
    InvalidOp,

    #[error("not found")]
    NotFound,
}

impl ApiError {
    /// Machine-readable problem title.
    pub fn title(&self) -> &'static str {
        match self {
            ApiError::InvalidJson(_) => "invalid_json",
            ApiError::InvalidInput(_) => "invalid_input",
            ApiError::Calculation(_) => "calculation_error",
            ApiError::MissingParams => "missing_params",
            ApiError::InvalidOp => "invalid_op",
            ApiError::NotFound => "not_found",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    pub fn to_problem(&self) -> Problem {
        Problem::new(self.status(), self.title(), self.to_string())
    }
}

impl From<UnknownOperation> for ApiError {
    fn from(_: UnknownOperation) -> Self {
        ApiError::InvalidOp
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let problem = self.to_problem();
        debug!(
            title = %problem.title,
            status = problem.status,
            detail = %problem.detail,
            "request rejected"
        );
        (self.status(), Json(problem)).into_response()
    }
}
