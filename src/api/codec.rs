//! Strict decoding of `{"a": <number>, "b": <number>}` request bodies.
//!
//! Operands are parsed in two steps: the raw JSON number token is converted
//! to `f64` first (overflow becomes an infinity rather than an error), then
//! the finiteness check runs. That way `1e309` is reported as non-finite
//! input instead of malformed JSON.

use axum::http::{header, HeaderMap};
use serde::Deserialize;
use serde_json::value::RawValue;

use super::problem::ApiError;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CalcRequest {
    a: Box<RawValue>,
    b: Box<RawValue>,
}

/// Reject anything whose `Content-Type` is not `application/json`.
pub(crate) fn require_json(headers: &HeaderMap) -> Result<(), ApiError> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.trim().to_ascii_lowercase().starts_with("application/json"))
        .unwrap_or(false);

    if is_json {
        Ok(())
    } else {
        Err(ApiError::InvalidJson(
            "Content-Type must be application/json".to_string(),
        ))
    }
}

/// Decode and validate the two operands of a binary operation.
pub(crate) fn decode_operands(headers: &HeaderMap, body: &[u8]) -> Result<(f64, f64), ApiError> {
    require_json(headers)?;

    // serde_json also rejects trailing data after the object.
    let req: CalcRequest =
        serde_json::from_slice(body).map_err(|e| ApiError::InvalidJson(e.to_string()))?;

    let (a, b) = match (parse_json_number(&req.a), parse_json_number(&req.b)) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            return Err(ApiError::InvalidJson(
                "a and b must be numbers".to_string(),
            ))
        }
    };

    if !a.is_finite() || !b.is_finite() {
        return Err(ApiError::InvalidInput(
            "inputs must be finite numbers".to_string(),
        ));
    }
    Ok((a, b))
}

/// Parse a raw JSON value as a number. Out-of-range magnitudes yield
/// `±inf`; strings, booleans, null, arrays and objects yield `None`.
pub(crate) fn parse_json_number(raw: &RawValue) -> Option<f64> {
    let text = raw.get().trim();
    if !text.starts_with(|c: char| c == '-' || c.is_ascii_digit()) {
        return None;
    }
    text.parse::<f64>().ok()
}

/// Parse a query-string operand. Blank, unparsable or non-finite values are
/// all rejected.
pub(crate) fn parse_query_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
