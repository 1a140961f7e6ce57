//! Maps `CounterError` onto the HTTP status/JSON body contract from
//! spec §7: the status is derived from `CoreErrorKind::http_status()` so
//! this layer never re-decides what a `degraded` or `unavailable` kind
//! means, it only renders it.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use counter_core::CounterError;
use serde::Serialize;
use systems_common::HasKind;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    kind: String,
}

/// Wraps a `CounterError` so it can be returned directly from an axum
/// handler. The JSON body is built before the status is chosen so a
/// serialization failure never produces a `200` with an unreadable body
/// (spec §7).
pub struct ApiError(pub CounterError);

impl From<CounterError> for ApiError {
    fn from(e: CounterError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let body = ErrorBody {
            error: self.0.to_string(),
            kind: kind.to_string(),
        };
        let status = StatusCode::from_u16(kind.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(body)).into_response()
    }
}
