// Unified error response formatting.
// All error responses follow the upstream runtime's shape: {"detail": "<msg>"}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// The error kinds this gateway surfaces to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyErrorKind {
    /// Malformed inbound JSON body.
    BadRequest,
    /// Missing or non-numeric coordinates in a location report.
    InvalidLocation,
    /// Unknown (or already consumed/evicted) pending request id.
    NotFound,
    /// The agent runtime did not answer in time.
    UpstreamTimeout,
    /// The agent runtime failed or was unreachable.
    UpstreamError,
}

impl ProxyErrorKind {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest | Self::InvalidLocation => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            Self::UpstreamError => StatusCode::BAD_GATEWAY,
        }
    }
}

/// Build a `{"detail": message}` error response for the given kind.
pub fn error_response(kind: ProxyErrorKind, message: &str) -> Response {
    (kind.status(), Json(json!({ "detail": message }))).into_response()
}
