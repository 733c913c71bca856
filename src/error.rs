//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for ingestion, resolution and
//! storage. Each variant maps to a specific HTTP status code and structured
//! JSON error response. [`DeliveryError`] covers the best-effort queue and
//! chat channels and is never surfaced to HTTP callers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1001,
///     "message": "invalid request: missing numeroSerie"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges on [`GatewayError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                |
/// |-----------|-----------------|----------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request            |
/// | 2000–2999 | Not Found       | 500 (dispatch) / 404 (link) |
/// | 3000–3999 | Server          | 500 Internal Server Error  |
///
/// A device missing during alert dispatch and a device missing during chat
/// linking are kept as separate variants: the first aborts the alert, the
/// second is recoverable inside the registration conversation.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Inbound payload is malformed or misses a required field.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Alert references a serial with no registered device.
    #[error("device not found for alert: {0}")]
    DispatchDeviceNotFound(String),

    /// Chat tried to link a serial with no registered device.
    #[error("device not found: {0}")]
    LinkDeviceNotFound(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Dispatch did not finish within the configured deadline.
    #[error("dispatch timed out after {0} s")]
    DispatchTimeout(u64),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::DispatchDeviceNotFound(_) => 2001,
            Self::LinkDeviceNotFound(_) => 2002,
            Self::PersistenceError(_) => 3001,
            Self::DispatchTimeout(_) => 3002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::LinkDeviceNotFound(_) => StatusCode::NOT_FOUND,
            Self::DispatchDeviceNotFound(_)
            | Self::PersistenceError(_)
            | Self::DispatchTimeout(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for GatewayError {
    fn from(err: sqlx::Error) -> Self {
        Self::PersistenceError(err.to_string())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

/// Failure of a single best-effort delivery attempt (queue or chat).
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// HTTP request to the chat platform failed.
    ///
    /// Built without the request URL, since Bot API URLs carry the token.
    #[error("http request failed: {0}")]
    Http(#[source] reqwest::Error),

    /// Chat platform answered but refused the request.
    #[error("chat platform rejected request: {0}")]
    Rejected(String),

    /// Queue connection, publish or acknowledgement failed.
    #[error("queue error: {0}")]
    Queue(String),

    /// Payload could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let err = GatewayError::InvalidRequest("missing sensor".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), 1001);
    }

    #[test]
    fn not_found_kinds_stay_distinct() {
        let dispatch = GatewayError::DispatchDeviceNotFound("ABC".to_string());
        let link = GatewayError::LinkDeviceNotFound("ABC".to_string());
        assert_ne!(dispatch.error_code(), link.error_code());
        assert_eq!(dispatch.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(link.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn server_side_codes_are_distinct() {
        let storage = GatewayError::PersistenceError("down".to_string());
        let timeout = GatewayError::DispatchTimeout(30);
        assert_eq!(storage.error_code(), 3001);
        assert_eq!(timeout.error_code(), 3002);
        assert_eq!(timeout.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn into_response_sets_status() {
        let response = GatewayError::PersistenceError("down".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
