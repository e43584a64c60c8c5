//! API error type: the only place a gateway failure becomes a status and a body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gateway_core::{ErrorEnvelope, ErrorKind, GatewayError};
use tracing::{debug, error};

/// An error rendered as `{"error": {"message": ..., "type": "api_error", ...}}`
#[derive(Debug, Clone)]
pub struct ApiError {
    /// HTTP status
    pub status: StatusCode,
    /// Response body
    pub envelope: ErrorEnvelope,
    /// Originating kind, when the error came from the core taxonomy
    pub kind: Option<ErrorKind>,
}

impl ApiError {
    /// Create an error from a status and a message
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            envelope: ErrorEnvelope::message(message),
            kind: None,
        }
    }

    /// 400 for a malformed client payload
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        GatewayError::bad_request(message).into()
    }

    /// 404 for an unknown path
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// 500 for failures inside the front itself
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Message text of the envelope
    #[must_use]
    pub fn message(&self) -> &str {
        self.envelope.text()
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        let (status, envelope) = err.normalize();
        Self {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            envelope,
            kind: Some(err.kind()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = self.status.as_u16(), message = %self.message(), "Request failed");
        } else {
            debug!(status = self.status.as_u16(), message = %self.message(), "Request rejected");
        }

        (self.status, Json(self.envelope)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.message())
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_miss_maps_to_404() {
        let err: ApiError =
            GatewayError::route_not_found("unknown", vec!["expert".to_string()]).into();

        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.kind, Some(ErrorKind::RouteNotFound));
        assert!(err.message().contains("expert"));
        assert_eq!(err.envelope.error["type"], "api_error");
    }

    #[test]
    fn test_upstream_status_is_not_the_outer_status() {
        let err: ApiError = GatewayError::upstream_status(429, "slow down").into();

        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.message().contains("429"));
    }

    #[test]
    fn test_bad_request() {
        let err = ApiError::bad_request("Invalid JSON");
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.kind, Some(ErrorKind::BadRequest));
        assert_eq!(err.message(), "Invalid JSON");
    }

    #[test]
    fn test_front_errors_have_no_kind() {
        let err = ApiError::not_found("Not found: /nope");
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert!(err.kind.is_none());
        assert_eq!(err.to_string(), "404 Not Found: Not found: /nope");
    }
}
