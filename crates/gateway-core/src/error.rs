//! Error taxonomy and the error normalizer.
//!
//! Every core operation fails with a [`GatewayError`]. The boundary turns it into an
//! HTTP status and an [`ErrorEnvelope`] with [`GatewayError::normalize`]; the stream
//! relay uses the same envelope for in-band error frames.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Result type alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Value of the `type` field in every error envelope
pub const API_ERROR_TYPE: &str = "api_error";

/// Coarse classification of gateway failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unknown model identifier
    RouteNotFound,
    /// Malformed client payload
    BadRequest,
    /// Upstream answered with a non-2xx status or an undecodable body
    UpstreamError,
    /// Connection failure, timeout or mid-stream disconnect
    TransportError,
}

impl ErrorKind {
    /// Stable label used in logs and metrics
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RouteNotFound => "route_not_found",
            Self::BadRequest => "bad_request",
            Self::UpstreamError => "upstream_error",
            Self::TransportError => "transport_error",
        }
    }

    /// HTTP status the kind maps to on the non-streaming path
    #[must_use]
    pub fn status_code(self) -> u16 {
        match self {
            Self::RouteNotFound => 404,
            Self::BadRequest => 400,
            Self::UpstreamError | Self::TransportError => 500,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gateway error
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The requested model has no route
    #[error("Model '{model}' not found. Available: {available:?}")]
    RouteNotFound {
        /// Requested model identifier
        model: String,
        /// Model identifiers known at lookup time
        available: Vec<String>,
    },

    /// The client payload is malformed
    #[error("{message}")]
    BadRequest {
        /// Error message
        message: String,
    },

    /// The upstream rejected the call or replied with an unusable body
    #[error("{message}")]
    Upstream {
        /// Upstream HTTP status, when one was received
        status: Option<u16>,
        /// Error message
        message: String,
        /// Upstream response body, verbatim
        body: Option<String>,
    },

    /// The upstream could not be reached or the connection failed
    #[error("{message}")]
    Transport {
        /// Error message
        message: String,
    },
}

impl GatewayError {
    /// Create a route-miss error
    pub fn route_not_found(model: impl Into<String>, available: Vec<String>) -> Self {
        Self::RouteNotFound {
            model: model.into(),
            available,
        }
    }

    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Create an error for a non-2xx upstream reply, keeping the body verbatim
    pub fn upstream_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        Self::Upstream {
            status: Some(status),
            message: format!("Upstream returned status {status}: {body}"),
            body: Some(body),
        }
    }

    /// Create an error for an upstream 2xx reply that does not decode
    pub fn upstream_decode(reason: impl std::fmt::Display) -> Self {
        Self::Upstream {
            status: None,
            message: format!("Invalid upstream response: {reason}"),
            body: None,
        }
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Classify the error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RouteNotFound { .. } => ErrorKind::RouteNotFound,
            Self::BadRequest { .. } => ErrorKind::BadRequest,
            Self::Upstream { .. } => ErrorKind::UpstreamError,
            Self::Transport { .. } => ErrorKind::TransportError,
        }
    }

    /// HTTP status for the non-streaming path
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Structured detail carried into the envelope
    #[must_use]
    pub fn detail(&self) -> ErrorDetail {
        match self {
            Self::RouteNotFound { model, .. } => {
                let mut fields = Map::new();
                fields.insert("message".into(), Value::String(self.to_string()));
                fields.insert("param".into(), Value::String("model".into()));
                fields.insert("code".into(), Value::String("model_not_found".into()));
                fields.insert("model".into(), Value::String(model.clone()));
                ErrorDetail::Fields(fields)
            }
            Self::Upstream { body, .. } => {
                let mut fields = Map::new();
                fields.insert("message".into(), Value::String(self.to_string()));
                let nested = body
                    .as_deref()
                    .and_then(|b| serde_json::from_str::<Value>(b).ok())
                    .filter(Value::is_object);
                if let Some(nested) = nested {
                    fields.insert("upstream".into(), nested);
                }
                ErrorDetail::Fields(fields)
            }
            Self::BadRequest { message } | Self::Transport { message } => {
                ErrorDetail::Text(message.clone())
            }
        }
    }

    /// Map the error to its HTTP status and wire envelope
    #[must_use]
    pub fn normalize(&self) -> (u16, ErrorEnvelope) {
        (
            self.status_code(),
            ErrorEnvelope::from_detail(self.detail(), &self.to_string()),
        )
    }
}

/// Detail attached to an error before it is enveloped.
///
/// Text becomes the message, fields are merged one by one, anything else is
/// stringified.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorDetail {
    /// Plain message
    Text(String),
    /// Structured fields merged into the envelope
    Fields(Map<String, Value>),
    /// Any other value
    Other(Value),
}

impl From<Value> for ErrorDetail {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Self::Text(s),
            Value::Object(map) => Self::Fields(map),
            other => Self::Other(other),
        }
    }
}

impl From<String> for ErrorDetail {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for ErrorDetail {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// `{"error": {"message": ..., "type": "api_error", ...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Error body
    pub error: Map<String, Value>,
}

impl ErrorEnvelope {
    /// Build an envelope from a detail. `fallback_message` fills in `message` when a
    /// structured detail has none.
    #[must_use]
    pub fn from_detail(detail: ErrorDetail, fallback_message: &str) -> Self {
        let mut error = match detail {
            ErrorDetail::Text(message) => {
                let mut map = Map::new();
                map.insert("message".into(), Value::String(message));
                map
            }
            ErrorDetail::Fields(mut map) => {
                if !map.contains_key("message") {
                    map.insert("message".into(), Value::String(fallback_message.to_string()));
                }
                map
            }
            ErrorDetail::Other(value) => {
                let mut map = Map::new();
                map.insert("message".into(), Value::String(value.to_string()));
                map
            }
        };
        error.insert("type".into(), Value::String(API_ERROR_TYPE.to_string()));
        Self { error }
    }

    /// Envelope with a plain message
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::from_detail(ErrorDetail::Text(message.into()), "")
    }

    /// The `message` field
    #[must_use]
    pub fn text(&self) -> &str {
        self.error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_mapping() {
        assert_eq!(GatewayError::route_not_found("x", vec![]).status_code(), 404);
        assert_eq!(GatewayError::bad_request("bad").status_code(), 400);
        assert_eq!(GatewayError::upstream_status(503, "busy").status_code(), 500);
        assert_eq!(GatewayError::upstream_decode("eof").status_code(), 500);
        assert_eq!(GatewayError::transport("refused").status_code(), 500);
    }

    #[test]
    fn test_route_not_found_lists_models() {
        let err = GatewayError::route_not_found(
            "unknown",
            vec!["expert".to_string(), "fast".to_string()],
        );
        let (status, envelope) = err.normalize();

        assert_eq!(status, 404);
        assert!(envelope.text().contains("unknown"));
        assert!(envelope.text().contains("expert"));
        assert!(envelope.text().contains("fast"));
        assert_eq!(envelope.error["type"], "api_error");
        assert_eq!(envelope.error["code"], "model_not_found");
    }

    #[test]
    fn test_upstream_status_only_in_message() {
        let err = GatewayError::upstream_status(429, "slow down");
        let (status, envelope) = err.normalize();

        assert_eq!(status, 500);
        assert!(envelope.text().contains("429"));
        assert!(envelope.text().contains("slow down"));
        assert!(envelope.error.get("upstream").is_none());
    }

    #[test]
    fn test_upstream_json_body_is_nested() {
        let body = json!({"error": {"message": "model overloaded"}}).to_string();
        let (_, envelope) = GatewayError::upstream_status(503, body).normalize();

        assert_eq!(
            envelope.error["upstream"]["error"]["message"],
            "model overloaded"
        );
    }

    #[test]
    fn test_detail_shapes() {
        let text = ErrorEnvelope::from_detail(ErrorDetail::from("plain"), "fallback");
        assert_eq!(text.text(), "plain");

        let fields = ErrorEnvelope::from_detail(
            ErrorDetail::from(json!({"message": "structured", "code": 7, "type": "other"})),
            "fallback",
        );
        assert_eq!(fields.text(), "structured");
        assert_eq!(fields.error["code"], 7);
        assert_eq!(fields.error["type"], "api_error");

        let no_message =
            ErrorEnvelope::from_detail(ErrorDetail::from(json!({"code": 7})), "fallback");
        assert_eq!(no_message.text(), "fallback");

        let other = ErrorEnvelope::from_detail(ErrorDetail::from(json!([1, 2])), "fallback");
        assert_eq!(other.text(), "[1,2]");
    }

    #[test]
    fn test_envelope_wire_shape() {
        let envelope = ErrorEnvelope::message("boom");
        let json = serde_json::to_value(&envelope).expect("serialize");
        assert_eq!(json, json!({"error": {"message": "boom", "type": "api_error"}}));
    }
}
