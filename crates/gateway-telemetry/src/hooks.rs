//! Instrumentation hooks.
//!
//! The core calls these at fixed points of every request. Implementations observe
//! only; nothing they do can change control flow or response content.

use gateway_core::ErrorKind;
use std::time::Duration;

/// How an upstream call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpstreamOutcome {
    /// 2xx with a usable body
    Success,
    /// Non-2xx or undecodable body
    UpstreamError,
    /// Connection failure or timeout
    TransportError,
}

impl UpstreamOutcome {
    /// Metric label
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::UpstreamError => "upstream_error",
            Self::TransportError => "transport_error",
        }
    }
}

impl From<ErrorKind> for UpstreamOutcome {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::TransportError => Self::TransportError,
            _ => Self::UpstreamError,
        }
    }
}

/// Observer of gateway activity. Every method defaults to a no-op.
pub trait Instrumentation: Send + Sync {
    /// An HTTP request reached a route
    fn request_received(&self, _route: &str) {}

    /// A model id resolved to a route
    fn route_resolved(&self, _model: &str, _stream: bool) {}

    /// An upstream call is about to be sent
    fn upstream_started(&self, _model: &str, _stream: bool) {}

    /// An upstream call ended; for streams this is when the relay finished
    fn upstream_finished(
        &self,
        _model: &str,
        _stream: bool,
        _outcome: UpstreamOutcome,
        _elapsed: Duration,
    ) {
    }

    /// A malformed upstream stream frame was dropped
    fn frame_dropped(&self, _model: &str) {}

    /// A complete non-streaming response body was produced
    fn response_recorded(&self, _model: &str, _bytes: usize) {}

    /// A request failed with the given kind
    fn error_raised(&self, _kind: ErrorKind) {}
}

/// Instrumentation that records nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInstrumentation;

impl Instrumentation for NoopInstrumentation {}
