//! Upstream HTTP client.

use crate::payload::UpstreamPayload;
use bytes::Bytes;
use gateway_core::{GatewayError, GatewayResult};
use reqwest::{header, Client, Response};
use std::time::Duration;
use tracing::debug;

/// Upstream call bounds. Exceeding either is a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Total duration of a non-streaming call
    pub request: Duration,
    /// Total duration of a streaming call, body included
    pub streaming: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            request: Duration::from_secs(60),
            streaming: Duration::from_secs(300),
        }
    }
}

/// HTTP client for upstream backends.
///
/// Idle connections are never kept, so every call owns its connection and drops it
/// with the response.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: Client,
    timeouts: Timeouts,
}

impl UpstreamClient {
    /// Create a client
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(timeouts: Timeouts) -> GatewayResult<Self> {
        let http = Client::builder()
            .pool_max_idle_per_host(0)
            .user_agent(concat!("llm-wrapper/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { http, timeouts })
    }

    /// Configured bounds
    #[must_use]
    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// POST a payload and return the response whatever its status
    ///
    /// # Errors
    /// Returns `Transport` if the request cannot be sent or times out
    pub async fn send(&self, url: &str, payload: &UpstreamPayload) -> GatewayResult<Response> {
        let timeout = if payload.stream {
            self.timeouts.streaming
        } else {
            self.timeouts.request
        };

        debug!(
            url = %url,
            model = %payload.model,
            stream = payload.stream,
            timeout_ms = timeout.as_millis() as u64,
            "Sending upstream request"
        );

        self.http
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .timeout(timeout)
            .json(payload)
            .send()
            .await
            .map_err(transport_error)
    }

    /// One blocking exchange: non-2xx is an `Upstream` error carrying the body verbatim
    ///
    /// # Errors
    /// Returns `Upstream` for a non-2xx status and `Transport` for connection failures
    pub async fn fetch(&self, url: &str, payload: &UpstreamPayload) -> GatewayResult<Bytes> {
        let response = self.send(url, payload).await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::upstream_status(status.as_u16(), body));
        }

        response.bytes().await.map_err(transport_error)
    }
}

/// Map a reqwest failure to a transport error
pub(crate) fn transport_error(e: reqwest::Error) -> GatewayError {
    let message = if e.is_timeout() {
        format!("Upstream request timed out: {e}")
    } else if e.is_connect() {
        format!("Failed to connect to upstream: {e}")
    } else {
        format!("Upstream request failed: {e}")
    };
    GatewayError::transport(message)
}
