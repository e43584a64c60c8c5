//! Stream relay.
//!
//! A relay always yields the role announcement first and [`RelayFrame::Done`] last,
//! exactly once, whatever happens upstream. Failures after the announcement become
//! a single in-band error frame.

use crate::client::{transport_error, UpstreamClient};
use crate::framing::{parse_line, LineBuffer, SseLine};
use crate::payload::UpstreamPayload;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use gateway_core::{ChatChunk, ErrorEnvelope, GatewayError};
use gateway_routing::RouteEntry;
use gateway_telemetry::{Instrumentation, UpstreamOutcome};
use serde_json::{json, Value};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// One frame of a relayed stream
#[derive(Debug, Clone, PartialEq)]
pub enum RelayFrame {
    /// A chunk object, forwarded as received
    Chunk(Value),
    /// An in-band error
    Error(ErrorEnvelope),
    /// The terminal sentinel
    Done,
}

impl RelayFrame {
    /// Error frame for a gateway error
    #[must_use]
    pub fn error(err: &GatewayError) -> Self {
        Self::Error(err.normalize().1)
    }

    /// Wire encoding: `data: <json>\n\n` or `data: [DONE]\n\n`
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Self::Chunk(value) => Bytes::from(format!("data: {value}\n\n")),
            Self::Error(envelope) => {
                Bytes::from(format!("data: {}\n\n", json!({ "error": envelope.error })))
            }
            Self::Done => Bytes::from_static(b"data: [DONE]\n\n"),
        }
    }

    /// Whether this is the terminal sentinel
    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Lazily evaluated relay; nothing is sent upstream until it is polled
pub type RelayStream = Pin<Box<dyn Stream<Item = RelayFrame> + Send>>;

pub(crate) fn relay(
    client: UpstreamClient,
    route: Arc<RouteEntry>,
    payload: UpstreamPayload,
    hooks: Arc<dyn Instrumentation>,
) -> RelayStream {
    Box::pin(async_stream::stream! {
        let model = route.model_id.clone();
        let stream_id = ChatChunk::generate_id();
        let announcement = ChatChunk::role_announcement(&stream_id, &model);
        yield RelayFrame::Chunk(serde_json::to_value(announcement).unwrap_or_default());

        hooks.upstream_started(&model, true);
        let started = Instant::now();

        let response = match client.send(&route.upstream_url, &payload).await {
            Ok(response) => response,
            Err(e) => {
                warn!(model = %model, url = %route.upstream_url, error = %e, "Upstream stream failed to open");
                hooks.upstream_finished(&model, true, UpstreamOutcome::TransportError, started.elapsed());
                hooks.error_raised(e.kind());
                yield RelayFrame::error(&e);
                yield RelayFrame::Done;
                return;
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let e = GatewayError::upstream_status(status.as_u16(), body);
            warn!(model = %model, url = %route.upstream_url, status = status.as_u16(), "Upstream stream rejected");
            hooks.upstream_finished(&model, true, UpstreamOutcome::UpstreamError, started.elapsed());
            hooks.error_raised(e.kind());
            yield RelayFrame::error(&e);
            yield RelayFrame::Done;
            return;
        }

        let mut body = response.bytes_stream();
        let mut lines = LineBuffer::default();
        let mut outcome = UpstreamOutcome::Success;
        let mut relayed = 0_u64;
        let mut dropped = 0_u64;

        'read: loop {
            let (chunk, eof) = match body.next().await {
                Some(Ok(chunk)) => (chunk, false),
                Some(Err(e)) => {
                    let e = transport_error(e);
                    warn!(model = %model, error = %e, relayed, "Upstream stream interrupted");
                    outcome = UpstreamOutcome::TransportError;
                    hooks.error_raised(e.kind());
                    yield RelayFrame::error(&e);
                    break 'read;
                }
                None => (Bytes::from_static(b"\n"), true),
            };

            lines.push(&chunk);
            while let Some(line) = lines.next_line() {
                match parse_line(&line) {
                    SseLine::Data(value) => {
                        relayed += 1;
                        yield RelayFrame::Chunk(value);
                    }
                    SseLine::Done => break 'read,
                    SseLine::Ignored => {}
                    SseLine::Malformed(reason) => {
                        dropped += 1;
                        warn!(
                            model = %model,
                            reason = %reason,
                            line = %String::from_utf8_lossy(&line),
                            "Dropping malformed upstream frame"
                        );
                        hooks.frame_dropped(&model);
                    }
                }
            }

            if eof {
                debug!(model = %model, "Upstream stream ended without sentinel");
                break 'read;
            }
        }

        let elapsed = started.elapsed();
        hooks.upstream_finished(&model, true, outcome, elapsed);
        info!(
            model = %model,
            stream_id = %stream_id,
            relayed,
            dropped,
            duration_ms = elapsed.as_millis() as u64,
            "Stream relay finished"
        );

        yield RelayFrame::Done;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_frame_encoding() {
        let chunk = RelayFrame::Chunk(json!({"id": "x"}));
        assert_eq!(&chunk.to_bytes()[..], b"data: {\"id\":\"x\"}\n\n");

        assert_eq!(&RelayFrame::Done.to_bytes()[..], b"data: [DONE]\n\n");

        let error = RelayFrame::Error(ErrorEnvelope::message("boom"));
        let bytes = error.to_bytes();
        let text = std::str::from_utf8(&bytes).expect("utf8");
        let value: Value = serde_json::from_str(
            text.strip_prefix("data: ")
                .and_then(|t| t.strip_suffix("\n\n"))
                .expect("framed"),
        )
        .expect("json");
        assert_eq!(value, json!({"error": {"message": "boom", "type": "api_error"}}));
    }

    #[test]
    fn test_error_frame_uses_normalized_envelope() {
        let err = GatewayError::transport("connection refused");
        match RelayFrame::error(&err) {
            RelayFrame::Error(envelope) => {
                assert_eq!(envelope.text(), "connection refused");
                assert_eq!(envelope.error["type"], "api_error");
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}
