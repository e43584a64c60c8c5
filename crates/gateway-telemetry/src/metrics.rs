//! Prometheus metrics.

use crate::hooks::{Instrumentation, UpstreamOutcome};
use gateway_core::ErrorKind;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;
use tracing::warn;

const LATENCY_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0];
const SIZE_BUCKETS: &[f64] = &[64.0, 256.0, 1024.0, 4096.0, 16384.0, 65536.0, 262_144.0];

/// Gateway metrics backed by a private Prometheus registry
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    http_requests: IntCounterVec,
    chat_completions: IntCounterVec,
    upstream_requests: IntCounterVec,
    upstream_duration: HistogramVec,
    response_length: HistogramVec,
    frames_dropped: IntCounterVec,
    errors: IntCounterVec,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create and register all gateway metrics
    ///
    /// # Errors
    /// Returns error if a metric cannot be created or registered
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests = IntCounterVec::new(
            Opts::new("http_requests_total", "HTTP requests by route"),
            &["route"],
        )?;
        let chat_completions = IntCounterVec::new(
            Opts::new("chat_completions_total", "Chat completion requests by model"),
            &["model", "stream"],
        )?;
        let upstream_requests = IntCounterVec::new(
            Opts::new("upstream_requests_total", "Upstream calls by outcome"),
            &["model", "outcome"],
        )?;
        let upstream_duration = HistogramVec::new(
            HistogramOpts::new(
                "upstream_request_duration_seconds",
                "Upstream call duration, full relay for streams",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
            &["model", "stream"],
        )?;
        let response_length = HistogramVec::new(
            HistogramOpts::new(
                "chat_completion_response_length_bytes",
                "Size of non-streaming completion bodies",
            )
            .buckets(SIZE_BUCKETS.to_vec()),
            &["model"],
        )?;
        let frames_dropped = IntCounterVec::new(
            Opts::new("relay_frames_dropped_total", "Malformed upstream frames dropped"),
            &["model"],
        )?;
        let errors = IntCounterVec::new(
            Opts::new("gateway_errors_total", "Failed requests by error kind"),
            &["kind"],
        )?;

        registry.register(Box::new(http_requests.clone()))?;
        registry.register(Box::new(chat_completions.clone()))?;
        registry.register(Box::new(upstream_requests.clone()))?;
        registry.register(Box::new(upstream_duration.clone()))?;
        registry.register(Box::new(response_length.clone()))?;
        registry.register(Box::new(frames_dropped.clone()))?;
        registry.register(Box::new(errors.clone()))?;

        Ok(Self {
            registry,
            http_requests,
            chat_completions,
            upstream_requests,
            upstream_duration,
            response_length,
            frames_dropped,
            errors,
        })
    }

    /// Render all metrics in the Prometheus text format
    #[must_use]
    pub fn gather(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

fn stream_label(stream: bool) -> &'static str {
    if stream {
        "true"
    } else {
        "false"
    }
}

impl Instrumentation for Metrics {
    fn request_received(&self, route: &str) {
        self.http_requests.with_label_values(&[route]).inc();
    }

    fn route_resolved(&self, model: &str, stream: bool) {
        self.chat_completions
            .with_label_values(&[model, stream_label(stream)])
            .inc();
    }

    fn upstream_finished(
        &self,
        model: &str,
        stream: bool,
        outcome: UpstreamOutcome,
        elapsed: Duration,
    ) {
        self.upstream_requests
            .with_label_values(&[model, outcome.as_str()])
            .inc();
        self.upstream_duration
            .with_label_values(&[model, stream_label(stream)])
            .observe(elapsed.as_secs_f64());
    }

    fn frame_dropped(&self, model: &str) {
        self.frames_dropped.with_label_values(&[model]).inc();
    }

    fn response_recorded(&self, model: &str, bytes: usize) {
        self.response_length
            .with_label_values(&[model])
            .observe(bytes as f64);
    }

    fn error_raised(&self, kind: ErrorKind) {
        self.errors.with_label_values(&[kind.as_str()]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_render() {
        let metrics = Metrics::new().expect("metrics");

        metrics.request_received("/v1/chat/completions");
        metrics.route_resolved("expert", true);
        metrics.upstream_finished(
            "expert",
            true,
            UpstreamOutcome::Success,
            Duration::from_millis(120),
        );
        metrics.frame_dropped("expert");
        metrics.error_raised(ErrorKind::RouteNotFound);

        let text = metrics.gather();
        assert!(text.contains("http_requests_total{route=\"/v1/chat/completions\"} 1"));
        assert!(text.contains("chat_completions_total{model=\"expert\",stream=\"true\"} 1"));
        assert!(text.contains("upstream_requests_total{model=\"expert\",outcome=\"success\"} 1"));
        assert!(text.contains("relay_frames_dropped_total{model=\"expert\"} 1"));
        assert!(text.contains("gateway_errors_total{kind=\"route_not_found\"} 1"));
        assert!(text.contains("upstream_request_duration_seconds_bucket"));
    }

    #[test]
    fn test_instances_are_independent() {
        let a = Metrics::new().expect("metrics");
        let b = Metrics::new().expect("metrics");

        a.request_received("/health");
        assert!(!b.gather().contains("route=\"/health\""));
    }
}
