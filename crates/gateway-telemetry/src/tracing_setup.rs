//! OpenTelemetry tracer setup.
//!
//! Builds the tracer provider behind the `tracing-opentelemetry` layer. Spans from
//! `#[instrument]` handlers and the upstream calls are batched and exported over
//! OTLP/gRPC to the configured collector.

use opentelemetry::trace::{TraceError, TracerProvider as _};
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    runtime,
    trace::{Config, RandomIdGenerator, Sampler, Tracer, TracerProvider},
    Resource,
};

/// Tracer configuration
#[derive(Debug, Clone, PartialEq)]
pub struct TracingConfig {
    /// Install the OpenTelemetry layer
    pub enabled: bool,
    /// Service name
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// OTLP collector endpoint; no spans are exported without one
    pub otlp_endpoint: Option<String>,
    /// Sampling rate (0.0 - 1.0)
    pub sampling_rate: f64,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            service_name: "llm-wrapper".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            otlp_endpoint: None,
            sampling_rate: 1.0,
        }
    }
}

impl TracingConfig {
    /// Create a tracer configuration for a service
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    /// Enable or disable the layer
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the OTLP endpoint
    #[must_use]
    pub fn with_otlp_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.otlp_endpoint = Some(endpoint.into());
        self
    }

    /// Set the sampling rate
    #[must_use]
    pub fn with_sampling_rate(mut self, rate: f64) -> Self {
        self.sampling_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Collector to export to, when tracing is enabled and one is configured
    #[must_use]
    pub fn export_endpoint(&self) -> Option<&str> {
        self.otlp_endpoint.as_deref().filter(|_| self.enabled)
    }

    fn sampler(&self) -> Sampler {
        if self.sampling_rate >= 1.0 {
            Sampler::AlwaysOn
        } else if self.sampling_rate <= 0.0 {
            Sampler::AlwaysOff
        } else {
            Sampler::TraceIdRatioBased(self.sampling_rate)
        }
    }
}

/// Build a tracer provider exporting to `endpoint` and the tracer the layer records into.
///
/// Must be called inside a Tokio runtime: the batch processor runs as a task on it.
pub(crate) fn build_tracer(
    config: &TracingConfig,
    endpoint: &str,
) -> Result<(TracerProvider, Tracer), TraceError> {
    let resource = Resource::new(vec![
        KeyValue::new("service.name", config.service_name.clone()),
        KeyValue::new("service.version", config.service_version.clone()),
    ]);

    let tracer_config = Config::default()
        .with_sampler(config.sampler())
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource);

    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(endpoint)
        .build_span_exporter()?;

    let provider = TracerProvider::builder()
        .with_config(tracer_config)
        .with_batch_exporter(exporter, runtime::Tokio)
        .build();
    let tracer = provider.tracer(config.service_name.clone());

    Ok((provider, tracer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampling_rate_clamping() {
        let config = TracingConfig::new("test").with_sampling_rate(1.5);
        assert!((config.sampling_rate - 1.0).abs() < f64::EPSILON);
        assert!(matches!(config.sampler(), Sampler::AlwaysOn));

        let config = TracingConfig::new("test").with_sampling_rate(-0.5);
        assert!(config.sampling_rate.abs() < f64::EPSILON);
        assert!(matches!(config.sampler(), Sampler::AlwaysOff));

        let config = TracingConfig::new("test").with_sampling_rate(0.25);
        assert!(matches!(config.sampler(), Sampler::TraceIdRatioBased(_)));
    }

    #[test]
    fn test_default_config() {
        let config = TracingConfig::default();
        assert!(config.enabled);
        assert_eq!(config.service_name, "llm-wrapper");
        assert!(config.otlp_endpoint.is_none());
    }

    #[test]
    fn test_export_endpoint_requires_enabled_and_endpoint() {
        assert_eq!(TracingConfig::default().export_endpoint(), None);

        let config = TracingConfig::default().with_otlp_endpoint("http://collector:4317");
        assert_eq!(config.export_endpoint(), Some("http://collector:4317"));

        let config = config.with_enabled(false);
        assert_eq!(config.export_endpoint(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_build_tracer_with_endpoint() {
        let config = TracingConfig::new("test").with_otlp_endpoint("http://127.0.0.1:4317");

        // The channel connects lazily, so no collector is needed to build.
        let (provider, _tracer) = build_tracer(&config, "http://127.0.0.1:4317").expect("tracer");
        drop(provider);
    }
}
