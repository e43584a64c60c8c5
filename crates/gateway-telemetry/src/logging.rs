//! Subscriber installation: log format, file copy and the OpenTelemetry layer.

use crate::tracing_setup::{build_tracer, TracingConfig};
use gateway_config::{GatewayConfig, LogFormat};
use opentelemetry_sdk::trace::TracerProvider;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::{Layered, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

type FilteredRegistry = Layered<EnvFilter, Registry>;
type BoxedLayer = Box<dyn Layer<FilteredRegistry> + Send + Sync>;

/// Telemetry configuration
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive
    pub level: String,
    /// Line format
    pub format: LogFormat,
    /// Optional file receiving a copy of every line
    pub file: Option<PathBuf>,
    /// OpenTelemetry tracer settings
    pub tracing: TracingConfig,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
            file: None,
            tracing: TracingConfig::default(),
        }
    }
}

impl TelemetryConfig {
    /// Derive telemetry settings from the gateway configuration
    #[must_use]
    pub fn from_gateway_config(config: &GatewayConfig) -> Self {
        let mut tracing = TracingConfig::new(config.telemetry.service_name.clone())
            .with_enabled(config.telemetry.enabled)
            .with_sampling_rate(config.telemetry.sampling_rate);
        tracing.otlp_endpoint = config.telemetry.otlp_endpoint.clone();

        Self {
            level: config.logging.level.clone(),
            format: config.logging.format,
            file: config.logging.file.clone(),
            tracing,
        }
    }

    /// Set the filter directive
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }
}

/// Telemetry initialization error
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The filter directive does not parse
    #[error("Invalid log filter '{directive}': {reason}")]
    Filter {
        /// Directive as configured
        directive: String,
        /// Parser message
        reason: String,
    },
    /// The log file path has no file name
    #[error("Invalid log file path: {0}")]
    LogFile(String),
    /// The span exporter could not be built
    #[error("Failed to build span exporter: {0}")]
    Exporter(String),
    /// A global subscriber is already installed
    #[error("Failed to initialize tracing: {0}")]
    Init(String),
}

/// Keeps background writers and the tracer provider alive; flushes on drop
#[must_use = "dropping the guard stops file logging and span export"]
pub struct TelemetryGuard {
    file_guard: Option<WorkerGuard>,
    provider: Option<TracerProvider>,
}

impl std::fmt::Debug for TelemetryGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryGuard")
            .field("file", &self.file_guard.is_some())
            .field("tracer", &self.provider.is_some())
            .finish()
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            for result in provider.force_flush() {
                if let Err(e) = result {
                    eprintln!("Failed to flush spans: {e}");
                }
            }
        }
    }
}

/// Install the global subscriber.
///
/// # Errors
/// Returns error if the filter is invalid, the log file path is unusable, the span
/// exporter cannot be built, or a subscriber is already installed.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let filter = EnvFilter::try_new(&config.level).map_err(|e| TelemetryError::Filter {
        directive: config.level.clone(),
        reason: e.to_string(),
    })?;

    let mut layers: Vec<BoxedLayer> = vec![fmt_layer(config.format, std::io::stdout, true)];

    let file_guard = match &config.file {
        Some(path) => {
            let (writer, guard) = file_writer(path)?;
            layers.push(fmt_layer(config.format, writer, false));
            Some(guard)
        }
        None => None,
    };

    let provider = match otel_layer(&config.tracing)? {
        Some((layer, provider)) => {
            layers.push(layer);
            Some(provider)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(layers)
        .try_init()
        .map_err(|e| TelemetryError::Init(e.to_string()))?;

    info!(
        level = %config.level,
        format = ?config.format,
        file = ?config.file,
        otlp_endpoint = ?config.tracing.export_endpoint(),
        service = %config.tracing.service_name,
        "Telemetry initialized"
    );

    Ok(TelemetryGuard {
        file_guard,
        provider,
    })
}

/// OpenTelemetry layer, only when there is a collector to export to
fn otel_layer(
    config: &TracingConfig,
) -> Result<Option<(BoxedLayer, TracerProvider)>, TelemetryError> {
    let Some(endpoint) = config.export_endpoint() else {
        return Ok(None);
    };

    let (provider, tracer) =
        build_tracer(config, endpoint).map_err(|e| TelemetryError::Exporter(e.to_string()))?;
    let layer = tracing_opentelemetry::layer().with_tracer(tracer).boxed();

    Ok(Some((layer, provider)))
}

fn fmt_layer<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_writer(writer)
            .boxed(),
        LogFormat::KeyValue => fmt::layer()
            .compact()
            .with_target(true)
            .with_ansi(ansi)
            .with_writer(writer)
            .boxed(),
    }
}

fn file_writer(
    path: &Path,
) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard), TelemetryError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| TelemetryError::LogFile(path.display().to_string()))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let appender = tracing_appender::rolling::never(dir, file_name);
    Ok(tracing_appender::non_blocking(appender))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_gateway_config() {
        let mut gateway = GatewayConfig::default();
        gateway.logging.level = "debug".to_string();
        gateway.logging.format = LogFormat::KeyValue;
        gateway.telemetry.enabled = false;
        gateway.telemetry.service_name = "wrapper-test".to_string();
        gateway.telemetry.otlp_endpoint = Some("http://collector:4317".to_string());
        gateway.telemetry.sampling_rate = 0.5;

        let config = TelemetryConfig::from_gateway_config(&gateway);
        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::KeyValue);
        assert!(!config.tracing.enabled);
        assert_eq!(config.tracing.service_name, "wrapper-test");
        assert_eq!(
            config.tracing.otlp_endpoint.as_deref(),
            Some("http://collector:4317")
        );
        assert!((config.tracing.sampling_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_no_otel_layer_without_endpoint() {
        let config = TracingConfig::default();
        assert!(config.enabled);
        assert!(otel_layer(&config).expect("layer").is_none());

        let config = TracingConfig::default()
            .with_otlp_endpoint("http://collector:4317")
            .with_enabled(false);
        assert!(otel_layer(&config).expect("layer").is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_otel_layer_with_endpoint() {
        let config = TracingConfig::default().with_otlp_endpoint("http://127.0.0.1:4317");
        let layer = otel_layer(&config).expect("layer");
        assert!(layer.is_some());
    }

    #[test]
    fn test_invalid_filter_is_rejected() {
        let config = TelemetryConfig::default().with_level("gateway=verbose");
        assert!(matches!(
            init_telemetry(&config),
            Err(TelemetryError::Filter { .. })
        ));
    }

    #[test]
    fn test_log_file_without_name_is_rejected() {
        assert!(file_writer(Path::new("/")).is_err());
    }
}
