//! Server settings read from the process environment.

use crate::error::ConfigError;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Default bind host
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default bind port
pub const DEFAULT_PORT: u16 = 8000;
/// Default bound for non-streaming upstream calls
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
/// Default bound for streaming upstream calls
pub const DEFAULT_STREAMING_TIMEOUT: Duration = Duration::from_secs(300);
/// Default directory of model configuration units
pub const DEFAULT_CONFIG_DIR: &str = "configs";
/// Default service name reported to the tracer
pub const DEFAULT_SERVICE_NAME: &str = "llm-wrapper";

/// Complete gateway configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GatewayConfig {
    /// Listener settings
    pub server: ServerSettings,
    /// Upstream call bounds
    pub upstream: UpstreamSettings,
    /// Where model units live
    pub routes: RoutesSettings,
    /// Log output
    pub logging: LoggingSettings,
    /// Tracing export
    pub telemetry: TelemetrySettings,
}

/// Listener settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Upstream call bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpstreamSettings {
    /// Total duration allowed for a non-streaming call
    pub request_timeout: Duration,
    /// Total duration allowed for a streaming call
    pub streaming_timeout: Duration,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            streaming_timeout: DEFAULT_STREAMING_TIMEOUT,
        }
    }
}

/// Model unit location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutesSettings {
    /// Directory scanned for `*.yaml` / `*.yml` units
    pub config_dir: PathBuf,
}

impl Default for RoutesSettings {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
        }
    }
}

/// Log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// Human-readable `key=value` lines
    KeyValue,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "kv" | "keyvalue" | "key_value" | "text" => Ok(Self::KeyValue),
            other => Err(format!("unknown log format '{other}', expected json or kv")),
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// `EnvFilter` directive
    pub level: String,
    /// Line format
    pub format: LogFormat,
    /// Optional file that receives a copy of every line
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
            file: None,
        }
    }
}

/// Tracing export settings
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySettings {
    /// Install the OpenTelemetry layer
    pub enabled: bool,
    /// Service name resource attribute
    pub service_name: String,
    /// OTLP/gRPC collector; spans are only exported when set
    pub otlp_endpoint: Option<String>,
    /// Fraction of traces sampled, 0.0 to 1.0
    pub sampling_rate: f64,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            otlp_endpoint: None,
            sampling_rate: 1.0,
        }
    }
}

impl GatewayConfig {
    /// Build the configuration from a variable lookup.
    ///
    /// Unset variables keep their defaults; set but unparsable ones are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = non_empty(lookup("HOST")) {
            config.server.host = host;
        }
        if let Some(raw) = non_empty(lookup("PORT")) {
            config.server.port = parse_port(&raw)?;
        }

        if let Some(raw) = non_empty(lookup("DEFAULT_TIMEOUT")) {
            config.upstream.request_timeout = parse_duration("DEFAULT_TIMEOUT", &raw)?;
        }
        if let Some(raw) = non_empty(lookup("STREAMING_TIMEOUT")) {
            config.upstream.streaming_timeout = parse_duration("STREAMING_TIMEOUT", &raw)?;
        }

        if let Some(dir) = non_empty(lookup("CONFIG_DIR")) {
            config.routes.config_dir = PathBuf::from(dir);
        }

        if let Some(level) = non_empty(lookup("LOG_LEVEL")) {
            config.logging.level = level;
        }
        if let Some(raw) = non_empty(lookup("LOG_FORMAT")) {
            config.logging.format = raw
                .parse()
                .map_err(|reason| ConfigError::invalid_value("LOG_FORMAT", raw.as_str(), reason))?;
        }
        config.logging.file = non_empty(lookup("LOG_FILE")).map(PathBuf::from);

        if let Some(raw) = non_empty(lookup("DISABLE_TELEMETRY")) {
            config.telemetry.enabled = !parse_flag("DISABLE_TELEMETRY", &raw)?;
        }
        if let Some(name) = non_empty(lookup("OTEL_SERVICE_NAME")) {
            config.telemetry.service_name = name;
        }
        config.telemetry.otlp_endpoint = non_empty(lookup("OTEL_EXPORTER_OTLP_ENDPOINT"));
        if let Some(raw) = non_empty(lookup("OTEL_SAMPLING_RATE")) {
            config.telemetry.sampling_rate = parse_rate("OTEL_SAMPLING_RATE", &raw)?;
        }

        Ok(config)
    }
}

/// Load configuration from `.env` (if present) and the process environment
pub fn load_config() -> Result<GatewayConfig, ConfigError> {
    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "Loaded .env file"),
        Err(e) if e.not_found() => {}
        Err(e) => {
            return Err(ConfigError::invalid_value(".env", "", e.to_string()));
        }
    }

    GatewayConfig::from_lookup(|key| std::env::var(key).ok())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    raw.trim_start_matches(':')
        .parse::<u16>()
        .map_err(|e| ConfigError::invalid_value("PORT", raw, e.to_string()))
}

/// Bare integers are seconds; anything else goes through humantime
fn parse_duration(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    let duration = match raw.parse::<u64>() {
        Ok(secs) => Duration::from_secs(secs),
        Err(_) => humantime::parse_duration(raw)
            .map_err(|e| ConfigError::invalid_value(key, raw, e.to_string()))?,
    };

    if duration.is_zero() {
        return Err(ConfigError::invalid_value(key, raw, "timeout must be positive"));
    }

    Ok(duration)
}

fn parse_rate(key: &str, raw: &str) -> Result<f64, ConfigError> {
    let rate = raw
        .parse::<f64>()
        .map_err(|e| ConfigError::invalid_value(key, raw, e.to_string()))?;

    if !(0.0..=1.0).contains(&rate) {
        return Err(ConfigError::invalid_value(key, raw, "expected a value between 0 and 1"));
    }

    Ok(rate)
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid_value(key, raw, "expected a boolean")),
    }
}
