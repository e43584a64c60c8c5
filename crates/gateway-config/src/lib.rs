//! # Gateway Config
//!
//! Configuration for the LLM Wrapper gateway.
//!
//! Two sources feed the gateway:
//! - Server settings from environment variables (and an optional `.env` file)
//! - One YAML model configuration unit per upstream backend in a directory
//!
//! ## Example
//!
//! ```rust,ignore
//! use gateway_config::{load_config, load_model_configs};
//!
//! let config = load_config()?;
//! let report = load_model_configs(&config.routes.config_dir).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod model;
pub mod settings;

pub use error::ConfigError;
pub use loader::{load_model_configs, LoadReport, SkippedUnit};
pub use model::{ApiSection, ModelConfig, ModelSection, ParameterSection};
pub use settings::{
    load_config, GatewayConfig, LogFormat, LoggingSettings, RoutesSettings, ServerSettings,
    TelemetrySettings, UpstreamSettings,
};
