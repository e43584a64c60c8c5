//! # Gateway Telemetry
//!
//! Observability for the LLM Wrapper gateway.
//!
//! This crate provides:
//! - Structured logging (JSON or key-value) with an optional file copy
//! - An OpenTelemetry tracing layer
//! - Prometheus metrics
//! - [`Instrumentation`] hooks the core calls at fixed points of a request

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod hooks;
pub mod logging;
pub mod metrics;
pub mod tracing_setup;

pub use hooks::{Instrumentation, NoopInstrumentation, UpstreamOutcome};
pub use logging::{init_telemetry, TelemetryConfig, TelemetryError, TelemetryGuard};
pub use metrics::Metrics;
pub use tracing_setup::TracingConfig;
