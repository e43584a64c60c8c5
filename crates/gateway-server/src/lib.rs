//! # Gateway Server
//!
//! HTTP front for the LLM Wrapper gateway.
//!
//! This crate provides:
//! - Axum router with the OpenAI-compatible endpoints
//! - Translation of gateway errors into wire envelopes
//! - Request id, logging and CORS middleware
//! - Server runner with graceful shutdown

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod shutdown;
pub mod state;

// Re-export main types
pub use error::ApiError;
pub use routes::create_router;
pub use server::{Server, ServerConfig, ServerError};
pub use shutdown::shutdown_signal;
pub use gateway_upstream::SystemPromptOverride;
pub use state::{AppState, AppStateBuilder};
