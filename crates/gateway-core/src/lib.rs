//! # Gateway Core
//!
//! Core types and error handling for the LLM Wrapper gateway.
//!
//! This crate provides the foundational types used throughout the gateway:
//! - OpenAI-compatible request, response and stream chunk types
//! - The gateway error taxonomy
//! - The error normalizer that turns every failure into one wire envelope

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod request;
pub mod response;
pub mod streaming;

// Re-export commonly used types
pub use error::{ErrorDetail, ErrorEnvelope, ErrorKind, GatewayError, GatewayResult};
pub use request::{ChatMessage, ChatRequest, ChatRequestBuilder, MessageRole};
pub use response::{ChatResponse, Choice, ModelObject, ModelsResponse, Usage};
pub use streaming::{ChatChunk, ChunkChoice, ChunkDelta};
