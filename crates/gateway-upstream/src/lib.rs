//! # Gateway Upstream
//!
//! Everything between a resolved route and the upstream backend:
//! - [`build_payload`]: merges a client request with its route into the upstream body
//! - [`UpstreamClient`]: the HTTP client, one connection per call
//! - [`CompletionService`]: the two public operations, `complete` and `stream_complete`
//! - [`RelayFrame`] / [`RelayStream`]: the event frames a streaming call produces

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod framing;
pub mod payload;
pub mod relay;
pub mod service;

pub use client::{Timeouts, UpstreamClient};
pub use payload::{
    build_payload, UpstreamMessage, UpstreamPayload, FALLBACK_TEMPERATURE, FALLBACK_TOP_K,
    FALLBACK_TOP_P,
};
pub use relay::{RelayFrame, RelayStream};
pub use service::{CompletionService, SystemPromptOverride};
