//! # Gateway Routing
//!
//! Model-id routing for the LLM Wrapper gateway.
//!
//! This crate provides:
//! - [`RouteEntry`]: one upstream target with its generation defaults
//! - [`RoutingTable`]: an immutable map from model id to route, built once per load
//! - [`RoutingHandle`]: a shared pointer to the current table, swapped atomically on reload

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod handle;
pub mod table;

pub use handle::RoutingHandle;
pub use table::{GenerationDefaults, RouteEntry, RoutingTable};
