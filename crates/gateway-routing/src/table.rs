//! Immutable routing table.

use gateway_config::ModelConfig;
use gateway_core::{GatewayError, GatewayResult};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Per-route sampling defaults. `None` falls through to the built-in fallback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GenerationDefaults {
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Nucleus sampling
    pub top_p: Option<f32>,
    /// Top-k sampling
    pub top_k: Option<u32>,
}

/// One upstream target
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteEntry {
    /// Client-facing model id
    pub model_id: String,
    /// Upstream chat-completions URL
    pub upstream_url: String,
    /// Model path sent upstream as `model`
    pub upstream_model_path: String,
    /// Route system prompt, possibly empty
    pub default_system_prompt: String,
    /// Sampling defaults
    pub defaults: GenerationDefaults,
}

impl RouteEntry {
    /// Build a route from a validated model unit
    #[must_use]
    pub fn from_config(model_id: impl Into<String>, config: ModelConfig) -> Self {
        Self {
            model_id: model_id.into(),
            upstream_url: config.api.url,
            upstream_model_path: config.model.path,
            default_system_prompt: config.system_prompt,
            defaults: GenerationDefaults {
                temperature: config.parameters.temperature,
                top_p: config.parameters.top_p,
                top_k: config.parameters.top_k,
            },
        }
    }

    /// Route system prompt, `None` when empty
    #[must_use]
    pub fn system_prompt(&self) -> Option<&str> {
        Some(self.default_system_prompt.as_str()).filter(|p| !p.is_empty())
    }
}

/// Map from model id to route. Never mutated after [`RoutingTable::build`].
#[derive(Debug, Default)]
pub struct RoutingTable {
    routes: HashMap<String, Arc<RouteEntry>>,
}

impl RoutingTable {
    /// Build a table from `(model_id, unit)` pairs.
    ///
    /// A repeated id replaces the earlier entry and is logged at `warn`.
    pub fn build<I>(units: I) -> Self
    where
        I: IntoIterator<Item = (String, ModelConfig)>,
    {
        Self::from_entries(
            units
                .into_iter()
                .map(|(id, config)| RouteEntry::from_config(id, config)),
        )
    }

    /// Build a table from ready-made entries, same collision rule as [`RoutingTable::build`]
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = RouteEntry>,
    {
        let mut routes = HashMap::new();

        for entry in entries {
            let id = entry.model_id.clone();
            if let Some(previous) = routes.insert(id.clone(), Arc::new(entry)) {
                warn!(
                    model = %id,
                    replaced_url = %previous.upstream_url,
                    "Duplicate model id, later config replaces earlier one"
                );
            }
        }

        info!(routes = routes.len(), "Routing table built");
        Self { routes }
    }

    /// Look up a route by model id
    pub fn resolve(&self, model_id: &str) -> GatewayResult<Arc<RouteEntry>> {
        self.routes
            .get(model_id)
            .cloned()
            .ok_or_else(|| GatewayError::route_not_found(model_id, self.model_ids()))
    }

    /// Known model ids, sorted
    #[must_use]
    pub fn model_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.routes.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of routes
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the table has no routes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
