//! Application state shared across handlers.

use gateway_core::GatewayResult;
use gateway_routing::RoutingHandle;
use gateway_telemetry::{Instrumentation, Metrics, NoopInstrumentation};
use gateway_upstream::{CompletionService, SystemPromptOverride, Timeouts, UpstreamClient};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Completion service
    pub service: CompletionService,
    /// Prometheus metrics, when enabled
    pub metrics: Option<Metrics>,
    /// Instrumentation hooks
    pub hooks: Arc<dyn Instrumentation>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("service", &self.service)
            .field("metrics", &self.metrics.is_some())
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Create a new state builder
    #[must_use]
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::default()
    }

    /// The live routing handle
    #[must_use]
    pub fn routes(&self) -> &RoutingHandle {
        self.service.routes()
    }
}

/// Builder for `AppState`
#[derive(Default)]
pub struct AppStateBuilder {
    routes: Option<RoutingHandle>,
    client: Option<UpstreamClient>,
    metrics: Option<Metrics>,
    system_prompts: Option<Arc<dyn SystemPromptOverride>>,
}

impl AppStateBuilder {
    /// Set the routing handle
    #[must_use]
    pub fn routes(mut self, routes: RoutingHandle) -> Self {
        self.routes = Some(routes);
        self
    }

    /// Set the upstream client
    #[must_use]
    pub fn client(mut self, client: UpstreamClient) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the metrics registry; it also becomes the instrumentation
    #[must_use]
    pub fn metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Set the system prompt provider
    #[must_use]
    pub fn system_prompt_override(mut self, provider: Arc<dyn SystemPromptOverride>) -> Self {
        self.system_prompts = Some(provider);
        self
    }

    /// Build the state
    ///
    /// # Errors
    /// Returns error if a default upstream client cannot be created
    pub fn build(self) -> GatewayResult<AppState> {
        let client = match self.client {
            Some(client) => client,
            None => UpstreamClient::new(Timeouts::default())?,
        };

        let hooks: Arc<dyn Instrumentation> = match &self.metrics {
            Some(metrics) => Arc::new(metrics.clone()),
            None => Arc::new(NoopInstrumentation),
        };

        let mut service = CompletionService::new(self.routes.unwrap_or_default(), client)
            .with_hooks(Arc::clone(&hooks));
        if let Some(provider) = self.system_prompts {
            service = service.with_system_prompts(provider);
        }

        Ok(AppState {
            service,
            metrics: self.metrics,
            hooks,
        })
    }
}
