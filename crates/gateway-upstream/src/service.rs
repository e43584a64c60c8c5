//! Completion service: the `complete` and `stream_complete` operations.

use crate::client::UpstreamClient;
use crate::payload::{build_payload, UpstreamPayload};
use crate::relay::{relay, RelayStream};
use gateway_core::{ChatRequest, ChatResponse, GatewayError, GatewayResult};
use gateway_routing::{RouteEntry, RoutingHandle};
use gateway_telemetry::{Instrumentation, NoopInstrumentation, UpstreamOutcome};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Supplies a system prompt for a request, ahead of the route default.
///
/// Called with the route the request was resolved to. An explicit system message in
/// the request still wins over whatever this returns.
pub trait SystemPromptOverride: Send + Sync {
    /// Prompt for this request, or `None` to fall back to the route default
    fn system_prompt(&self, request: &ChatRequest, route: &RouteEntry) -> Option<String>;
}

/// Executes chat completions against the routed upstream
#[derive(Clone)]
pub struct CompletionService {
    routes: RoutingHandle,
    client: UpstreamClient,
    hooks: Arc<dyn Instrumentation>,
    system_prompts: Option<Arc<dyn SystemPromptOverride>>,
}

impl std::fmt::Debug for CompletionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionService")
            .field("routes", &self.routes.snapshot().len())
            .field("client", &self.client)
            .field("system_prompts", &self.system_prompts.is_some())
            .finish_non_exhaustive()
    }
}

impl CompletionService {
    /// Create a service with no-op instrumentation
    #[must_use]
    pub fn new(routes: RoutingHandle, client: UpstreamClient) -> Self {
        Self {
            routes,
            client,
            hooks: Arc::new(NoopInstrumentation),
            system_prompts: None,
        }
    }

    /// Attach instrumentation hooks
    #[must_use]
    pub fn with_hooks(mut self, hooks: Arc<dyn Instrumentation>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Consult `provider` for a prompt whenever the caller passes none
    #[must_use]
    pub fn with_system_prompts(mut self, provider: Arc<dyn SystemPromptOverride>) -> Self {
        self.system_prompts = Some(provider);
        self
    }

    /// The routing handle this service reads from
    #[must_use]
    pub fn routes(&self) -> &RoutingHandle {
        &self.routes
    }

    /// Single upstream round trip.
    ///
    /// `system_prompt` is an injected prompt; it loses to an explicit system message
    /// in the request and beats the route default. Without one, the configured
    /// [`SystemPromptOverride`] is asked.
    ///
    /// # Errors
    /// `BadRequest` and `RouteNotFound` before any upstream call; `Upstream` for a
    /// non-2xx reply or an undecodable body; `Transport` for connection failures and
    /// timeouts.
    pub async fn complete(
        &self,
        request: &ChatRequest,
        system_prompt: Option<&str>,
    ) -> GatewayResult<ChatResponse> {
        let result = self.run_complete(request, system_prompt).await;
        if let Err(e) = &result {
            self.hooks.error_raised(e.kind());
        }
        result
    }

    async fn run_complete(
        &self,
        request: &ChatRequest,
        system_prompt: Option<&str>,
    ) -> GatewayResult<ChatResponse> {
        let (route, payload) = self.prepare(request, system_prompt, false)?;

        self.hooks.upstream_started(&route.model_id, false);
        let started = Instant::now();

        let result = self
            .client
            .fetch(&route.upstream_url, &payload)
            .await
            .and_then(|body| {
                let response = serde_json::from_slice::<ChatResponse>(&body)
                    .map_err(GatewayError::upstream_decode)?;
                Ok((response, body.len()))
            });

        let elapsed = started.elapsed();
        let outcome = match &result {
            Ok(_) => UpstreamOutcome::Success,
            Err(e) => UpstreamOutcome::from(e.kind()),
        };
        self.hooks
            .upstream_finished(&route.model_id, false, outcome, elapsed);

        match result {
            Ok((response, bytes)) => {
                self.hooks.response_recorded(&route.model_id, bytes);
                info!(
                    model = %route.model_id,
                    upstream_id = %response.id,
                    total_tokens = response.usage.total_tokens,
                    duration_ms = elapsed.as_millis() as u64,
                    "Completion finished"
                );
                Ok(response)
            }
            Err(e) => {
                warn!(
                    model = %route.model_id,
                    url = %route.upstream_url,
                    error = %e,
                    duration_ms = elapsed.as_millis() as u64,
                    "Completion failed"
                );
                Err(e)
            }
        }
    }

    /// Open a relay.
    ///
    /// Validation, routing and payload errors are returned here. Once a stream is
    /// returned every later failure is an in-band error frame, and the stream always
    /// ends with [`crate::RelayFrame::Done`].
    ///
    /// # Errors
    /// `BadRequest` or `RouteNotFound`.
    pub fn stream_complete(
        &self,
        request: &ChatRequest,
        system_prompt: Option<&str>,
    ) -> GatewayResult<RelayStream> {
        let (route, payload) = self
            .prepare(request, system_prompt, true)
            .map_err(|e| {
                self.hooks.error_raised(e.kind());
                e
            })?;

        Ok(relay(
            self.client.clone(),
            route,
            payload,
            Arc::clone(&self.hooks),
        ))
    }

    fn prepare(
        &self,
        request: &ChatRequest,
        system_prompt: Option<&str>,
        stream: bool,
    ) -> GatewayResult<(Arc<RouteEntry>, UpstreamPayload)> {
        request.validate()?;

        let route = self.routes.snapshot().resolve(&request.model)?;
        self.hooks.route_resolved(&route.model_id, stream);

        let injected = match (system_prompt, &self.system_prompts) {
            (Some(prompt), _) => Some(prompt.to_string()),
            (None, Some(provider)) => provider.system_prompt(request, &route),
            (None, None) => None,
        };

        let mut payload = build_payload(request, &route, injected.as_deref())?;
        payload.stream = stream;

        debug!(
            model = %route.model_id,
            url = %route.upstream_url,
            upstream_model = %payload.model,
            stream,
            "Route resolved"
        );

        Ok((route, payload))
    }
}
