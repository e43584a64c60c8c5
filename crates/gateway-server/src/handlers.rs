//! HTTP request handlers for the gateway API.

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;
use gateway_core::{ChatRequest, ModelObject, ModelsResponse};
use gateway_upstream::RelayStream;
use serde::Serialize;
use std::convert::Infallible;
use tracing::{debug, info, instrument};

use crate::{
    error::ApiError,
    extractors::{JsonBody, RequestId},
    state::AppState,
};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: &'static str,
}

/// Liveness endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    state.hooks.request_received("/health");
    Json(HealthResponse { status: "ok" })
}

/// Prometheus metrics endpoint
pub async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let body = state
        .metrics
        .as_ref()
        .map(gateway_telemetry::Metrics::gather)
        .unwrap_or_default();

    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}

/// List models endpoint
#[instrument(skip(state))]
pub async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    state.hooks.request_received("/v1/models");

    let created = chrono::Utc::now().timestamp();
    let data = state
        .routes()
        .snapshot()
        .model_ids()
        .into_iter()
        .map(|id| ModelObject::new(id, created))
        .collect();

    Json(ModelsResponse::new(data))
}

/// Chat completion endpoint
#[instrument(skip_all, fields(request_id = %request_id))]
pub async fn chat_completion(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    body: Result<JsonBody<ChatRequest>, ApiError>,
) -> Result<Response, ApiError> {
    state.hooks.request_received("/v1/chat/completions");

    let JsonBody(request) = body.map_err(|e| reject(&state, e))?;
    request.validate().map_err(|e| reject(&state, e.into()))?;

    info!(
        model = %request.model,
        stream = request.stream,
        messages = request.messages.len(),
        "Processing chat completion request"
    );

    if request.stream {
        let frames = state.service.stream_complete(&request, None)?;
        stream_response(frames)
    } else {
        let response = state.service.complete(&request, None).await?;
        Ok(Json(response).into_response())
    }
}

/// Unmatched paths
pub async fn not_found(uri: Uri) -> ApiError {
    debug!(path = %uri.path(), "No route for path");
    ApiError::not_found(format!("Not found: {}", uri.path()))
}

fn reject(state: &AppState, err: ApiError) -> ApiError {
    if let Some(kind) = err.kind {
        state.hooks.error_raised(kind);
    }
    err
}

fn stream_response(frames: RelayStream) -> Result<Response, ApiError> {
    let body = Body::from_stream(frames.map(|frame| Ok::<_, Infallible>(frame.to_bytes())));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .header("x-accel-buffering", "no")
        .header(header::TRANSFER_ENCODING, "chunked")
        .body(body)
        .map_err(|e| ApiError::internal(format!("Failed to build stream response: {e}")))
}
