//! HTTP middleware for the gateway.

use axum::{
    extract::Request,
    http::{HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::extractors::REQUEST_ID_HEADER;

/// Ensure every request carries an `x-request-id` and echo it on the response
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let id = match request.headers().get(REQUEST_ID_HEADER) {
        Some(value) if !value.is_empty() => value.clone(),
        _ => {
            let generated = uuid::Uuid::new_v4().to_string();
            match HeaderValue::from_str(&generated) {
                Ok(value) => {
                    request.headers_mut().insert(REQUEST_ID_HEADER, value.clone());
                    value
                }
                Err(_) => return next.run(request).await,
            }
        }
    };

    let mut response = next.run(request).await;
    response.headers_mut().insert(REQUEST_ID_HEADER, id);
    response
}

/// Log one line per request with status and latency
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let start = Instant::now();
    let response = next.run(request).await;
    let latency_ms = start.elapsed().as_millis() as u64;
    let status = response.status().as_u16();

    if response.status().is_server_error() {
        warn!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status,
            latency_ms,
            "Request completed with error"
        );
    } else {
        info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status,
            latency_ms,
            "Request completed"
        );
    }

    response
}

/// Permissive CORS for browser clients
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}
