//! # LLM Wrapper
//!
//! OpenAI-compatible gateway in front of self-hosted chat-completion backends.
//!
//! Each YAML file in the model configuration directory declares one model; its file
//! stem is the model id clients send. Requests are forwarded to the backend of that
//! model, and streaming responses are relayed frame by frame.
//!
//! ## Usage
//!
//! ```bash
//! # Serve the models declared in ./configs on 0.0.0.0:8000
//! llm-wrapper
//!
//! # Custom port and model directory
//! PORT=9000 CONFIG_DIR=/etc/llm-wrapper/models llm-wrapper
//!
//! # Reload model configuration without restarting
//! kill -HUP <pid>
//! ```

use gateway_config::{load_config, load_model_configs, ConfigError, GatewayConfig};
use gateway_routing::{RoutingHandle, RoutingTable};
use gateway_server::{AppState, Server, ServerConfig};
use gateway_telemetry::{init_telemetry, Metrics, TelemetryConfig};
use gateway_upstream::{Timeouts, UpstreamClient};
use std::path::Path;
use tracing::{error, info, warn};

/// Application entry point
#[tokio::main]
async fn main() {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    let _telemetry = match init_telemetry(&TelemetryConfig::from_gateway_config(&config)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize telemetry: {e}");
            std::process::exit(1);
        }
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting LLM Wrapper"
    );

    if let Err(e) = run(config).await {
        error!(error = %e, "Application failed");
        std::process::exit(1);
    }
}

/// Main application logic
async fn run(config: GatewayConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        host = %config.server.host,
        port = config.server.port,
        config_dir = %config.routes.config_dir.display(),
        "Configuration loaded"
    );

    let routes = RoutingHandle::new(build_table(&config.routes.config_dir).await?);

    let client = UpstreamClient::new(Timeouts {
        request: config.upstream.request_timeout,
        streaming: config.upstream.streaming_timeout,
    })?;

    let metrics = Metrics::new()?;

    let state = AppState::builder()
        .routes(routes.clone())
        .client(client)
        .metrics(metrics)
        .build()?;

    spawn_reload_task(routes, config.routes.config_dir.clone());

    let server = Server::new(ServerConfig::from(&config.server), state);
    server.run().await?;

    Ok(())
}

/// Load every model unit in `dir` into a fresh table
async fn build_table(dir: &Path) -> Result<RoutingTable, ConfigError> {
    let report = load_model_configs(dir).await?;

    if !report.skipped.is_empty() {
        warn!(
            skipped = report.skipped.len(),
            "Some model configurations were skipped"
        );
    }

    let table = RoutingTable::build(report.units);
    if table.is_empty() {
        warn!(dir = %dir.display(), "No models configured");
    } else {
        info!(models = ?table.model_ids(), "Routing table built");
    }

    Ok(table)
}

/// Rebuild the routing table on SIGHUP and swap it in
#[cfg(unix)]
fn spawn_reload_task(routes: RoutingHandle, dir: std::path::PathBuf) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(stream) => stream,
        Err(e) => {
            warn!(error = %e, "Failed to install SIGHUP handler, reload disabled");
            return;
        }
    };

    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            info!(dir = %dir.display(), "Reloading model configuration");
            match build_table(&dir).await {
                Ok(table) => {
                    routes.replace(table);
                }
                Err(e) => error!(error = %e, "Reload failed, keeping current routes"),
            }
        }
    });
}

#[cfg(not(unix))]
fn spawn_reload_task(_routes: RoutingHandle, _dir: std::path::PathBuf) {}
