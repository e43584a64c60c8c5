//! Server runner.

use gateway_config::settings::{ServerSettings, DEFAULT_HOST, DEFAULT_PORT};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::info;

use crate::{routes::create_router, shutdown::shutdown_signal, state::AppState};

/// Server errors
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen address could not be bound
    #[error("Failed to bind {address}: {source}")]
    Bind {
        /// Address that was requested
        address: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The server loop failed
    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Listen address configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host to bind
    pub host: String,
    /// Port to bind
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// Create a configuration with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the host
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// `host:port`
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl From<&ServerSettings> for ServerConfig {
    fn from(settings: &ServerSettings) -> Self {
        Self::new()
            .with_host(&settings.host)
            .with_port(settings.port)
    }
}

/// HTTP server
#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    state: AppState,
}

impl Server {
    /// Create a server
    #[must_use]
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Bind and serve until a shutdown signal arrives
    ///
    /// # Errors
    /// Returns error if the address cannot be bound or the server loop fails
    pub async fn run(self) -> Result<(), ServerError> {
        let address = self.config.bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| ServerError::Bind {
                address: address.clone(),
                source,
            })?;

        info!(
            address = %address,
            models = self.state.routes().snapshot().len(),
            "Server listening"
        );

        axum::serve(listener, create_router(self.state))
            .with_graceful_shutdown(async {
                shutdown_signal().await;
            })
            .await?;

        info!("Server stopped");
        Ok(())
    }
}
