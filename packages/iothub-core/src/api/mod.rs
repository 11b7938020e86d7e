//! HTTP API layer.
//!
//! This module contains thin handlers that delegate to the aggregator and
//! adapters. It provides the router construction and server startup.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::aggregator::Aggregator;
use crate::protocols::wifi::WifiAdapter;
use crate::runtime::TokioSpawner;
use crate::state::Config;

pub mod http;
pub mod response;

/// Errors that can occur when starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to the TCP port, or the server loop failed.
    #[error("Failed to bind to port: {0}")]
    Bind(#[from] std::io::Error),
}

/// Shared application state for the API layer.
///
/// Handlers reach device state only through the aggregator and adapters.
#[derive(Clone)]
pub struct AppState {
    /// Cross-protocol device view and command routing.
    pub aggregator: Arc<Aggregator>,
    /// WiFi adapter, for the WiFi-specific routes.
    pub wifi: Arc<WifiAdapter>,
    /// Spawner for work that outlives a request (background discovery).
    pub spawner: TokioSpawner,
    pub config: Arc<Config>,
}

/// Builder for constructing an `AppState`.
#[derive(Default)]
pub struct AppStateBuilder {
    aggregator: Option<Arc<Aggregator>>,
    wifi: Option<Arc<WifiAdapter>>,
    spawner: Option<TokioSpawner>,
    config: Option<Arc<Config>>,
}

impl AppStateBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn aggregator(mut self, aggregator: Arc<Aggregator>) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    pub fn wifi(mut self, wifi: Arc<WifiAdapter>) -> Self {
        self.wifi = Some(wifi);
        self
    }

    pub fn spawner(mut self, spawner: TokioSpawner) -> Self {
        self.spawner = Some(spawner);
        self
    }

    pub fn config(mut self, config: Arc<Config>) -> Self {
        self.config = Some(config);
        self
    }

    /// Builds the `AppState`, panicking if required fields are missing.
    pub fn build(self) -> AppState {
        AppState {
            aggregator: self.aggregator.expect("aggregator is required"),
            wifi: self.wifi.expect("wifi is required"),
            spawner: self.spawner.expect("spawner is required"),
            config: self.config.unwrap_or_default(),
        }
    }
}

impl AppState {
    /// Creates a new builder for constructing an `AppState`.
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::new()
    }
}

/// Serves the HTTP API on the configured port until `shutdown` fires.
pub async fn start_server(state: AppState, shutdown: CancellationToken) -> Result<(), ServerError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.preferred_port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("Server listening on http://{}", listener.local_addr()?);

    let app = http::create_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    log::info!("Server stopped");
    Ok(())
}
