//! Application bootstrap and dependency wiring.
//!
//! This module contains the composition root - the single place where the
//! broker session, registries, adapters and aggregator are created and
//! wired together. Nothing here is global: every component receives the
//! `Arc`s it needs.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::aggregator::Aggregator;
use crate::api::AppState;
use crate::device::Protocol;
use crate::error::{ErrorCode, HubError, HubResult};
use crate::protocols::wifi::{CommandDiscovery, HttpDeviceTransport, WifiAdapter};
use crate::protocols::zigbee::{MqttBroker, ZigbeeAdapter};
use crate::protocols::{DeviceAdapter, UnsupportedAdapter};
use crate::registry::DeviceRegistry;
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::state::Config;

/// Container for all bootstrapped services.
#[derive(Clone)]
pub struct BootstrappedServices {
    pub config: Arc<Config>,
    /// Live broker session behind the Zigbee adapter.
    pub broker: Arc<MqttBroker>,
    pub zigbee: Arc<ZigbeeAdapter>,
    pub wifi: Arc<WifiAdapter>,
    /// Cross-protocol view used by the HTTP layer.
    pub aggregator: Arc<Aggregator>,
    /// Task spawner for background operations.
    pub spawner: TokioSpawner,
    /// Cancellation token for graceful shutdown.
    pub cancel_token: CancellationToken,
}

impl BootstrappedServices {
    /// Starts the long-running background work.
    ///
    /// - the Zigbee consumer draining the broker's inbound queue
    /// - an initial WiFi scan, if enabled
    /// - periodic WiFi scans, if an interval is configured
    pub fn start_background_tasks(&self) {
        self.zigbee
            .start_consumer(&self.spawner, self.cancel_token.child_token());

        let wifi_config = &self.config.wifi;
        if wifi_config.scan_on_startup {
            let wifi = Arc::clone(&self.wifi);
            self.spawner.spawn(async move {
                wifi.scan().await;
            });
        }

        if wifi_config.scan_interval_secs > 0 {
            self.wifi.start_periodic_scan(
                &self.spawner,
                Duration::from_secs(wifi_config.scan_interval_secs),
                self.cancel_token.child_token(),
            );
        }
    }

    /// Builds the HTTP layer's state from these services.
    pub fn app_state(&self) -> AppState {
        AppState::builder()
            .aggregator(Arc::clone(&self.aggregator))
            .wifi(Arc::clone(&self.wifi))
            .spawner(self.spawner.clone())
            .config(Arc::clone(&self.config))
            .build()
    }

    /// Initiates graceful shutdown of all services.
    pub async fn shutdown(&self) {
        log::info!("[Bootstrap] Beginning graceful shutdown...");

        // Queue the DISCONNECT before cancelling so the event loop can send it.
        self.broker.disconnect();
        tokio::time::sleep(Duration::from_millis(100)).await;

        self.cancel_token.cancel();

        log::info!("[Bootstrap] Shutdown complete");
    }
}

/// Creates the HTTP client used for WiFi device commands.
fn create_http_client(timeout_secs: u64) -> HubResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| HubError::Internal(format!("Failed to create HTTP client: {}", e)))
}

/// Subscribes the Zigbee adapter, running `teardown` if that fails so the
/// already-running broker event loop does not outlive the failed bootstrap.
async fn initialize_zigbee(zigbee: &ZigbeeAdapter, teardown: impl FnOnce()) -> HubResult<()> {
    zigbee.initialize().await.map_err(|e| {
        log::error!("[Bootstrap] Zigbee initialization failed: {}", e);
        teardown();
        HubError::from(e)
    })
}

/// Bootstraps all services with their dependencies.
///
/// Services are created in dependency order:
///
/// 1. Shared infrastructure (spawner, cancellation token, HTTP client)
/// 2. Broker session (waits for the broker to accept the connection)
/// 3. One registry per real adapter, then the adapters themselves
/// 4. Stub adapters and the aggregator
/// 5. Zigbee subscription and initial state request
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the broker cannot be
/// reached, or the initial subscription fails. All are fatal at startup.
pub async fn bootstrap_services(config: &Config) -> HubResult<BootstrappedServices> {
    config.validate().map_err(HubError::Configuration)?;
    let config = Arc::new(config.clone());

    let spawner = TokioSpawner::current();
    let cancel_token = CancellationToken::new();
    let http_client = create_http_client(config.wifi.command_timeout_secs)?;

    let (broker, inbound_rx) = MqttBroker::connect(
        &config.mqtt,
        config.inbound_queue_capacity,
        &spawner,
        cancel_token.child_token(),
    )
    .await
    .map_err(|e| {
        log::error!("[Bootstrap] Broker unavailable ({}): {}", e.code(), e);
        HubError::from(e)
    })?;
    let broker = Arc::new(broker);

    let zigbee = Arc::new(ZigbeeAdapter::new(
        broker.clone(),
        Arc::new(DeviceRegistry::new()),
        &config.mqtt.base_topic,
        inbound_rx,
    ));

    let wifi = Arc::new(WifiAdapter::new(
        Arc::new(CommandDiscovery::from_config(&config.wifi)),
        Arc::new(HttpDeviceTransport::new(
            http_client,
            config.wifi.command_path.clone(),
        )),
        Arc::new(DeviceRegistry::new()),
    ));

    let mut adapters: Vec<Arc<dyn DeviceAdapter>> = vec![
        Arc::clone(&zigbee) as Arc<dyn DeviceAdapter>,
        Arc::clone(&wifi) as Arc<dyn DeviceAdapter>,
    ];
    for protocol in &config.stub_protocols {
        log::info!("[Bootstrap] Registering placeholder adapter for {}", protocol);
        adapters.push(Arc::new(UnsupportedAdapter::new(*protocol)));
    }
    let aggregator = Arc::new(Aggregator::new(adapters, Protocol::Zigbee));

    initialize_zigbee(&zigbee, || {
        broker.disconnect();
        cancel_token.cancel();
    })
    .await?;

    Ok(BootstrappedServices {
        config,
        broker,
        zigbee,
        wifi,
        aggregator,
        spawner,
        cancel_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    use crate::test_fixtures::FakeBroker;

    fn zigbee_over(broker: FakeBroker) -> ZigbeeAdapter {
        let (_tx, rx) = mpsc::channel(1);
        ZigbeeAdapter::new(
            Arc::new(broker),
            Arc::new(DeviceRegistry::new()),
            "zigbee2mqtt",
            rx,
        )
    }

    #[tokio::test]
    async fn failed_zigbee_initialization_cancels_background_work() {
        let zigbee = zigbee_over(FakeBroker::failing());
        let cancel_token = CancellationToken::new();
        let event_loop_token = cancel_token.child_token();

        let result = initialize_zigbee(&zigbee, || cancel_token.cancel()).await;

        assert!(result.is_err());
        assert!(event_loop_token.is_cancelled());
    }

    #[tokio::test]
    async fn successful_zigbee_initialization_leaves_token_alone() {
        let zigbee = zigbee_over(FakeBroker::default());
        let cancel_token = CancellationToken::new();

        initialize_zigbee(&zigbee, || cancel_token.cancel())
            .await
            .unwrap();

        assert!(!cancel_token.is_cancelled());
    }

    #[test]
    fn http_client_builds_with_timeout() {
        let client = create_http_client(5).unwrap();
        assert!(client.post("http://192.168.1.42/api").build().is_ok());
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_before_connecting() {
        let config = Config {
            inbound_queue_capacity: 0,
            ..Default::default()
        };
        let err = bootstrap_services(&config).await.err().unwrap();
        assert!(matches!(err, HubError::Configuration(_)));
    }

    #[tokio::test]
    async fn unreachable_broker_is_fatal() {
        let mut config = Config::default();
        config.mqtt.host = "127.0.0.1".into();
        config.mqtt.port = 1;
        config.mqtt.connect_timeout_secs = 5;

        let err = bootstrap_services(&config).await.err().unwrap();
        assert!(matches!(err, HubError::Adapter(_)));
    }
}
