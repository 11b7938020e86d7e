//! WiFi device adapter.
//!
//! Unlike Zigbee, WiFi state is replaced wholesale: every scan rebuilds the
//! registry from the current neighbour table, so devices that left the
//! network disappear on the next scan.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::arp::parse_output;
use super::discovery::NetworkDiscovery;
use super::transport::DeviceTransport;
use crate::device::{Command, DeviceRecord, Protocol};
use crate::protocols::traits::{AdapterError, AdapterResult, DeviceAdapter, DiscoveryOutcome};
use crate::registry::DeviceRegistry;
use crate::runtime::{TaskSpawner, TokioSpawner};

/// Tracks WiFi devices seen in the neighbour table and forwards commands
/// to them over HTTP.
pub struct WifiAdapter {
    discovery: Arc<dyn NetworkDiscovery>,
    transport: Arc<dyn DeviceTransport>,
    registry: Arc<DeviceRegistry>,
}

impl WifiAdapter {
    pub fn new(
        discovery: Arc<dyn NetworkDiscovery>,
        transport: Arc<dyn DeviceTransport>,
        registry: Arc<DeviceRegistry>,
    ) -> Self {
        Self {
            discovery,
            transport,
            registry,
        }
    }

    /// Returns the registry backing this adapter.
    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Runs discovery and replaces the registry with what it found.
    ///
    /// A failed run is logged and leaves the registry empty. Returns the new
    /// contents keyed by IP address.
    pub async fn scan(&self) -> Vec<(String, DeviceRecord)> {
        let records = match self.discovery.run_discovery().await {
            Ok(output) => parse_output(&output),
            Err(e) => {
                log::warn!("[WiFi] Discovery failed, clearing devices: {}", e);
                Vec::new()
            }
        };

        let count = self.registry.replace_all(records.iter().cloned());
        tracing::debug!(count, "wifi_scan");
        log::info!("[WiFi] Scan found {} device(s)", count);
        records
    }

    /// Spawns a task that rescans every `interval` until cancelled.
    ///
    /// The first tick fires after one full interval.
    pub fn start_periodic_scan(
        self: &Arc<Self>,
        spawner: &TokioSpawner,
        interval: Duration,
        cancel: CancellationToken,
    ) {
        let adapter = Arc::clone(self);
        spawner.spawn(async move {
            log::info!("[WiFi] Periodic scan every {:?}", interval);
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        adapter.scan().await;
                    }
                }
            }
            log::debug!("[WiFi] Periodic scan stopped");
        });
    }
}

#[async_trait]
impl DeviceAdapter for WifiAdapter {
    fn protocol(&self) -> Protocol {
        Protocol::Wifi
    }

    fn list_devices(&self) -> Vec<(String, DeviceRecord)> {
        self.registry
            .snapshot()
            .into_iter()
            .map(|(ip, record)| (Protocol::Wifi.namespaced(&ip), record))
            .collect()
    }

    fn get_device(&self, id: &str) -> Option<DeviceRecord> {
        self.registry.get(id)
    }

    async fn discover(&self) -> AdapterResult<DiscoveryOutcome> {
        Ok(DiscoveryOutcome::Completed(self.scan().await))
    }

    /// `device_id` is the device's IP address; it does not have to be in
    /// the last scan.
    async fn send_command(&self, device_id: &str, command: &Command) -> AdapterResult<()> {
        let address: IpAddr = device_id
            .parse()
            .map_err(|_| AdapterError::InvalidAddress(device_id.to_string()))?;

        self.transport
            .post_command(&address.to_string(), command)
            .await?;
        log::info!("[WiFi] Command sent to {}", address);
        Ok(())
    }
}
