//! Zigbee2MQTT device adapter.
//!
//! Responsibilities:
//! - Subscribing to the bridge's topic tree and asking for a state dump
//! - Draining the inbound queue and merging device state into the registry
//! - Publishing commands to per-device `set` topics

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::broker::{BrokerClient, BrokerMessage};
use super::topics::{is_reserved_id, ZigbeeTopics};
use crate::device::{parse_object, Command, DeviceRecord, Protocol};
use crate::protocols::traits::{AdapterResult, DeviceAdapter, DiscoveryOutcome};
use crate::registry::DeviceRegistry;
use crate::runtime::{TaskSpawner, TokioSpawner};

/// What happened to one inbound broker message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Payload decoded and stored under this device id.
    Stored(String),
    /// Topic is not device state (command echo, bridge chatter, foreign).
    Ignored,
    /// Payload was not a JSON object; dropped.
    Malformed,
}

/// Keeps Zigbee device state in sync with a Zigbee2MQTT bridge.
///
/// State is merged incrementally: each message overwrites one device's
/// record and nothing is ever removed.
pub struct ZigbeeAdapter {
    broker: Arc<dyn BrokerClient>,
    registry: Arc<DeviceRegistry>,
    topics: ZigbeeTopics,
    inbound_rx: Mutex<Option<mpsc::Receiver<BrokerMessage>>>,
}

impl ZigbeeAdapter {
    /// Creates a new adapter.
    ///
    /// # Arguments
    /// * `broker` - Broker session used for subscribe/publish
    /// * `registry` - Registry this adapter owns the writes to
    /// * `base_topic` - Zigbee2MQTT base topic (usually `zigbee2mqtt`)
    /// * `inbound_rx` - Receiving end of the broker's inbound queue
    pub fn new(
        broker: Arc<dyn BrokerClient>,
        registry: Arc<DeviceRegistry>,
        base_topic: &str,
        inbound_rx: mpsc::Receiver<BrokerMessage>,
    ) -> Self {
        Self {
            broker,
            registry,
            topics: ZigbeeTopics::new(base_topic),
            inbound_rx: Mutex::new(Some(inbound_rx)),
        }
    }

    /// Subscribes to every topic under the base and asks the bridge to
    /// republish current device state.
    pub async fn initialize(&self) -> AdapterResult<()> {
        let pattern = self.topics.subscription();
        self.broker.subscribe(&pattern).await?;
        log::info!("[Zigbee] Subscribed to {}", pattern);

        self.request_device_states().await
    }

    /// Returns the registry backing this adapter.
    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Applies one inbound broker message to the registry.
    ///
    /// Never fails: malformed payloads are logged and dropped, leaving the
    /// registry untouched. Identical state republished by a device is
    /// still written.
    pub fn handle_message(&self, topic: &str, payload: &[u8]) -> MessageOutcome {
        let Some(device_id) = self.topics.device_id(topic) else {
            log::trace!("[Zigbee] Ignoring {}", topic);
            return MessageOutcome::Ignored;
        };

        match parse_object(payload) {
            Ok(state) => {
                tracing::debug!(device = device_id, keys = state.len(), "zigbee_state");
                self.registry
                    .set(device_id, DeviceRecord::from_state(state));
                MessageOutcome::Stored(device_id.to_string())
            }
            Err(e) => {
                log::warn!(
                    "[Zigbee] Dropping malformed payload on {} ({} bytes): {}",
                    topic,
                    payload.len(),
                    e
                );
                MessageOutcome::Malformed
            }
        }
    }

    /// Spawns the task that drains the inbound queue.
    ///
    /// Only the first call has an effect; the queue has a single consumer.
    pub fn start_consumer(self: &Arc<Self>, spawner: &TokioSpawner, cancel: CancellationToken) {
        let Some(rx) = self.inbound_rx.lock().take() else {
            log::warn!("[Zigbee] Message consumer already started");
            return;
        };

        let adapter = Arc::clone(self);
        spawner.spawn(async move { adapter.consume(rx, cancel).await });
    }

    async fn consume(&self, mut rx: mpsc::Receiver<BrokerMessage>, cancel: CancellationToken) {
        log::info!("[Zigbee] Message consumer started");
        loop {
            let message = tokio::select! {
                _ = cancel.cancelled() => break,
                message = rx.recv() => message,
            };
            match message {
                Some(message) => {
                    self.handle_message(&message.topic, &message.payload);
                }
                None => {
                    log::info!("[Zigbee] Inbound queue closed");
                    break;
                }
            }
        }
        log::info!("[Zigbee] Message consumer stopped");
    }

    async fn request_device_states(&self) -> AdapterResult<()> {
        let topic = self.topics.state_request_topic();
        self.broker.publish(&topic, b"{}".to_vec()).await?;
        log::info!("[Zigbee] Requested device states on {}", topic);
        Ok(())
    }
}

#[async_trait]
impl DeviceAdapter for ZigbeeAdapter {
    fn protocol(&self) -> Protocol {
        Protocol::Zigbee
    }

    fn list_devices(&self) -> Vec<(String, DeviceRecord)> {
        self.registry
            .snapshot_excluding(is_reserved_id)
            .into_iter()
            .map(|(id, record)| (Protocol::Zigbee.namespaced(&id), record))
            .collect()
    }

    fn get_device(&self, id: &str) -> Option<DeviceRecord> {
        if is_reserved_id(id) {
            return None;
        }
        self.registry.get(id)
    }

    /// Devices answer asynchronously through the normal state topics.
    async fn discover(&self) -> AdapterResult<DiscoveryOutcome> {
        self.request_device_states().await?;
        Ok(DiscoveryOutcome::Started)
    }

    async fn send_command(&self, device_id: &str, command: &Command) -> AdapterResult<()> {
        let payload = serde_json::to_vec(command)?;
        let topic = self.topics.command_topic(device_id);
        self.broker.publish(&topic, payload).await?;
        log::info!("[Zigbee] Command published to {}", topic);
        Ok(())
    }
}
