//! MQTT broker capability.
//!
//! The Zigbee adapter only needs two things from a broker: accept
//! subscribe/publish requests, and deliver inbound messages. Inbound
//! messages are not delivered through a callback; the broker pushes them
//! onto a bounded queue that the adapter drains from its own task.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::state::MqttConfig;

/// Capacity of rumqttc's internal request channel.
const REQUEST_CHANNEL_CAPACITY: usize = 64;

/// Pause after a connection error before polling again (rumqttc
/// reconnects on the next poll).
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Errors that can occur talking to the broker.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Could not reach the broker.
    #[error("MQTT connection failed: {0}")]
    Connect(String),

    /// Broker answered the CONNECT with a refusal.
    #[error("MQTT broker refused connection: {0}")]
    Rejected(String),

    #[error("MQTT broker did not acknowledge connection within {0}s")]
    ConnectTimeout(u64),

    #[error("failed to subscribe to {pattern}: {reason}")]
    Subscribe { pattern: String, reason: String },

    #[error("failed to publish to {topic}: {reason}")]
    Publish { topic: String, reason: String },
}

/// Convenient Result alias for broker operations.
pub type BrokerResult<T> = Result<T, BrokerError>;

/// One message delivered by the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerMessage {
    pub topic: String,
    pub payload: Bytes,
}

impl BrokerMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Outbound half of a broker session.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Queues a subscription to a topic pattern (MQTT wildcards allowed).
    ///
    /// Subscriptions survive reconnects.
    async fn subscribe(&self, pattern: &str) -> BrokerResult<()>;

    /// Queues a publish without waiting for the network.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> BrokerResult<()>;
}

/// `rumqttc`-backed broker session.
pub struct MqttBroker {
    client: AsyncClient,
    /// Patterns to re-issue after every reconnect (clean sessions forget them).
    subscriptions: Arc<Mutex<Vec<String>>>,
}

impl MqttBroker {
    /// Connects to the broker and starts the event loop task.
    ///
    /// Waits for the broker's CONNACK before returning, so a broker that is
    /// down or refuses us fails here rather than later. After that, the
    /// event loop keeps reconnecting on its own.
    ///
    /// Returns the session and the receiving end of the inbound queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the broker cannot be reached, refuses the
    /// connection, or does not answer within the configured timeout.
    pub async fn connect(
        config: &MqttConfig,
        inbound_capacity: usize,
        spawner: &TokioSpawner,
        cancel: CancellationToken,
    ) -> BrokerResult<(Self, mpsc::Receiver<BrokerMessage>)> {
        let client_id = config
            .client_id
            .clone()
            .unwrap_or_else(|| format!("iothub-{}", Uuid::new_v4().simple()));

        let mut options = MqttOptions::new(client_id.clone(), config.host.clone(), config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
        options.set_clean_session(true);
        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            options.set_credentials(user.clone(), pass.clone());
        }

        log::info!(
            "[MQTT] Connecting to {}:{} as {}",
            config.host,
            config.port,
            client_id
        );

        let (client, mut eventloop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);

        let timeout_secs = config.connect_timeout_secs;
        tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            wait_for_connack(&mut eventloop),
        )
        .await
        .map_err(|_| BrokerError::ConnectTimeout(timeout_secs))??;

        log::info!("[MQTT] Connected to {}:{}", config.host, config.port);

        let (tx, rx) = mpsc::channel(inbound_capacity);
        let subscriptions = Arc::new(Mutex::new(Vec::new()));

        spawner.spawn(run_event_loop(
            eventloop,
            client.clone(),
            Arc::clone(&subscriptions),
            tx,
            cancel,
        ));

        Ok((
            Self {
                client,
                subscriptions,
            },
            rx,
        ))
    }

    /// Sends a DISCONNECT; the event loop task exits once it goes out.
    pub fn disconnect(&self) {
        if let Err(e) = self.client.try_disconnect() {
            log::debug!("[MQTT] Disconnect request not queued: {}", e);
        }
    }
}

#[async_trait]
impl BrokerClient for MqttBroker {
    async fn subscribe(&self, pattern: &str) -> BrokerResult<()> {
        self.client
            .try_subscribe(pattern, QoS::AtMostOnce)
            .map_err(|e| BrokerError::Subscribe {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;

        let mut subscriptions = self.subscriptions.lock();
        if !subscriptions.iter().any(|p| p == pattern) {
            subscriptions.push(pattern.to_string());
        }
        Ok(())
    }

    /// Fails instead of waiting when the request channel is full, which
    /// happens while the event loop is reconnecting.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> BrokerResult<()> {
        self.client
            .try_publish(topic, QoS::AtMostOnce, false, payload)
            .map_err(|e| BrokerError::Publish {
                topic: topic.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Polls until the broker acknowledges the CONNECT.
async fn wait_for_connack(eventloop: &mut EventLoop) -> BrokerResult<()> {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                return if ack.code == ConnectReturnCode::Success {
                    Ok(())
                } else {
                    Err(BrokerError::Rejected(format!("{:?}", ack.code)))
                };
            }
            Ok(_) => continue,
            Err(e) => return Err(BrokerError::Connect(e.to_string())),
        }
    }
}

/// What the event loop does after handling one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopControl {
    Continue,
    Stop,
}

/// Drives the rumqttc event loop for the lifetime of the session.
///
/// Connection errors are logged and the loop keeps polling, which makes
/// rumqttc reconnect.
async fn run_event_loop(
    mut eventloop: EventLoop,
    client: AsyncClient,
    subscriptions: Arc<Mutex<Vec<String>>>,
    tx: mpsc::Sender<BrokerMessage>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = eventloop.poll() => event,
        };

        match event {
            Ok(event) => {
                let control = handle_event(event, &client, &subscriptions, &tx, &cancel).await;
                if control == LoopControl::Stop {
                    break;
                }
            }
            Err(e) => {
                log::warn!(
                    "[MQTT] Connection error: {} (retrying in {:?})",
                    e,
                    RECONNECT_DELAY
                );
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                }
            }
        }
    }
    log::debug!("[MQTT] Event loop task exited");
}

/// Handles one event from a connected session.
///
/// Inbound publishes go onto the bounded queue, waiting for room when it is
/// full. Every CONNACK seen here follows a reconnect (the first one is
/// consumed by `connect`) and re-issues subscriptions.
async fn handle_event(
    event: Event,
    client: &AsyncClient,
    subscriptions: &Mutex<Vec<String>>,
    tx: &mpsc::Sender<BrokerMessage>,
    cancel: &CancellationToken,
) -> LoopControl {
    match event {
        Event::Incoming(Packet::Publish(publish)) => {
            let message = BrokerMessage::new(publish.topic, publish.payload);
            tokio::select! {
                _ = cancel.cancelled() => LoopControl::Stop,
                sent = tx.send(message) => {
                    if sent.is_err() {
                        log::info!("[MQTT] Inbound queue closed, stopping event loop");
                        LoopControl::Stop
                    } else {
                        LoopControl::Continue
                    }
                }
            }
        }
        Event::Incoming(Packet::ConnAck(_)) => {
            log::info!("[MQTT] Reconnected to broker");
            resubscribe(client, subscriptions);
            LoopControl::Continue
        }
        Event::Outgoing(Outgoing::Disconnect) => {
            log::info!("[MQTT] Disconnected from broker");
            LoopControl::Stop
        }
        _ => LoopControl::Continue,
    }
}

/// Re-issues remembered subscriptions without awaiting: this runs on the
/// task that drains the request channel, so awaiting could deadlock.
///
/// Returns how many were queued.
fn resubscribe(client: &AsyncClient, subscriptions: &Mutex<Vec<String>>) -> usize {
    let mut queued = 0;
    for pattern in subscriptions.lock().iter() {
        match client.try_subscribe(pattern.clone(), QoS::AtMostOnce) {
            Ok(()) => {
                log::info!("[MQTT] Re-subscribed to {}", pattern);
                queued += 1;
            }
            Err(e) => log::warn!("[MQTT] Failed to re-subscribe to {}: {}", pattern, e),
        }
    }
    queued
}
