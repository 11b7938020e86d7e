//! Core configuration types.
//!
//! [`Config`] is built by the host binary (from YAML, environment and CLI)
//! and handed to [`bootstrap_services`](crate::bootstrap::bootstrap_services).

use serde::{Deserialize, Serialize};

use crate::device::Protocol;
use crate::protocol_constants::{WIFI_COMMAND_PATH, ZIGBEE_BASE_TOPIC};

/// Connection settings for the MQTT broker behind the Zigbee adapter.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker host name or address.
    pub host: String,

    /// Broker TCP port.
    pub port: u16,

    /// MQTT client id. Generated per process when not set.
    pub client_id: Option<String>,

    pub username: Option<String>,
    pub password: Option<String>,

    /// Keep-alive interval (seconds).
    pub keep_alive_secs: u64,

    /// How long to wait for the initial CONNACK before giving up (seconds).
    pub connect_timeout_secs: u64,

    /// Zigbee2MQTT base topic.
    pub base_topic: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: None,
            username: None,
            password: None,
            keep_alive_secs: 30,
            connect_timeout_secs: 10,
            base_topic: ZIGBEE_BASE_TOPIC.to_string(),
        }
    }
}

/// Settings for WiFi device discovery and control.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct WifiConfig {
    /// Program that dumps the address-resolution cache.
    pub discovery_program: String,

    /// Arguments passed to `discovery_program`.
    pub discovery_args: Vec<String>,

    /// Upper bound on a single discovery run (seconds).
    pub discovery_timeout_secs: u64,

    /// Upper bound on a single command POST (seconds).
    pub command_timeout_secs: u64,

    /// HTTP path commands are POSTed to on each device.
    pub command_path: String,

    /// Interval between background scans (seconds, 0 = disabled).
    pub scan_interval_secs: u64,

    /// Run one scan as soon as background tasks start.
    pub scan_on_startup: bool,
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            discovery_program: "arp".to_string(),
            discovery_args: vec!["-a".to_string()],
            discovery_timeout_secs: 10,
            command_timeout_secs: 5,
            command_path: WIFI_COMMAND_PATH.to_string(),
            scan_interval_secs: 0,
            scan_on_startup: true,
        }
    }
}

/// Configuration for the IoT hub.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    // Server
    /// Port for the HTTP API.
    pub preferred_port: u16,

    // Zigbee
    pub mqtt: MqttConfig,

    /// Capacity of the queue between the broker event loop and the Zigbee
    /// adapter. When full, the event loop waits for the adapter to catch up.
    pub inbound_queue_capacity: usize,

    // WiFi
    pub wifi: WifiConfig,

    /// Protocols registered as placeholder adapters (no real support yet).
    pub stub_protocols: Vec<Protocol>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preferred_port: 3000,
            mqtt: MqttConfig::default(),
            inbound_queue_capacity: 256,
            wifi: WifiConfig::default(),
            stub_protocols: Vec::new(),
        }
    }
}

impl Config {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.inbound_queue_capacity == 0 {
            return Err("inbound_queue_capacity must be >= 1 (mpsc::channel panics on 0)".into());
        }
        if self.mqtt.base_topic.is_empty() || self.mqtt.base_topic.contains(['#', '+']) {
            return Err("mqtt.base_topic must be a non-empty topic without wildcards".into());
        }
        if self.mqtt.connect_timeout_secs == 0 {
            return Err("mqtt.connect_timeout_secs must be >= 1".into());
        }
        if self.wifi.discovery_timeout_secs == 0 || self.wifi.command_timeout_secs == 0 {
            return Err("wifi timeouts must be >= 1 second".into());
        }
        if self.wifi.discovery_program.is_empty() {
            return Err("wifi.discovery_program must not be empty".into());
        }
        if !self.wifi.command_path.starts_with('/') {
            return Err("wifi.command_path must start with '/'".into());
        }
        if let Some(p) = self
            .stub_protocols
            .iter()
            .find(|p| matches!(p, Protocol::Zigbee | Protocol::Wifi))
        {
            return Err(format!("{} has a real adapter and cannot be stubbed", p));
        }
        Ok(())
    }
}
