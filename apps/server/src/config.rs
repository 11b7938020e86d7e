//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::Path;

use anyhow::{Context, Result};
use iothub_core::{MqttConfig, Protocol, WifiConfig};
use serde::Deserialize;

/// Server configuration loaded from YAML with environment overrides.
///
/// ```yaml
/// bind_port: 3000
/// mqtt:
///   host: broker.lan
///   base_topic: zigbee2mqtt
/// wifi:
///   scan_interval_secs: 300
/// stub_protocols: [zwave, matter, ble]
/// ```
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to bind the HTTP server to.
    /// Override: `IOTHUB_BIND_PORT`
    pub bind_port: u16,

    /// Broker connection for the Zigbee adapter.
    /// Overrides: `IOTHUB_MQTT_HOST`, `IOTHUB_MQTT_PORT`,
    /// `IOTHUB_MQTT_USERNAME`, `IOTHUB_MQTT_PASSWORD`, `IOTHUB_MQTT_BASE_TOPIC`
    pub mqtt: MqttConfig,

    /// WiFi discovery and command settings.
    /// Override: `IOTHUB_WIFI_SCAN_INTERVAL`
    pub wifi: WifiConfig,

    /// Capacity of the broker-to-adapter message queue.
    pub inbound_queue_capacity: usize,

    /// Protocols to register as placeholders.
    pub stub_protocols: Vec<Protocol>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let core = iothub_core::Config::default();
        Self {
            bind_port: core.preferred_port,
            mqtt: core.mqtt,
            wifi: core.wifi,
            inbound_queue_capacity: core.inbound_queue_capacity,
            stub_protocols: vec![Protocol::ZWave, Protocol::Matter, Protocol::Ble],
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies `IOTHUB_*` overrides looked up through `lookup`.
    ///
    /// Values that fail to parse are ignored with a warning.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(port) = parsed(&lookup, "IOTHUB_BIND_PORT") {
            self.bind_port = port;
        }
        if let Some(host) = lookup("IOTHUB_MQTT_HOST") {
            self.mqtt.host = host;
        }
        if let Some(port) = parsed(&lookup, "IOTHUB_MQTT_PORT") {
            self.mqtt.port = port;
        }
        if let Some(user) = lookup("IOTHUB_MQTT_USERNAME") {
            self.mqtt.username = Some(user);
        }
        if let Some(pass) = lookup("IOTHUB_MQTT_PASSWORD") {
            self.mqtt.password = Some(pass);
        }
        if let Some(topic) = lookup("IOTHUB_MQTT_BASE_TOPIC") {
            self.mqtt.base_topic = topic;
        }
        if let Some(interval) = parsed(&lookup, "IOTHUB_WIFI_SCAN_INTERVAL") {
            self.wifi.scan_interval_secs = interval;
        }
    }

    /// Converts to iothub-core's Config type.
    pub fn to_core_config(&self) -> iothub_core::Config {
        iothub_core::Config {
            preferred_port: self.bind_port,
            mqtt: self.mqtt.clone(),
            inbound_queue_capacity: self.inbound_queue_capacity,
            wifi: self.wifi.clone(),
            stub_protocols: self.stub_protocols.clone(),
        }
    }
}

fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("Ignoring {}={:?}: not a valid value", key, raw);
            None
        }
    }
}
