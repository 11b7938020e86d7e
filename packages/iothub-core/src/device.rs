//! Device data model shared by every protocol adapter.
//!
//! Device state and commands are untyped JSON objects: payload shape is
//! decided by the device (or the bridge in front of it), not by the hub.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Arbitrary structured state reported by a device.
pub type DeviceState = Map<String, Value>;

/// Arbitrary structured command sent to a device.
pub type Command = Map<String, Value>;

/// Protocols the hub knows how to namespace.
///
/// Only Zigbee and WiFi have working adapters; the others are registered
/// as stubs so their namespaces are reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Zigbee,
    Wifi,
    #[serde(rename = "zwave")]
    ZWave,
    Matter,
    Ble,
}

impl Protocol {
    /// Every protocol, in aggregation order.
    pub const ALL: [Protocol; 5] = [
        Protocol::Zigbee,
        Protocol::Wifi,
        Protocol::ZWave,
        Protocol::Matter,
        Protocol::Ble,
    ];

    /// Short lowercase identifier, also used as the URL slug.
    #[must_use]
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Zigbee => "zigbee",
            Self::Wifi => "wifi",
            Self::ZWave => "zwave",
            Self::Matter => "matter",
            Self::Ble => "ble",
        }
    }

    /// Prefix applied to device ids from this protocol in aggregated views.
    #[must_use]
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Zigbee => "zigbee_",
            Self::Wifi => "wifi_",
            Self::ZWave => "zwave_",
            Self::Matter => "matter_",
            Self::Ble => "ble_",
        }
    }

    /// Returns `id` with this protocol's prefix applied.
    #[must_use]
    pub fn namespaced(&self, id: &str) -> String {
        format!("{}{}", self.prefix(), id)
    }

    /// Strips this protocol's prefix, returning `None` if `id` is not ours.
    #[must_use]
    pub fn strip_namespace<'a>(&self, id: &'a str) -> Option<&'a str> {
        id.strip_prefix(self.prefix())
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zigbee => write!(f, "Zigbee"),
            Self::Wifi => write!(f, "WiFi"),
            Self::ZWave => write!(f, "Z-Wave"),
            Self::Matter => write!(f, "Matter"),
            Self::Ble => write!(f, "BLE"),
        }
    }
}

/// Network-level facts about a device, when the adapter knows them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceMetadata {
    /// Network (IP) address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    /// Hardware (MAC) address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

/// Everything the hub knows about one device.
///
/// Serializes flat: metadata fields first, then the state keys. A record
/// with no metadata serializes as exactly the device's reported state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceRecord {
    #[serde(flatten)]
    pub metadata: Option<DeviceMetadata>,
    #[serde(flatten)]
    pub state: DeviceState,
}

impl DeviceRecord {
    /// Creates a record holding only reported state.
    #[must_use]
    pub fn from_state(state: DeviceState) -> Self {
        Self {
            metadata: None,
            state,
        }
    }

    /// Creates a record holding only network metadata.
    #[must_use]
    pub fn from_metadata(metadata: DeviceMetadata) -> Self {
        Self {
            metadata: Some(metadata),
            state: DeviceState::new(),
        }
    }
}

/// Parses a request body or broker payload as a JSON object.
///
/// Anything other than a JSON object (arrays, scalars, invalid JSON) is
/// rejected, matching what devices and bridges are expected to send.
pub fn parse_object(bytes: &[u8]) -> Result<Map<String, Value>, serde_json::Error> {
    serde_json::from_slice(bytes)
}
