//! Fixed protocol constants that should NOT be changed.
//!
//! These values are defined by external conventions (Zigbee2MQTT topic
//! layout, the WiFi device HTTP API) and changing them would break
//! compatibility with the devices and bridges on the network.

// ─────────────────────────────────────────────────────────────────────────────
// Zigbee2MQTT
// ─────────────────────────────────────────────────────────────────────────────

/// Default base topic used by Zigbee2MQTT.
pub const ZIGBEE_BASE_TOPIC: &str = "zigbee2mqtt";

/// Suffix of per-device command topics (`<base>/<device>/set`).
///
/// Messages on these topics are our own outbound commands echoed back
/// through the wildcard subscription, never device state.
pub const COMMAND_TOPIC_SUFFIX: &str = "/set";

/// Prefix of bridge-internal topics under the base topic.
pub const BRIDGE_TOPIC_PREFIX: &str = "bridge/";

/// Bridge request asking every device to republish its current state.
pub const DEVICE_STATE_REQUEST: &str = "bridge/request/device_state";

// ─────────────────────────────────────────────────────────────────────────────
// WiFi devices
// ─────────────────────────────────────────────────────────────────────────────

/// Path of the HTTP endpoint WiFi devices accept commands on.
pub const WIFI_COMMAND_PATH: &str = "/api";

/// Placeholder `arp -a` prints when it cannot resolve a hostname.
pub const ARP_UNKNOWN_HOSTNAME: &str = "?";

// ─────────────────────────────────────────────────────────────────────────────
// Application Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Service identifier reported by the health endpoint.
pub const SERVICE_ID: &str = "iothub";

/// Maximum accepted size of a command request body (bytes).
pub const MAX_COMMAND_BODY_SIZE: usize = 64 * 1024;
