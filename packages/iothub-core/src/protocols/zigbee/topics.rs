//! Zigbee2MQTT topic layout.
//!
//! Device state arrives on `<base>/<device>`; commands go to
//! `<base>/<device>/set`; the bridge talks on `<base>/bridge/...`.

use crate::protocol_constants::{BRIDGE_TOPIC_PREFIX, COMMAND_TOPIC_SUFFIX, DEVICE_STATE_REQUEST};

/// Returns true for ids that are never device state: our own command
/// echoes (`.../set`) and bridge-internal chatter (`bridge/...`).
#[must_use]
pub fn is_reserved_id(id: &str) -> bool {
    id.ends_with(COMMAND_TOPIC_SUFFIX) || id.starts_with(BRIDGE_TOPIC_PREFIX)
}

/// Topic builder and parser for one Zigbee2MQTT base topic.
#[derive(Debug, Clone)]
pub struct ZigbeeTopics {
    /// Base topic with a trailing `/`.
    prefix: String,
}

impl ZigbeeTopics {
    pub fn new(base: &str) -> Self {
        Self {
            prefix: format!("{}/", base.trim_end_matches('/')),
        }
    }

    /// Wildcard covering every topic under the base.
    #[must_use]
    pub fn subscription(&self) -> String {
        format!("{}#", self.prefix)
    }

    /// Per-device command topic.
    #[must_use]
    pub fn command_topic(&self, device_id: &str) -> String {
        format!("{}{}{}", self.prefix, device_id, COMMAND_TOPIC_SUFFIX)
    }

    /// Topic the bridge listens on for "republish all device state".
    #[must_use]
    pub fn state_request_topic(&self) -> String {
        format!("{}{}", self.prefix, DEVICE_STATE_REQUEST)
    }

    /// Derives the device id a state message belongs to.
    ///
    /// Returns `None` for topics outside the base, for an empty id and for
    /// reserved ids.
    #[must_use]
    pub fn device_id<'a>(&self, topic: &'a str) -> Option<&'a str> {
        topic
            .strip_prefix(&self.prefix)
            .filter(|id| !id.is_empty() && !is_reserved_id(id))
    }
}
