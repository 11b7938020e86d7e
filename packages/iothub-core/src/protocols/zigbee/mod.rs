//! Zigbee devices via a Zigbee2MQTT bridge.
//!
//! - `broker` - MQTT broker capability and its `rumqttc` implementation
//! - `topics` - Zigbee2MQTT topic layout and reserved-id rules
//! - `adapter` - [`ZigbeeAdapter`], which keeps device state in sync

mod adapter;
pub mod broker;
pub mod topics;

pub use adapter::{MessageOutcome, ZigbeeAdapter};
pub use broker::{BrokerClient, BrokerError, BrokerMessage, BrokerResult, MqttBroker};
pub use topics::{is_reserved_id, ZigbeeTopics};
