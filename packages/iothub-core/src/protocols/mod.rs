//! Protocol adapters.
//!
//! Each adapter translates one transport's native messages into
//! [`DeviceRecord`](crate::device::DeviceRecord)s and turns commands back
//! into transport requests.
//!
//! # Module Structure
//!
//! - `traits` - The [`DeviceAdapter`] contract and adapter error type
//! - `zigbee` - Zigbee2MQTT adapter and the MQTT broker capability
//! - `wifi` - ARP-scan discovery and direct HTTP command adapter
//! - `stub` - Placeholder adapters for protocols without support yet

pub mod stub;
pub mod traits;
pub mod wifi;
pub mod zigbee;

pub use stub::UnsupportedAdapter;
pub use traits::{AdapterError, AdapterResult, DeviceAdapter, DiscoveryOutcome};
