//! IoT Hub Core - device registry, protocol adapters and HTTP API.
//!
//! The hub unifies devices that speak different protocols behind one HTTP
//! API. Each protocol adapter keeps its own registry of device records;
//! the aggregator namespaces their ids and routes requests back to the
//! owning adapter.
//!
//! # Architecture
//!
//! - [`device`]: Device records, commands and protocol namespaces
//! - [`registry`]: Thread-safe device registry
//! - [`protocols`]: Zigbee2MQTT and WiFi adapters, plus placeholders
//! - [`aggregator`]: Cross-protocol view and command routing
//! - [`api`]: HTTP routes and server startup
//! - [`bootstrap`]: Composition root and lifecycle
//! - [`state`]: Configuration
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! External systems sit behind traits so adapters can be tested with fakes:
//!
//! - [`BrokerClient`](protocols::zigbee::BrokerClient): MQTT subscribe/publish
//! - [`NetworkDiscovery`](protocols::wifi::NetworkDiscovery): Neighbour table dump
//! - [`DeviceTransport`](protocols::wifi::DeviceTransport): HTTP command delivery
//! - [`TaskSpawner`](runtime::TaskSpawner): Spawning background tasks

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod aggregator;
pub mod api;
pub mod bootstrap;
pub mod device;
pub mod error;
pub mod protocol_constants;
pub mod protocols;
pub mod registry;
pub mod runtime;
pub mod state;

#[cfg(test)]
mod test_fixtures;

// Re-export commonly used types at the crate root
pub use aggregator::Aggregator;
pub use device::{Command, DeviceMetadata, DeviceRecord, DeviceState, Protocol};
pub use error::{ErrorCode, HubError, HubResult};
pub use registry::DeviceRegistry;
pub use runtime::{TaskSpawner, TokioSpawner};
pub use state::{Config, MqttConfig, WifiConfig};

// Re-export protocol types
pub use protocols::wifi::WifiAdapter;
pub use protocols::zigbee::{MqttBroker, ZigbeeAdapter};
pub use protocols::{AdapterError, DeviceAdapter, DiscoveryOutcome, UnsupportedAdapter};

// Re-export bootstrap types
pub use bootstrap::{bootstrap_services, BootstrappedServices};

// Re-export API types
pub use api::{start_server, AppState, AppStateBuilder, ServerError};
