//! WiFi devices found by scanning the local address-resolution cache.
//!
//! - `discovery` - Runs the discovery command (`arp -a` by default)
//! - `arp` - Parses its output into device records
//! - `transport` - Direct HTTP command delivery to devices
//! - `adapter` - [`WifiAdapter`], full-replace scan semantics

mod adapter;
pub mod arp;
pub mod discovery;
pub mod transport;

pub use adapter::WifiAdapter;
pub use discovery::{CommandDiscovery, DiscoveryError, DiscoveryResult, NetworkDiscovery};
pub use transport::{DeviceTransport, HttpDeviceTransport, TransportError, TransportResult};
