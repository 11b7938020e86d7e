//! The adapter contract shared by every protocol.
//!
//! The aggregator and HTTP layer depend on [`DeviceAdapter`] trait objects
//! rather than concrete adapters, which keeps them testable with fakes.

use async_trait::async_trait;
use thiserror::Error;

use crate::device::{Command, DeviceRecord, Protocol};
use crate::protocols::wifi::{DiscoveryError, TransportError};
use crate::protocols::zigbee::BrokerError;

/// Errors surfaced by adapter operations.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Command could not be serialized.
    #[error("failed to encode command: {0}")]
    Encode(#[from] serde_json::Error),

    /// Target address is not something the adapter can reach.
    #[error("invalid device address: {0}")]
    InvalidAddress(String),

    #[error("{0} devices are not supported yet")]
    Unsupported(Protocol),
}

/// Convenient Result alias for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Result of asking an adapter to discover devices.
#[derive(Debug, Clone, PartialEq)]
pub enum DiscoveryOutcome {
    /// Discovery was requested; devices report back asynchronously.
    Started,
    /// Discovery ran to completion and found these devices (raw ids).
    Completed(Vec<(String, DeviceRecord)>),
}

/// A protocol-specific device adapter.
///
/// # Command delivery
///
/// [`send_command`](DeviceAdapter::send_command) is fire-and-forget.
/// `Ok(())` means the transport accepted the command (the broker client
/// queued the publish, or the device answered the POST with a success
/// status). It never means the device executed it, and no ordering is
/// promised between successive commands to the same device beyond what
/// the transport itself provides.
#[async_trait]
pub trait DeviceAdapter: Send + Sync {
    /// Protocol served by this adapter; also decides its id namespace.
    fn protocol(&self) -> Protocol;

    /// Every known device, with ids namespaced by [`Protocol::prefix`].
    fn list_devices(&self) -> Vec<(String, DeviceRecord)>;

    /// Looks up one device by its raw (un-namespaced) id.
    fn get_device(&self, id: &str) -> Option<DeviceRecord>;

    /// Triggers protocol-specific discovery.
    async fn discover(&self) -> AdapterResult<DiscoveryOutcome>;

    /// Sends `command` to the device with raw id `device_id`.
    ///
    /// Does not check that the device is known.
    async fn send_command(&self, device_id: &str, command: &Command) -> AdapterResult<()>;
}
