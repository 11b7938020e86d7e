//! Placeholder adapters for protocols the hub does not speak yet.

use async_trait::async_trait;

use super::traits::{AdapterError, AdapterResult, DeviceAdapter, DiscoveryOutcome};
use crate::device::{Command, DeviceRecord, Protocol};

/// Adapter that knows no devices and rejects every command.
///
/// Registering one reserves the protocol's namespace so ids such as
/// `zwave_3` route here (and fail clearly) instead of falling through to
/// the default command adapter.
#[derive(Debug, Clone, Copy)]
pub struct UnsupportedAdapter {
    protocol: Protocol,
}

impl UnsupportedAdapter {
    #[must_use]
    pub fn new(protocol: Protocol) -> Self {
        Self { protocol }
    }
}

#[async_trait]
impl DeviceAdapter for UnsupportedAdapter {
    fn protocol(&self) -> Protocol {
        self.protocol
    }

    fn list_devices(&self) -> Vec<(String, DeviceRecord)> {
        Vec::new()
    }

    fn get_device(&self, _id: &str) -> Option<DeviceRecord> {
        None
    }

    async fn discover(&self) -> AdapterResult<DiscoveryOutcome> {
        Ok(DiscoveryOutcome::Completed(Vec::new()))
    }

    async fn send_command(&self, device_id: &str, _command: &Command) -> AdapterResult<()> {
        log::debug!(
            "[{}] Rejecting command for {}: no adapter",
            self.protocol,
            device_id
        );
        Err(AdapterError::Unsupported(self.protocol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_lists_nothing_and_rejects_commands() {
        let adapter = UnsupportedAdapter::new(Protocol::Ble);
        assert!(adapter.list_devices().is_empty());
        assert_eq!(
            adapter.discover().await.unwrap(),
            DiscoveryOutcome::Completed(Vec::new())
        );

        let err = adapter
            .send_command("tag-1", &Command::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Unsupported(Protocol::Ble)));
        assert_eq!(err.to_string(), "BLE devices are not supported yet");
    }
}
