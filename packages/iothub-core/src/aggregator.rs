//! Cross-protocol view over every registered adapter.
//!
//! Device ids are namespaced by protocol prefix (`zigbee_`, `wifi_`, ...)
//! so that two adapters reporting the same raw id never collide.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;

use crate::device::{DeviceRecord, Protocol};
use crate::protocols::{AdapterResult, DeviceAdapter, DiscoveryOutcome};

/// Fans reads and discovery out to every adapter and routes per-device
/// requests to the adapter owning the id.
pub struct Aggregator {
    adapters: Vec<Arc<dyn DeviceAdapter>>,
    default_protocol: Protocol,
}

impl Aggregator {
    /// Creates an aggregator over `adapters`, in aggregation order.
    ///
    /// Ids without a known prefix are routed to the `default_protocol`
    /// adapter.
    pub fn new(adapters: Vec<Arc<dyn DeviceAdapter>>, default_protocol: Protocol) -> Self {
        Self {
            adapters,
            default_protocol,
        }
    }

    /// Protocols with a registered adapter, in aggregation order.
    pub fn protocols(&self) -> Vec<Protocol> {
        self.adapters.iter().map(|a| a.protocol()).collect()
    }

    /// Looks up the adapter for `protocol`.
    pub fn adapter(&self, protocol: Protocol) -> Option<Arc<dyn DeviceAdapter>> {
        self.adapters
            .iter()
            .find(|a| a.protocol() == protocol)
            .cloned()
    }

    /// Every device from every adapter, keyed by namespaced id.
    ///
    /// On a key collision the later adapter wins.
    pub fn collect_all(&self) -> BTreeMap<String, DeviceRecord> {
        self.adapters
            .iter()
            .flat_map(|a| a.list_devices())
            .collect()
    }

    /// Picks the adapter for a device id and the raw id to hand it.
    ///
    /// An id carrying a registered protocol's prefix goes to that adapter
    /// with the prefix removed. Any other id goes to the default adapter
    /// unchanged.
    pub fn resolve_command_target<'a>(
        &self,
        id: &'a str,
    ) -> Option<(Arc<dyn DeviceAdapter>, &'a str)> {
        for adapter in &self.adapters {
            if let Some(raw) = adapter.protocol().strip_namespace(id) {
                return Some((Arc::clone(adapter), raw));
            }
        }
        self.adapter(self.default_protocol).map(|a| (a, id))
    }

    /// Looks up a device by id, routed the same way as commands.
    pub fn get_device(&self, id: &str) -> Option<DeviceRecord> {
        let (adapter, raw) = self.resolve_command_target(id)?;
        adapter.get_device(raw)
    }

    /// Runs discovery on every adapter concurrently.
    ///
    /// Failures are logged and reported per protocol; one adapter failing
    /// does not stop the others.
    pub async fn discover_all(&self) -> Vec<(Protocol, AdapterResult<DiscoveryOutcome>)> {
        let runs = self.adapters.iter().map(|adapter| async move {
            let protocol = adapter.protocol();
            let result = adapter.discover().await;
            if let Err(e) = &result {
                log::warn!("[Aggregator] {} discovery failed: {}", protocol, e);
            }
            (protocol, result)
        });
        join_all(runs).await
    }
}
