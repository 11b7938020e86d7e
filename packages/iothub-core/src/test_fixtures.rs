//! Hand-written fakes for the capability traits, shared by test modules.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::device::Command;
use crate::protocols::wifi::{
    DeviceTransport, DiscoveryError, DiscoveryResult, NetworkDiscovery, TransportError,
    TransportResult,
};
use crate::protocols::zigbee::{BrokerClient, BrokerError, BrokerResult};

/// Broker that records subscribe/publish calls.
#[derive(Default)]
pub struct FakeBroker {
    failing: bool,
    subscriptions: Mutex<Vec<String>>,
    published: Mutex<Vec<(String, Vec<u8>)>>,
}

impl FakeBroker {
    /// A broker whose subscribe and publish always fail.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.lock().clone()
    }

    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published.lock().clone()
    }
}

#[async_trait]
impl BrokerClient for FakeBroker {
    async fn subscribe(&self, pattern: &str) -> BrokerResult<()> {
        if self.failing {
            return Err(BrokerError::Subscribe {
                pattern: pattern.to_string(),
                reason: "fake broker offline".into(),
            });
        }
        self.subscriptions.lock().push(pattern.to_string());
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> BrokerResult<()> {
        if self.failing {
            return Err(BrokerError::Publish {
                topic: topic.to_string(),
                reason: "fake broker offline".into(),
            });
        }
        self.published.lock().push((topic.to_string(), payload));
        Ok(())
    }
}

/// Discovery that returns canned output (or fails) and counts runs.
pub struct FakeDiscovery {
    output: Option<String>,
    runs: Arc<AtomicUsize>,
}

impl FakeDiscovery {
    pub fn output(text: &str) -> Self {
        Self {
            output: Some(text.to_string()),
            runs: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            output: None,
            runs: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared run counter; stays valid after the fake is moved.
    pub fn runs(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.runs)
    }
}

#[async_trait]
impl NetworkDiscovery for FakeDiscovery {
    async fn run_discovery(&self) -> DiscoveryResult<String> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        match &self.output {
            Some(text) => Ok(text.clone()),
            None => Err(DiscoveryError::Exit {
                status: "exit status: 1".into(),
                stderr: "arp: permission denied".into(),
            }),
        }
    }
}

/// Transport that records posted commands, or answers with a fixed
/// failure status.
#[derive(Default)]
pub struct FakeTransport {
    fail_status: Option<u16>,
    posts: Mutex<Vec<(String, Command)>>,
}

impl FakeTransport {
    pub fn failing_with_status(status: u16) -> Self {
        Self {
            fail_status: Some(status),
            ..Default::default()
        }
    }

    pub fn posts(&self) -> Vec<(String, Command)> {
        self.posts.lock().clone()
    }
}

#[async_trait]
impl DeviceTransport for FakeTransport {
    async fn post_command(&self, address: &str, command: &Command) -> TransportResult<()> {
        if let Some(status) = self.fail_status {
            return Err(TransportError::Status {
                address: address.to_string(),
                status,
            });
        }
        self.posts
            .lock()
            .push((address.to_string(), command.clone()));
        Ok(())
    }
}
