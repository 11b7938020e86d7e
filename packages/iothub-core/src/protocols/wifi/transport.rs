//! Direct HTTP command delivery to WiFi devices.

use std::net::Ipv6Addr;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use crate::device::Command;

/// Errors from delivering a command over HTTP.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {address} failed: {source}")]
    Http {
        address: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("device {address} answered with HTTP {status}")]
    Status { address: String, status: u16 },
}

/// Convenient Result alias for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Delivers a command to a device at a network address.
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    async fn post_command(&self, address: &str, command: &Command) -> TransportResult<()>;
}

/// POSTs the command as JSON to `http://<address><path>`.
#[derive(Clone)]
pub struct HttpDeviceTransport {
    client: Client,
    path: String,
}

impl HttpDeviceTransport {
    /// Uses `client` (and its timeout) for every request.
    #[must_use]
    pub fn new(client: Client, path: impl Into<String>) -> Self {
        Self {
            client,
            path: path.into(),
        }
    }

    fn url_for(&self, address: &str) -> String {
        if address.parse::<Ipv6Addr>().is_ok() {
            format!("http://[{}]{}", address, self.path)
        } else {
            format!("http://{}{}", address, self.path)
        }
    }
}

#[async_trait]
impl DeviceTransport for HttpDeviceTransport {
    async fn post_command(&self, address: &str, command: &Command) -> TransportResult<()> {
        let url = self.url_for(address);
        log::debug!("[WiFi] POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(command)
            .send()
            .await
            .map_err(|source| TransportError::Http {
                address: address.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                address: address.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    #[test]
    fn url_includes_path() {
        let transport = HttpDeviceTransport::new(Client::new(), "/api");
        assert_eq!(transport.url_for("192.168.1.42"), "http://192.168.1.42/api");
        assert_eq!(transport.url_for("fe80::1"), "http://[fe80::1]/api");
    }

    #[tokio::test]
    async fn refused_connection_is_http_error() {
        let transport = HttpDeviceTransport::new(Client::new(), "/api");
        let err = transport
            .post_command("127.0.0.1:1", &Command::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Http { .. }));
    }

    #[tokio::test]
    async fn silent_device_times_out_as_http_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept and hold the connection without ever answering.
        let holder = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let client = Client::builder()
            .timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        let transport = HttpDeviceTransport::new(client, "/api");

        let started = Instant::now();
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            transport.post_command(&addr.to_string(), &Command::new()),
        )
        .await
        .expect("client timeout must end the request");

        match result {
            Err(TransportError::Http { source, .. }) => assert!(source.is_timeout()),
            other => panic!("expected timeout error, got {:?}", other),
        }
        assert!(started.elapsed() < Duration::from_secs(2));
        holder.abort();
    }
}
