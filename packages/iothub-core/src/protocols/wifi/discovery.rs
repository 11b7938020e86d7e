//! Neighbour discovery by running an external command.

use std::io;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

use crate::state::WifiConfig;

/// Errors from a single discovery run.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("discovery did not finish within {secs}s")]
    Timeout { secs: u64 },

    #[error("discovery exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },
}

/// Convenient Result alias for discovery runs.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// Source of raw neighbour-table text.
#[async_trait]
pub trait NetworkDiscovery: Send + Sync {
    /// Runs discovery once and returns its raw text output.
    async fn run_discovery(&self) -> DiscoveryResult<String>;
}

/// Runs a configured program (`arp -a` by default) and captures stdout.
#[derive(Debug, Clone)]
pub struct CommandDiscovery {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandDiscovery {
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    #[must_use]
    pub fn from_config(config: &WifiConfig) -> Self {
        Self::new(
            config.discovery_program.clone(),
            config.discovery_args.clone(),
            Duration::from_secs(config.discovery_timeout_secs),
        )
    }
}

#[async_trait]
impl NetworkDiscovery for CommandDiscovery {
    async fn run_discovery(&self) -> DiscoveryResult<String> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| DiscoveryError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // Dropping the future on timeout drops the child, which kills it.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| DiscoveryError::Timeout {
                secs: self.timeout.as_secs(),
            })?
            .map_err(|source| DiscoveryError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(DiscoveryError::Exit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
