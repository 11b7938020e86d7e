//! IoT Hub Server - headless gateway exposing the unified device API.
//!
//! Connects to the MQTT broker behind Zigbee2MQTT, scans the local network
//! for WiFi devices, and serves the aggregated device view over HTTP.

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use iothub_core::{bootstrap_services, start_server};
use tokio::signal;

use crate::config::ServerConfig;

/// IoT Hub Server - unified HTTP API for Zigbee and WiFi devices.
#[derive(Parser, Debug)]
#[command(name = "iothub-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE", env = "IOTHUB_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "IOTHUB_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Bind port (overrides config file).
    #[arg(short = 'p', long, env = "IOTHUB_BIND_PORT")]
    port: Option<u16>,

    /// MQTT broker host (overrides config file).
    #[arg(long, env = "IOTHUB_MQTT_HOST")]
    mqtt_host: Option<String>,

    /// MQTT broker port (overrides config file).
    #[arg(long, env = "IOTHUB_MQTT_PORT")]
    mqtt_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("IoT Hub Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(port) = args.port {
        config.bind_port = port;
    }
    if let Some(host) = args.mqtt_host {
        config.mqtt.host = host;
    }
    if let Some(port) = args.mqtt_port {
        config.mqtt.port = port;
    }

    log::info!(
        "Configuration: bind_port={}, broker={}:{}, base_topic={}",
        config.bind_port,
        config.mqtt.host,
        config.mqtt.port,
        config.mqtt.base_topic
    );

    let core_config = config.to_core_config();
    let services = bootstrap_services(&core_config).await.with_context(|| {
        format!(
            "Failed to start: MQTT broker at {}:{} is required",
            config.mqtt.host, config.mqtt.port
        )
    })?;

    log::info!("Services bootstrapped successfully");

    services.start_background_tasks();

    let app_state = services.app_state();
    let server_shutdown = services.cancel_token.child_token();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(app_state, server_shutdown).await {
            log::error!("Server error: {}", e);
        }
    });

    // Wait for shutdown signal
    shutdown_signal().await;

    log::info!("Shutdown signal received, cleaning up...");

    services.shutdown().await;

    if let Err(e) = server_handle.await {
        log::warn!("Server task ended abnormally: {}", e);
    }

    log::info!("Shutdown complete");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
