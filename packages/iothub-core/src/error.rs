//! Centralized error types for the IoT hub core library.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types using `thiserror`
//! - Maps errors to appropriate HTTP status codes
//! - Implements `IntoResponse` for automatic JSON error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::protocols::wifi::{DiscoveryError, TransportError};
use crate::protocols::zigbee::BrokerError;
use crate::protocols::AdapterError;

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths.
pub trait ErrorCode {
    /// Returns a machine-readable error code for logs and diagnostics.
    fn code(&self) -> &'static str;
}

impl ErrorCode for BrokerError {
    fn code(&self) -> &'static str {
        match self {
            Self::Connect(_) => "broker_connect_failed",
            Self::Rejected(_) => "broker_connect_rejected",
            Self::ConnectTimeout(_) => "broker_connect_timeout",
            Self::Subscribe { .. } => "broker_subscribe_failed",
            Self::Publish { .. } => "broker_publish_failed",
        }
    }
}

impl ErrorCode for DiscoveryError {
    fn code(&self) -> &'static str {
        match self {
            Self::Spawn { .. } => "discovery_spawn_failed",
            Self::Timeout { .. } => "discovery_timeout",
            Self::Exit { .. } => "discovery_exit_failure",
        }
    }
}

impl ErrorCode for TransportError {
    fn code(&self) -> &'static str {
        match self {
            Self::Http { .. } => "device_http_failed",
            Self::Status { .. } => "device_http_status",
        }
    }
}

impl ErrorCode for AdapterError {
    fn code(&self) -> &'static str {
        match self {
            Self::Broker(e) => e.code(),
            Self::Discovery(e) => e.code(),
            Self::Transport(e) => e.code(),
            Self::Encode(_) => "command_encode_failed",
            Self::InvalidAddress(_) => "invalid_address",
            Self::Unsupported(_) => "unsupported_protocol",
        }
    }
}

/// Application-wide error type for the IoT hub.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum HubError {
    /// No adapter knows a device with this id.
    #[error("Device not found")]
    DeviceNotFound(String),

    /// Client sent an invalid or malformed request.
    #[error("{0}")]
    InvalidRequest(String),

    /// An adapter or its transport failed (broker, device HTTP, discovery).
    #[error("{0}")]
    Adapter(String),

    /// The target protocol has no working adapter.
    #[error("{0}")]
    Unsupported(String),

    /// Server configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl HubError {
    /// Returns a machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DeviceNotFound(_) => "device_not_found",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Adapter(_) => "adapter_error",
            Self::Unsupported(_) => "unsupported_protocol",
            Self::Configuration(_) => "configuration_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Maps the error to an appropriate HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DeviceNotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unsupported(_) => StatusCode::NOT_IMPLEMENTED,
            Self::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convenient Result alias for application-wide operations.
pub type HubResult<T> = Result<T, HubError>;

/// JSON response body for error responses.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            log::warn!("[API] {} ({}): {}", status, self.code(), self);
        }
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<AdapterError> for HubError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::InvalidAddress(_) => Self::InvalidRequest(err.to_string()),
            AdapterError::Unsupported(_) => Self::Unsupported(err.to_string()),
            _ => Self::Adapter(err.to_string()),
        }
    }
}

impl From<BrokerError> for HubError {
    fn from(err: BrokerError) -> Self {
        Self::Adapter(err.to_string())
    }
}
