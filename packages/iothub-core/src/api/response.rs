//! Helpers for consistent JSON response bodies.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::device::Command;

/// 200 with `body` serialized as JSON.
pub fn api_success<T: Serialize>(body: T) -> Response {
    (StatusCode::OK, Json(body)).into_response()
}

/// 200 with `{"status": status}`.
pub fn api_status(status: &str) -> Response {
    api_success(json!({ "status": status }))
}

/// 200 echoing an accepted command.
pub fn command_sent(command: Command) -> Response {
    api_success(json!({ "status": "Command sent", "command": command }))
}
