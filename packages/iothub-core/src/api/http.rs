//! HTTP route handlers.
//!
//! All handlers are thin - they delegate to the aggregator and adapters.

use std::collections::BTreeMap;

use axum::{
    extract::{rejection::BytesRejection, DefaultBodyLimit, Path, State},
    http::{header, Method},
    response::Response,
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::response::{api_status, api_success, command_sent};
use crate::api::AppState;
use crate::device::{parse_object, Command, DeviceRecord};
use crate::error::{HubError, HubResult};
use crate::protocol_constants::{MAX_COMMAND_BODY_SIZE, SERVICE_ID};
use crate::protocols::DeviceAdapter;
use crate::runtime::TaskSpawner;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Creates the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_check))
        .route("/devices", get(list_devices))
        .route("/devices/discover", get(discover_all))
        .route("/devices/wifi/discover", get(discover_wifi))
        .route("/devices/wifi/{ip}/set", post(send_wifi_command))
        .route("/devices/{id}", get(get_device))
        .route("/devices/{id}/set", post(send_command))
        .layer(DefaultBodyLimit::max(MAX_COMMAND_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Decodes a request body as a command object.
///
/// Every failure (unreadable or oversized body, invalid JSON, non-object
/// JSON) is reported the same way, regardless of content type.
fn parse_command(body: Result<Bytes, BytesRejection>) -> HubResult<Command> {
    let body = body.map_err(|e| {
        log::debug!("[API] Unreadable request body: {}", e);
        HubError::InvalidRequest("Invalid JSON payload".into())
    })?;
    parse_object(&body).map_err(|e| {
        log::debug!("[API] Rejected command body: {}", e);
        HubError::InvalidRequest("Invalid JSON payload".into())
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Liveness probe; also lists the registered protocols.
async fn health_check(State(state): State<AppState>) -> Response {
    let adapters: Vec<&'static str> = state
        .aggregator
        .protocols()
        .iter()
        .map(|p| p.slug())
        .collect();
    api_success(json!({
        "status": "ok",
        "service": SERVICE_ID,
        "adapters": adapters,
    }))
}

/// GET /devices
async fn list_devices(State(state): State<AppState>) -> Response {
    api_success(state.aggregator.collect_all())
}

/// GET /devices/discover
///
/// Returns immediately; results show up in later `GET /devices` calls.
async fn discover_all(State(state): State<AppState>) -> Response {
    let aggregator = state.aggregator.clone();
    state.spawner.spawn(async move {
        let results = aggregator.discover_all().await;
        let failed = results.iter().filter(|(_, r)| r.is_err()).count();
        log::info!(
            "[API] Discovery finished on {} adapter(s), {} failed",
            results.len(),
            failed
        );
    });
    api_status("Discovery started")
}

/// GET /devices/wifi/discover
///
/// Runs a scan and returns what it found, keyed by IP address.
async fn discover_wifi(State(state): State<AppState>) -> Response {
    let found: BTreeMap<String, DeviceRecord> = state.wifi.scan().await.into_iter().collect();
    api_success(found)
}

/// GET /devices/{id}
async fn get_device(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> HubResult<Response> {
    state
        .aggregator
        .get_device(&id)
        .map(api_success)
        .ok_or(HubError::DeviceNotFound(id))
}

/// POST /devices/{id}/set
///
/// Fire-and-forget: success means the transport accepted the command.
async fn send_command(
    Path(id): Path<String>,
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> HubResult<Response> {
    let command = parse_command(body)?;
    let (adapter, raw_id) = state
        .aggregator
        .resolve_command_target(&id)
        .ok_or_else(|| HubError::Internal("no adapter registered for commands".into()))?;

    log::info!("[API] Command for {} via {}", id, adapter.protocol());
    adapter.send_command(raw_id, &command).await?;
    Ok(command_sent(command))
}

/// POST /devices/wifi/{ip}/set
async fn send_wifi_command(
    Path(ip): Path<String>,
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> HubResult<Response> {
    let command = parse_command(body)?;
    state.wifi.send_command(&ip, &command).await?;
    Ok(command_sent(command))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    use crate::aggregator::Aggregator;
    use crate::device::Protocol;
    use crate::protocols::wifi::WifiAdapter;
    use crate::protocols::zigbee::ZigbeeAdapter;
    use crate::protocols::UnsupportedAdapter;
    use crate::registry::DeviceRegistry;
    use crate::runtime::TokioSpawner;
    use crate::test_fixtures::{FakeBroker, FakeDiscovery, FakeTransport};

    const ARP_OUTPUT: &str = "? (192.168.1.42) at 84:f3:eb:12:34:56 on en0 ifscope [ethernet]\n";

    struct Harness {
        router: Router,
        broker: Arc<FakeBroker>,
        transport: Arc<FakeTransport>,
        zigbee: Arc<ZigbeeAdapter>,
    }

    fn harness_with(transport: FakeTransport) -> Harness {
        let broker = Arc::new(FakeBroker::default());
        let (_tx, rx) = mpsc::channel(4);
        let zigbee = Arc::new(ZigbeeAdapter::new(
            broker.clone(),
            Arc::new(DeviceRegistry::new()),
            "zigbee2mqtt",
            rx,
        ));

        let transport = Arc::new(transport);
        let wifi = Arc::new(WifiAdapter::new(
            Arc::new(FakeDiscovery::output(ARP_OUTPUT)),
            transport.clone(),
            Arc::new(DeviceRegistry::new()),
        ));

        let aggregator = Arc::new(Aggregator::new(
            vec![
                zigbee.clone() as Arc<dyn DeviceAdapter>,
                wifi.clone() as Arc<dyn DeviceAdapter>,
                Arc::new(UnsupportedAdapter::new(Protocol::Matter)) as Arc<dyn DeviceAdapter>,
            ],
            Protocol::Zigbee,
        ));

        let state = AppState::builder()
            .aggregator(aggregator)
            .wifi(wifi)
            .spawner(TokioSpawner::current())
            .build();

        Harness {
            router: create_router(state),
            broker,
            transport,
            zigbee,
        }
    }

    fn harness() -> Harness {
        harness_with(FakeTransport::default())
    }

    async fn call(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, value)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_lists_adapters() {
        let h = harness();
        let (status, body) = call(&h.router, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "status": "ok", "service": "iothub", "adapters": ["zigbee", "wifi", "matter"] })
        );
    }

    #[tokio::test]
    async fn command_to_unknown_id_is_sent_and_echoed() {
        let h = harness();
        let (status, body) = call(
            &h.router,
            post_json("/devices/unknown-id/set", r#"{"power":"on"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "status": "Command sent", "command": { "power": "on" } })
        );
        let published = h.broker.published();
        assert_eq!(published[0].0, "zigbee2mqtt/unknown-id/set");
    }

    #[tokio::test]
    async fn missing_device_is_404() {
        let h = harness();
        let (status, body) = call(&h.router, get("/devices/missing-id")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Device not found" }));
    }

    #[tokio::test]
    async fn malformed_command_body_is_400() {
        let h = harness();
        for body in ["{not json", "[1,2]", "\"on\""] {
            let (status, value) =
                call(&h.router, post_json("/devices/lamp/set", body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body {:?}", body);
            assert_eq!(value, json!({ "error": "Invalid JSON payload" }));
        }
        assert!(h.broker.published().is_empty());
    }

    #[tokio::test]
    async fn command_without_content_type_is_accepted() {
        let h = harness();
        let request = Request::post("/devices/zigbee_lamp/set")
            .body(Body::from(r#"{"state":"ON"}"#))
            .unwrap();
        let (status, _) = call(&h.router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(h.broker.published()[0].0, "zigbee2mqtt/lamp/set");
    }

    #[tokio::test]
    async fn aggregated_listing_is_namespaced() {
        let h = harness();
        h.zigbee
            .handle_message("zigbee2mqtt/1", br#"{"temperature":21.5}"#);
        call(&h.router, get("/devices/wifi/discover")).await;

        let (status, body) = call(&h.router, get("/devices")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["zigbee_1"], json!({ "temperature": 21.5 }));
        assert_eq!(
            body["wifi_192.168.1.42"],
            json!({ "ip": "192.168.1.42", "mac": "84:f3:eb:12:34:56" })
        );
    }

    #[tokio::test]
    async fn device_lookup_by_namespaced_and_raw_id() {
        let h = harness();
        h.zigbee
            .handle_message("zigbee2mqtt/lamp", br#"{"state":"ON"}"#);

        let (status, body) = call(&h.router, get("/devices/zigbee_lamp")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "state": "ON" }));

        let (status, _) = call(&h.router, get("/devices/lamp")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn wifi_discover_returns_devices_by_ip() {
        let h = harness();
        let (status, body) = call(&h.router, get("/devices/wifi/discover")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "192.168.1.42": { "ip": "192.168.1.42", "mac": "84:f3:eb:12:34:56" } })
        );
    }

    #[tokio::test]
    async fn discover_all_starts_in_background() {
        let h = harness();
        let (status, body) = call(&h.router, get("/devices/discover")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "Discovery started" }));
    }

    #[tokio::test]
    async fn wifi_command_is_posted_to_device() {
        let h = harness();
        let (status, body) = call(
            &h.router,
            post_json("/devices/wifi/192.168.1.42/set", r#"{"power":"off"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["command"], json!({ "power": "off" }));
        assert_eq!(h.transport.posts()[0].0, "192.168.1.42");
    }

    #[tokio::test]
    async fn wifi_command_to_bad_address_is_400() {
        let h = harness();
        let (status, body) = call(
            &h.router,
            post_json("/devices/wifi/kitchen/set", r#"{"power":"off"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "invalid device address: kitchen" }));
        assert!(h.transport.posts().is_empty());
    }

    #[tokio::test]
    async fn wifi_transport_failure_is_500() {
        let h = harness_with(FakeTransport::failing_with_status(502));
        let (status, body) = call(
            &h.router,
            post_json("/devices/wifi/192.168.1.42/set", r#"{"power":"off"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({ "error": "device 192.168.1.42 answered with HTTP 502" })
        );
    }

    #[tokio::test]
    async fn stub_protocol_command_is_501() {
        let h = harness();
        let (status, body) = call(
            &h.router,
            post_json("/devices/matter_7/set", r#"{"power":"on"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
        assert_eq!(body, json!({ "error": "Matter devices are not supported yet" }));
    }
}
