use crate::display::testing::RecordingDisplay;
use crate::display::{DisplayController, LatestSample};
use crate::sensor::{FixedSensor, SensorSource};
use crate::state::AppState;
use crate::store::Store;
use crate::thresholds::Thresholds;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub struct TestApp {
    pub state: AppState,
    pub display: Arc<RecordingDisplay>,
    _dir: TempDir,
}

pub fn test_app() -> TestApp {
    test_app_with_sensor(Arc::new(FixedSensor::default()))
}

pub fn test_app_with_sensor(sensor: Arc<dyn SensorSource>) -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Store::open(dir.path().join("sensor_data.db")).expect("store");
    let latest = LatestSample::new();
    let display = Arc::new(RecordingDisplay::default());
    let state = AppState {
        node_id: "host".to_string(),
        thresholds: Thresholds::default(),
        store,
        sensor,
        latest: latest.clone(),
        display: DisplayController::new(Some(display.clone()), latest),
        history_limit_max: 50,
    };
    TestApp {
        state,
        display,
        _dir: dir,
    }
}

/// Send one request through the router and decode the JSON body
/// (`Null` when the body is not JSON).
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, JsonValue) {
    let response = app.oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null);
    (status, body)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
}

pub fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}
