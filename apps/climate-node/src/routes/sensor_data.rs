use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::sample::SensorSample;
use crate::state::AppState;
use crate::thresholds::{AlertLevel, EvaluationStatus};

#[derive(Debug, Clone, Serialize)]
pub struct LiveReading {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub temp_status: EvaluationStatus,
    pub humidity_status: EvaluationStatus,
    pub temp_alert: AlertLevel,
    pub humidity_alert: AlertLevel,
    pub pi_id: String,
}

/// Reads the local sensor now rather than serving the last sampled value.
pub(crate) async fn sensor_data(State(state): State<AppState>) -> AppResult<Json<LiveReading>> {
    let sensor = state.sensor.clone();
    let sample = tokio::task::spawn_blocking(move || SensorSample::from(sensor.read()))
        .await
        .map_err(|err| AppError::internal(format!("sensor read failed: {err}")))?;
    let temp_status = state.thresholds.temperature.evaluate(sample.temperature);
    let humidity_status = state.thresholds.humidity.evaluate(sample.humidity);
    Ok(Json(LiveReading {
        temperature: sample.temperature,
        humidity: sample.humidity,
        temp_status,
        humidity_status,
        temp_alert: temp_status.alert_level(),
        humidity_alert: humidity_status.alert_level(),
        pi_id: state.node_id.clone(),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/sensor-data", get(sensor_data))
}
