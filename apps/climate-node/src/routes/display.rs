use axum::extract::{Query, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::display::DisplayMode;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ModeQuery {
    pub mode: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ModeResponse {
    pub mode: DisplayMode,
    pub display_present: bool,
}

fn parse_mode(raw: Option<&str>) -> Result<DisplayMode, AppError> {
    match raw.map(|raw| raw.trim().to_ascii_lowercase()).as_deref() {
        Some("temperature") | Some("temp") => Ok(DisplayMode::Temperature),
        Some("humidity") => Ok(DisplayMode::Humidity),
        Some(other) => Err(AppError::bad_request(format!("unknown display mode {other:?}"))),
        None => Err(AppError::bad_request("mode is required")),
    }
}

/// Stands in for the joystick: switches what the display shows and redraws
/// it from the latest sample.
pub(crate) async fn set_mode(
    State(state): State<AppState>,
    Query(query): Query<ModeQuery>,
) -> AppResult<Json<ModeResponse>> {
    let mode = parse_mode(query.mode.as_deref())?;
    state.display.set_mode(mode);
    tracing::info!(mode = ?mode, "display mode changed");
    Ok(Json(ModeResponse {
        mode,
        display_present: state.display.is_present(),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/display/mode", post(set_mode))
}
