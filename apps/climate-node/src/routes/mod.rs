pub mod display;
pub mod health;
pub mod history;
pub mod ingest;
pub mod live;
pub mod sensor_data;

use axum::Router;
use tower_http::cors::CorsLayer;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(sensor_data::router())
        .merge(live::router())
        .merge(ingest::router())
        .merge(history::router())
        .merge(display::router())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
