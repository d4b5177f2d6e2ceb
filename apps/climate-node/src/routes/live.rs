use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use std::collections::BTreeMap;

use crate::error::AppResult;
use crate::record::NodeLatestView;
use crate::state::AppState;

pub(crate) async fn live(
    State(state): State<AppState>,
) -> AppResult<Json<BTreeMap<String, NodeLatestView>>> {
    let views = state.store.blocking(|store| store.latest_per_node()).await?;
    Ok(Json(views))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/live", get(live))
}
