use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::record::ResultRecord;
use crate::state::AppState;

pub const DEFAULT_HISTORY_LIMIT: usize = 20;

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<String>,
    pub node_id: Option<String>,
}

/// Missing limit means the default; anything else is clamped to `1..=max`.
pub fn effective_limit(raw: Option<&str>, max: usize) -> Result<usize, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(DEFAULT_HISTORY_LIMIT.min(max));
    };
    let requested = raw
        .parse::<i64>()
        .map_err(|_| AppError::bad_request(format!("invalid limit {raw:?}")))?;
    let requested = usize::try_from(requested.max(1)).unwrap_or(max);
    Ok(requested.clamp(1, max.max(1)))
}

pub(crate) async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<Vec<ResultRecord>>> {
    let limit = effective_limit(query.limit.as_deref(), state.history_limit_max)?;
    let node_id = query.node_id.filter(|id| !id.trim().is_empty());
    let records = state
        .store
        .blocking(move |store| store.recent(limit, node_id.as_deref()))
        .await?;
    Ok(Json(records))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/history", get(history))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::Metric;
    use crate::test_support::{get, send, test_app};
    use crate::thresholds::EvaluationStatus;
    use axum::http::StatusCode;
    use chrono::{Duration, Utc};

    #[test]
    fn limit_defaults_and_clamps() {
        assert_eq!(effective_limit(None, 10_000).unwrap(), 20);
        assert_eq!(effective_limit(Some(""), 10_000).unwrap(), 20);
        assert_eq!(effective_limit(Some("5"), 10_000).unwrap(), 5);
        assert_eq!(effective_limit(Some("0"), 10_000).unwrap(), 1);
        assert_eq!(effective_limit(Some("-3"), 10_000).unwrap(), 1);
        assert_eq!(effective_limit(Some("999999"), 10_000).unwrap(), 10_000);
        assert_eq!(effective_limit(None, 5).unwrap(), 5);
        assert!(effective_limit(Some("ten"), 10_000).is_err());
    }

    fn seed(app: &crate::test_support::TestApp, count: i64) {
        let base = Utc::now() - Duration::minutes(count);
        for i in 0..count {
            let node = if i % 2 == 0 { "host" } else { "pi-8" };
            app.state
                .store
                .append(&ResultRecord::evaluated(
                    base + Duration::minutes(i),
                    Metric::Temperature,
                    Some(i as f64),
                    EvaluationStatus::Stable,
                    node,
                ))
                .unwrap();
        }
    }

    #[tokio::test]
    async fn returns_newest_first_with_default_limit() {
        let app = test_app();
        seed(&app, 30);
        let (status, body) = send(router().with_state(app.state.clone()), get("/history")).await;
        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 20);
        assert_eq!(rows[0]["value"], 29.0);
        assert_eq!(rows[19]["value"], 10.0);
    }

    #[tokio::test]
    async fn limit_is_clamped_to_configured_max() {
        let app = test_app();
        seed(&app, 60);
        let (_, body) =
            send(router().with_state(app.state.clone()), get("/history?limit=500")).await;
        assert_eq!(body.as_array().unwrap().len(), app.state.history_limit_max);
    }

    #[tokio::test]
    async fn filters_by_node() {
        let app = test_app();
        seed(&app, 10);
        let (_, body) = send(
            router().with_state(app.state.clone()),
            get("/history?limit=100&node_id=pi-8"),
        )
        .await;
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|row| row["node_id"] == "pi-8"));
    }

    #[tokio::test]
    async fn unparsable_limit_is_a_json_bad_request() {
        let app = test_app();
        let (status, body) =
            send(router().with_state(app.state.clone()), get("/history?limit=lots")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("limit"));
    }
}
