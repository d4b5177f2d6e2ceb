use crate::error::AppError;
use anyhow::Result;
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get_service;
use axum::{routing::get, Router};
use std::path::PathBuf;
use tower_http::services::{ServeDir, ServeFile};

const DEFAULT_INDEX: &str = r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Climate Dashboard</title>
  </head>
  <body style="font-family: system-ui; padding: 24px">
    <h1>Climate Dashboard</h1>
    <p>No dashboard build configured. Start with <code>--static-root</code> to serve one.</p>
    <ul>
      <li><a href="/live">/live</a> latest reading per node</li>
      <li><a href="/history">/history</a> recent records</li>
      <li><a href="/sensor-data">/sensor-data</a> this node's live reading</li>
    </ul>
  </body>
</html>
"#;

pub fn service(static_root: Option<PathBuf>) -> Result<Router> {
    let router = if let Some(root) = static_root {
        if !root.exists() {
            anyhow::bail!("static_root not found at {}", root.display());
        }
        let index = root.join("index.html");
        let dir = ServeDir::new(root)
            .append_index_html_on_directories(true)
            .not_found_service(ServeFile::new(index));
        Router::new().fallback_service(get_service(dir))
    } else {
        async fn placeholder_handler() -> Html<&'static str> {
            Html(DEFAULT_INDEX)
        }

        // Without a dashboard build only `/` is a page; anything else keeps
        // the JSON error shape the API uses.
        Router::new()
            .route("/", get(placeholder_handler))
            .fallback(|| async { AppError::new(StatusCode::NOT_FOUND, "not found") })
    };
    Ok(router)
}
