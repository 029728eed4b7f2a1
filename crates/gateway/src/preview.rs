//! Live preview of the portfolio.
//!
//! `GET /` renders the current in-memory state with the static exporter, so
//! the page is exactly what a download from `/api/export` would contain.
//! Durable media URLs (`/assets/...`) resolve against the same media store.

use axum::{
    Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use bentofolio_layout::{ExportOptions, export_html};

use crate::SharedState;

pub fn preview_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/assets/{*path}", get(asset_handler))
        .with_state(state)
}

async fn index_handler(State(app): State<SharedState>) -> Html<String> {
    Html(app.store.read(|s| export_html(s, &ExportOptions::default())))
}

async fn asset_handler(State(app): State<SharedState>, Path(path): Path<String>) -> Response {
    match app.media.get(&path).await {
        Ok(Some(media)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, media.content_type)],
            media.bytes,
        )
            .into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            tracing::warn!(path, error = %e, "Asset read failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
