//! Editor API.
//!
//! Endpoints:
//!
//! - `GET  /api/load`: Portfolio for the editor
//! - `POST /api/save`: Persist the portfolio (with uploaded images)
//! - `GET  /api/assets/{*path}`: Stored media
//! - `POST /api/dispatch`: Apply one state action
//! - `POST /api/undo`, `/api/redo`: Snapshot history
//! - `GET  /api/layout/{section_id}`: Packed layout of one section grid
//! - `POST /api/chat`: One agent turn
//! - `GET  /api/export`: Self-contained HTML download
//! - `GET  /api/quota`: Model usage against daily limits

use axum::{
    Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use bentofolio_core::error::{ProviderError, StoreError};
use bentofolio_core::message::Message;
use bentofolio_core::portfolio::PortfolioState;
use bentofolio_core::Action;
use bentofolio_layout::{
    EmptyCell, ExportOptions, LayoutController, PixelBox, Placement, export_html,
};
use bentofolio_storage::{InlineImage, for_editor, from_editor, migrate_inline_media, store_uploads};
use bentofolio_telemetry::{DailyUsage, MinuteUsage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::SharedState;

pub fn api_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/load", get(load_handler))
        .route("/api/save", post(save_handler))
        .route("/api/assets/{*path}", get(asset_handler))
        .route("/api/dispatch", post(dispatch_handler))
        .route("/api/undo", post(undo_handler))
        .route("/api/redo", post(redo_handler))
        .route("/api/layout/{section_id}", get(layout_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/export", get(export_handler))
        .route("/api/quota", get(quota_handler))
        .with_state(state)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: error.into() }))
}

fn store_error(e: StoreError) -> ApiError {
    let status = match e {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Media(_) => StatusCode::BAD_REQUEST,
        StoreError::Load(_) | StoreError::Save(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    api_error(status, e.to_string())
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateResponse {
    pub state: PortfolioState,
    pub revision: u64,
    pub dirty: bool,
    pub can_undo: bool,
    pub can_redo: bool,
}

impl StateResponse {
    fn current(app: &crate::AppState) -> Self {
        Self {
            state: app.store.read(for_editor),
            revision: app.store.revision(),
            dirty: app.store.is_dirty(),
            can_undo: app.store.can_undo(),
            can_redo: app.store.can_redo(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadResponse {
    /// A stored document exists for the identity.
    pub found: bool,
    #[serde(flatten)]
    pub current: StateResponse,
}

#[derive(Debug, Default, Deserialize)]
pub struct SaveRequest {
    /// The editor's state; the server-side state is saved when absent.
    #[serde(default)]
    pub state: Option<PortfolioState>,
    /// Uploaded images keyed by the placeholder URL used in `state`.
    #[serde(default)]
    pub images: HashMap<String, InlineImage>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResponse {
    pub ok: bool,
    pub saved_at: DateTime<Utc>,
    pub media_stored: usize,
    #[serde(flatten)]
    pub current: StateResponse,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResponse {
    /// The action or history step changed something.
    pub applied: bool,
    #[serde(flatten)]
    pub current: StateResponse,
}

#[derive(Debug, Deserialize)]
pub struct LayoutQuery {
    pub width: Option<f64>,
    #[serde(default = "default_editable")]
    pub editable: bool,
}

fn default_editable() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddSlotDto {
    #[serde(flatten)]
    pub cell: EmptyCell,
    pub insert_index: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutResponse {
    pub section_id: String,
    pub columns: u32,
    pub total_rows: u32,
    pub rendered_rows: u32,
    pub placements: Vec<Placement>,
    pub add_slots: Vec<AddSlotDto>,
    /// Pixel boxes keyed by card id; empty without a width.
    pub boxes: Vec<(String, PixelBox)>,
    pub content_height: f64,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<Message>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    #[serde(flatten)]
    pub outcome: bentofolio_agent::TurnOutcome,
    #[serde(flatten)]
    pub current: StateResponse,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaResponse {
    pub model: String,
    pub current: DailyUsage,
    pub models: Vec<DailyUsage>,
    pub minute: MinuteUsage,
}

// ── Handlers ──────────────────────────────────────────────────────────────

/// Reload from the repository unless the in-memory state has unsaved edits.
async fn load_handler(State(app): State<SharedState>) -> Result<Json<LoadResponse>, ApiError> {
    let _write = app.write_lock.lock().await;
    let found = if app.store.is_dirty() {
        info!("Unsaved edits in memory, skipping reload");
        true
    } else {
        app.store
            .load_from(app.repository.as_ref(), &app.identity)
            .await
            .map_err(store_error)?
    };
    Ok(Json(LoadResponse { found, current: StateResponse::current(&app) }))
}

async fn save_handler(
    State(app): State<SharedState>,
    Json(payload): Json<SaveRequest>,
) -> Result<Json<SaveResponse>, ApiError> {
    let _write = app.write_lock.lock().await;
    let mut state = match payload.state {
        Some(mut incoming) => {
            from_editor(&mut incoming);
            incoming
        }
        None => app.store.state(),
    };

    let media = app.media.as_ref();
    let uploaded = store_uploads(&mut state, &payload.images, media)
        .await
        .map_err(store_error)?;
    let migrated = migrate_inline_media(&mut state, media).await.map_err(store_error)?;

    let saved_at = if state == app.store.state() {
        app.store
            .save_to(app.repository.as_ref(), &app.identity)
            .await
            .map_err(store_error)?
    } else {
        // Persist first so a rejected save leaves the store untouched.
        let saved_at = Utc::now();
        state.saved_at = Some(saved_at);
        app.repository.save(&app.identity, &state).await.map_err(store_error)?;
        app.store.dispatch(Action::LoadState { state: Box::new(state) });
        saved_at
    };
    info!(identity = %app.identity, media = uploaded + migrated, "Portfolio saved");

    Ok(Json(SaveResponse {
        ok: true,
        saved_at,
        media_stored: uploaded + migrated,
        current: StateResponse::current(&app),
    }))
}

async fn asset_handler(
    State(app): State<SharedState>,
    Path(path): Path<String>,
) -> Result<Response, ApiError> {
    match app.media.get(&path).await.map_err(store_error)? {
        Some(media) => Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, media.content_type),
                (header::CACHE_CONTROL, "public, max-age=31536000, immutable".to_string()),
            ],
            media.bytes,
        )
            .into_response()),
        None => Err(api_error(StatusCode::NOT_FOUND, format!("No asset named {path}"))),
    }
}

async fn dispatch_handler(
    State(app): State<SharedState>,
    Json(action): Json<Action>,
) -> Json<MutationResponse> {
    let _write = app.write_lock.lock().await;
    let applied = app.store.dispatch(action);
    Json(MutationResponse { applied, current: StateResponse::current(&app) })
}

async fn undo_handler(State(app): State<SharedState>) -> Json<MutationResponse> {
    let _write = app.write_lock.lock().await;
    let applied = app.store.undo();
    Json(MutationResponse { applied, current: StateResponse::current(&app) })
}

async fn redo_handler(State(app): State<SharedState>) -> Json<MutationResponse> {
    let _write = app.write_lock.lock().await;
    let applied = app.store.redo();
    Json(MutationResponse { applied, current: StateResponse::current(&app) })
}

async fn layout_handler(
    State(app): State<SharedState>,
    Path(section_id): Path<String>,
    Query(query): Query<LayoutQuery>,
) -> Result<Json<LayoutResponse>, ApiError> {
    let (section, config) = app
        .store
        .read(|s| s.section(&section_id).cloned().map(|section| (section, s.grid_config)))
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("No section with id {section_id}")))?;

    let mut controller = LayoutController::new(section.id.clone(), config).with_editable(query.editable);
    let mut snapshot = controller.sync_section(&section);
    if let Some(width) = query.width {
        snapshot = controller.set_width(width);
    }

    Ok(Json(LayoutResponse {
        section_id,
        columns: snapshot.columns,
        total_rows: snapshot.layout.total_rows(),
        rendered_rows: snapshot.rendered_rows,
        placements: snapshot.layout.placements().to_vec(),
        add_slots: snapshot
            .add_slots
            .iter()
            .map(|slot| AddSlotDto { cell: slot.cell, insert_index: slot.insert_index })
            .collect(),
        boxes: snapshot.boxes(),
        content_height: snapshot.content_height(),
    }))
}

fn provider_status(e: &ProviderError) -> StatusCode {
    match e {
        ProviderError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        ProviderError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        ProviderError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::BAD_GATEWAY,
    }
}

async fn chat_handler(
    State(app): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if payload.message.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Message must not be empty"));
    }
    info!(history = payload.history.len(), "Chat request");

    // Held for the whole turn: a failed turn rolls back to its own checkpoint.
    let _write = app.write_lock.lock().await;
    let outcome = app
        .agent
        .run(&payload.message, &payload.history, &app.store)
        .await
        .map_err(|e| api_error(provider_status(&e), e.to_string()))?;

    if let Some(path) = &app.usage_file
        && let Err(e) = app.agent.usage().save(path)
    {
        warn!(path = %path.display(), error = %e, "Failed to persist usage");
    }

    Ok(Json(ChatResponse { outcome, current: StateResponse::current(&app) }))
}

async fn export_handler(State(app): State<SharedState>) -> Response {
    let html = app.store.read(|s| export_html(s, &ExportOptions::default()));
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"portfolio.html\""),
        ],
        html,
    )
        .into_response()
}

async fn quota_handler(State(app): State<SharedState>) -> Json<QuotaResponse> {
    let usage = app.agent.usage();
    let model = app.config.default_model.clone();
    Json(QuotaResponse {
        current: usage.daily_usage(&model),
        model,
        models: usage.report(),
        minute: usage.minute_usage(),
    })
}
