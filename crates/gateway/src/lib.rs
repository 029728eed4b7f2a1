//! HTTP gateway for Bentofolio.
//!
//! Serves the editor API (load, save, media, state actions, layout, chat,
//! export, quota), a live preview of the portfolio, and a health check.
//!
//! Built on Axum; every handler works against one shared [`AppState`].

pub mod api;
pub mod preview;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, header};
use axum::{Router, response::Json, routing::get};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

use bentofolio_agent::ToolOrchestrator;
use bentofolio_config::AppConfig;
use bentofolio_core::error::StoreError;
use bentofolio_core::event::EventBus;
use bentofolio_core::portfolio::{GridConfig, PortfolioState};
use bentofolio_core::provider::ModelClient;
use bentofolio_core::repository::{MediaStore, PortfolioRepository};
use bentofolio_core::{Action, PortfolioStore};
use bentofolio_storage::{FileMediaStore, JsonFileRepository};
use bentofolio_telemetry::UsageTracker;

/// Shared application state for the gateway.
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<PortfolioStore>,
    pub repository: Arc<dyn PortfolioRepository>,
    pub media: Arc<dyn MediaStore>,
    pub agent: Arc<ToolOrchestrator>,
    /// Owner of the portfolio document this gateway edits.
    pub identity: String,
    /// Where usage counters are written after each chat turn.
    pub usage_file: Option<PathBuf>,
    /// Held by every handler that writes the store, and by a chat turn for
    /// its whole duration.
    pub write_lock: tokio::sync::Mutex<()>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Wire file-backed storage, persisted usage, and the agent from
    /// configuration, then load the stored portfolio.
    pub async fn from_config(
        config: AppConfig,
        client: Option<Arc<dyn ModelClient>>,
        events: Arc<EventBus>,
    ) -> Result<SharedState, Box<dyn std::error::Error>> {
        let repository: Arc<dyn PortfolioRepository> =
            Arc::new(JsonFileRepository::new(&config.storage.data_dir));
        let media: Arc<dyn MediaStore> = Arc::new(FileMediaStore::new(&config.storage.assets_dir));

        let usage_file = config.storage.usage_file.clone();
        let usage = match UsageTracker::load(&usage_file) {
            Ok(usage) => usage,
            Err(e) => {
                warn!(path = %usage_file.display(), error = %e, "Ignoring unreadable usage file");
                UsageTracker::new()
            }
        };

        let store = Arc::new(PortfolioStore::default().with_events(events.clone()));
        let identity = config.storage.identity.clone();
        load_portfolio(&store, repository.as_ref(), &identity, config.grid.grid_config()).await?;

        let agent = ToolOrchestrator::from_config(&config, client)
            .with_usage(Arc::new(usage))
            .with_events(events);

        Ok(Arc::new(AppState {
            config,
            store,
            repository,
            media,
            agent: Arc::new(agent),
            identity,
            usage_file: Some(usage_file),
            write_lock: tokio::sync::Mutex::new(()),
        }))
    }
}

/// Load `identity`'s portfolio into `store`. When nothing is stored yet the
/// store starts empty with the configured grid settings.
pub async fn load_portfolio(
    store: &PortfolioStore,
    repository: &dyn PortfolioRepository,
    identity: &str,
    grid: GridConfig,
) -> Result<bool, StoreError> {
    let found = store.load_from(repository, identity).await?;
    if found {
        let sections = store.read(|s| s.sections.len());
        info!(identity, sections, "Portfolio loaded");
    } else {
        let state = PortfolioState { grid_config: grid, ..Default::default() };
        store.dispatch(Action::LoadState { state: Box::new(state) });
        info!(identity, "No stored portfolio, starting empty");
    }
    Ok(found)
}

/// Build the router with every gateway route.
///
/// Layers applied:
/// - CORS for the editor's GET/POST JSON calls
/// - Request body limit from `gateway.body_limit_bytes`
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600));
    let body_limit = state.config.gateway.body_limit_bytes;

    Router::new()
        .route("/health", get(health_handler))
        .merge(api::api_router(state.clone()))
        .merge(preview::preview_router(state))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let client = bentofolio_providers::build_from_config(&config).default();
    if client.is_none() {
        warn!("No model provider configured; chat will only return setup guidance");
    }

    let events = Arc::new(EventBus::default());
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            debug!(?event, "Domain event");
        }
    });

    let state = AppState::from_config(config, client, events).await?;
    let app = build_router(state);

    info!(%addr, "Gateway listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
