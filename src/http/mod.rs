//! HTTP surface: axum router, state and server loop.

pub mod error;
pub mod extract;
pub mod handlers;

use std::time::{Duration, Instant};

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::service::JournalService;
use crate::storage::open_backend;
use crate::uploads::{UploadStore, UPLOADS_PREFIX};

pub use error::ApiError;
pub use extract::EntryRequest;

#[derive(Clone)]
pub struct AppState {
    pub service: JournalService,
    started: Instant,
}

impl AppState {
    pub fn new(service: JournalService) -> Self {
        Self {
            service,
            started: Instant::now(),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }
}

pub fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    let uploads = ServeDir::new(state.service.uploads().dir());

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route(
            "/api/journalEntries",
            get(handlers::list_entries).post(handlers::create_entry),
        )
        .route(
            "/api/journalEntries/{id}",
            get(handlers::get_entry)
                .put(handlers::update_entry)
                .delete(handlers::delete_entry),
        )
        .nest_service(&format!("/{}", UPLOADS_PREFIX), uploads)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Open the configured backend and uploads directory and serve until
/// Ctrl-C.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let backend = open_backend(&config)?;
    let uploads = UploadStore::open(&config.uploads_dir)?;
    let service = JournalService::new(backend, uploads);
    let app = build_router(AppState::new(service), config.max_upload_bytes);

    let listener = TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(addr = %config.bind_addr(), backend = %config.backend, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
    }
}
