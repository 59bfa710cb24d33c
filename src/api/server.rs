use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use secrecy::SecretString;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::sync::Syncer;

use super::handlers;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppContext {
    pub syncer: Syncer,
    /// Bearer token guarding the platform-wide sync endpoint. `None`
    /// disables it.
    pub service_token: Option<Arc<SecretString>>,
}

/// Builds the service router. Re-hosted cover images are served as
/// static files under `/media`.
pub fn router(ctx: AppContext, media_dir: &Path) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/podcasts/:podcast_id/sync", post(handlers::sync_podcast))
        .route("/sync/feeds", post(handlers::sync_author_feeds))
        .route("/internal/sync-all", post(handlers::sync_all))
        .nest_service("/media", ServeDir::new(media_dir))
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Binds the listener and serves until shutdown.
pub async fn run(config: &Config, ctx: AppContext) -> Result<()> {
    let media_dir = ctx.syncer.images().dir().to_path_buf();
    let app = router(ctx, &media_dir);

    let addr = format!("{}:{}", config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!(addr = %addr, "API server listening");
    axum::serve(listener, app)
        .await
        .context("API server terminated")?;

    Ok(())
}
