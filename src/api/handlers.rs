use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::sync::{BatchSummary, PodcastSyncReport, SyncError, SyncOutcome};

use super::server::AppContext;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// API-level error: an HTTP status plus a message for the JSON body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        let status = match err {
            SyncError::NotFound => StatusCode::NOT_FOUND,
            SyncError::Unauthorized => StatusCode::FORBIDDEN,
            SyncError::FeedUnavailable(_) | SyncError::FeedMalformed(_) => StatusCode::BAD_GATEWAY,
            SyncError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError::new(status, err.to_string())
    }
}

/// Extracts the authenticated author id injected by the upstream gateway.
fn author_id(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get("x-author-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .ok_or_else(|| ApiError::new(StatusCode::UNAUTHORIZED, "missing x-author-id header"))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// POST /podcasts/:podcast_id/sync
///
/// Syncs a single podcast. The caller must own it.
pub async fn sync_podcast(
    State(ctx): State<AppContext>,
    Path(podcast_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<SyncOutcome>, ApiError> {
    let author = author_id(&headers)?;

    let podcast = ctx
        .syncer
        .db()
        .get_podcast(podcast_id)
        .await
        .map_err(|e| SyncError::Persistence(e.to_string()))?
        .ok_or(SyncError::NotFound)?;

    if podcast.author_id != author {
        return Err(SyncError::Unauthorized.into());
    }

    let outcome = ctx.syncer.sync_podcast(&podcast).await?;
    Ok(Json(outcome))
}

/// POST /sync/feeds
///
/// Syncs every feed-backed podcast the caller owns.
pub async fn sync_author_feeds(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<Json<Vec<PodcastSyncReport>>, ApiError> {
    let author = author_id(&headers)?;
    let reports = ctx.syncer.sync_author(&author).await?;
    Ok(Json(reports))
}

/// POST /internal/sync-all
///
/// Platform-wide sync of all approved podcasts, gated by the service
/// token rather than an author identity.
pub async fn sync_all(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<Json<BatchSummary>, ApiError> {
    let Some(expected) = ctx.service_token.as_deref() else {
        return Err(ApiError::new(
            StatusCode::FORBIDDEN,
            "platform sync disabled: no service token configured",
        ));
    };

    let presented = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    if presented != Some(expected.expose_secret()) {
        return Err(ApiError::new(
            StatusCode::UNAUTHORIZED,
            "invalid service token",
        ));
    }

    let summary = ctx.syncer.sync_all_approved().await?;
    Ok(Json(summary))
}
