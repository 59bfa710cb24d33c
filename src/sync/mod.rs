//! Feed synchronization: reconciliation rules, metadata diffing, image
//! re-hosting, and the runner that ties them to storage.

mod images;
mod metadata;
mod reconcile;
mod runner;

use thiserror::Error;

use crate::feed::FetchError;

pub use images::ImageStore;
pub use metadata::{diff_fields, stage_updates, StagedUpdate};
pub use reconcile::{parse_duration, reconcile};
pub use runner::{BatchSummary, PodcastSyncReport, SyncOutcome, Syncer};

/// Errors surfaced by sync operations, mapped to HTTP statuses at the
/// API boundary.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The feed could not be fetched (network, timeout, non-2xx, too large).
    #[error("feed unavailable: {0}")]
    FeedUnavailable(String),

    /// The feed was fetched but is not parseable RSS.
    #[error("feed malformed: {0}")]
    FeedMalformed(String),

    /// A storage operation failed.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// The caller does not own the podcast or lacks the service token.
    #[error("not authorized for this podcast")]
    Unauthorized,

    /// No such podcast, or it has no feed URL to sync from.
    #[error("podcast not found or has no feed URL")]
    NotFound,
}

impl From<FetchError> for SyncError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Malformed(msg) => SyncError::FeedMalformed(msg),
            other => SyncError::FeedUnavailable(other.to_string()),
        }
    }
}
