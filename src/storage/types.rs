use sqlx::FromRow;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-facing messages.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another process holds the SQLite write lock.
    #[error("database is locked by another process")]
    Locked,

    /// Migration failed
    #[error("database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        // SQLITE_BUSY (5): database is locked
        // SQLITE_LOCKED (6): database table is locked
        // SQLITE_CANTOPEN (14): unable to open database file
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
            || error_string.contains("unable to open database file")
        {
            return DatabaseError::Locked;
        }

        DatabaseError::Other(err)
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// A podcast record.
///
/// `cover_image_url` is the display URL (re-hosted when possible);
/// `feed_image_url` is the last-known source URL from the feed, tracked
/// separately so image changes can be detected across syncs.
#[derive(Debug, Clone, FromRow)]
pub struct Podcast {
    pub id: i64,
    pub author_id: String,
    pub title: String,
    pub description: Option<String>,
    pub cover_image_url: Option<String>,
    pub feed_image_url: Option<String>,
    pub category: Option<String>,
    pub language: Option<String>,
    pub rss_url: Option<String>,
    /// Episode sourcing mode: `manual`, `rss`, or `hybrid`.
    pub workflow_mode: String,
    pub approved: bool,
}

/// Fields for creating a podcast record.
#[derive(Debug, Clone)]
pub struct NewPodcast {
    pub author_id: String,
    pub title: String,
    pub description: Option<String>,
    pub cover_image_url: Option<String>,
    pub feed_image_url: Option<String>,
    pub category: Option<String>,
    pub language: Option<String>,
    pub rss_url: Option<String>,
    pub workflow_mode: String,
    pub approved: bool,
}

impl Default for NewPodcast {
    fn default() -> Self {
        Self {
            author_id: String::new(),
            title: String::new(),
            description: None,
            cover_image_url: None,
            feed_image_url: None,
            category: None,
            language: None,
            rss_url: None,
            workflow_mode: "rss".to_string(),
            approved: false,
        }
    }
}

/// A stored episode.
#[derive(Debug, Clone, FromRow)]
pub struct Episode {
    pub id: i64,
    pub podcast_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub audio_url: String,
    /// Placeholder for a licensed script upload; always NULL on feed inserts.
    pub script_url: Option<String>,
    pub duration_seconds: Option<i64>,
    pub episode_number: i64,
    pub season_number: i64,
    pub published_at: Option<i64>,
    pub created_at: i64,
}

/// The dedup key of a stored episode, as consumed by the reconciler.
#[derive(Debug, Clone)]
pub struct ExistingEpisode {
    pub title: String,
    pub episode_number: i64,
    pub audio_url: String,
}

/// An episode accepted by the reconciler, pending insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEpisode {
    pub title: String,
    pub description: Option<String>,
    pub audio_url: String,
    pub duration_seconds: Option<i64>,
    pub episode_number: i64,
    pub season_number: i64,
    pub published_at: Option<i64>,
}

/// A partial podcast update staged by the metadata updater.
///
/// Only changed fields are set; [`PodcastPatch::is_empty`] decides whether
/// anything needs persisting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PodcastPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub language: Option<String>,
    pub cover_image_url: Option<String>,
    pub feed_image_url: Option<String>,
}

impl PodcastPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.language.is_none()
            && self.cover_image_url.is_none()
            && self.feed_image_url.is_none()
    }
}
