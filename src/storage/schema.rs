use anyhow::Result;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

use super::types::DatabaseError;

// ============================================================================
// Database
// ============================================================================

#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Open a database connection and run migrations.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Locked` if another process holds the SQLite
    /// lock (SQLITE_BUSY, SQLITE_LOCKED, SQLITE_CANTOPEN), and
    /// `DatabaseError::Migration`/`Other` for everything else.
    pub async fn open(path: &str) -> Result<Self, DatabaseError> {
        let url = format!("sqlite:{}?mode=rwc", path);

        // busy_timeout=5000: SQLite waits up to 5 seconds for locks to release
        // before returning SQLITE_BUSY, which absorbs transient contention
        // between overlapping sync invocations. Set via pragma() so every
        // pooled connection inherits it.
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(DatabaseError::from_sqlx)?
            .pragma("busy_timeout", "5000");

        // SQLite is single-writer; a handful of connections covers concurrent
        // API handlers reading while a batch sync writes.
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        let db = Self { pool };
        db.migrate().await.map_err(|e| {
            let error_string = e.to_string().to_lowercase();
            if error_string.contains("database is locked")
                || error_string.contains("database table is locked")
                || error_string.contains("sqlite_busy")
                || error_string.contains("sqlite_locked")
            {
                DatabaseError::Locked
            } else {
                DatabaseError::Migration(e.to_string())
            }
        })?;
        Ok(db)
    }

    /// Run database migrations atomically within a transaction.
    ///
    /// All statements use `IF NOT EXISTS`, so re-running against an existing
    /// database is a no-op. If any step fails the whole migration rolls back.
    async fn migrate(&self) -> Result<()> {
        // Enable foreign keys (per-connection setting, outside the transaction)
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&self.pool)
            .await?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS podcasts (
                id INTEGER PRIMARY KEY,
                author_id TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                cover_image_url TEXT,
                feed_image_url TEXT,
                category TEXT,
                language TEXT,
                rss_url TEXT,
                workflow_mode TEXT NOT NULL DEFAULT 'rss',
                approved INTEGER NOT NULL DEFAULT 0
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        // Episode dedup (title / audio URL / numbering) is enforced by the
        // reconciler, deliberately NOT by UNIQUE constraints: violating feed
        // items are skipped, never rejected at the database layer.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS episodes (
                id INTEGER PRIMARY KEY,
                podcast_id INTEGER NOT NULL REFERENCES podcasts(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                description TEXT,
                audio_url TEXT NOT NULL,
                script_url TEXT,
                duration_seconds INTEGER,
                episode_number INTEGER NOT NULL,
                season_number INTEGER NOT NULL DEFAULT 1,
                published_at INTEGER,
                created_at INTEGER NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_episodes_podcast ON episodes(podcast_id)")
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_episodes_podcast_number ON episodes(podcast_id, episode_number)",
        )
        .execute(&mut *tx)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_podcasts_author ON podcasts(author_id)")
            .execute(&mut *tx)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_podcasts_approved ON podcasts(approved)")
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }
}
