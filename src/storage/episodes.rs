use anyhow::Result;
use sqlx::QueryBuilder;

use super::schema::Database;
use super::types::{Episode, ExistingEpisode, NewEpisode};

impl Database {
    // ========================================================================
    // Episode Operations
    // ========================================================================

    /// The dedup keys (title, number, audio URL) of a podcast's stored
    /// episodes, as input to the reconciler.
    pub async fn episode_keys(&self, podcast_id: i64) -> Result<Vec<ExistingEpisode>> {
        let rows: Vec<(String, i64, String)> = sqlx::query_as(
            r#"
            SELECT title, episode_number, audio_url
            FROM episodes
            WHERE podcast_id = ?
            ORDER BY episode_number
        "#,
        )
        .bind(podcast_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(title, episode_number, audio_url)| ExistingEpisode {
                title,
                episode_number,
                audio_url,
            })
            .collect())
    }

    /// Number of episodes stored for a podcast.
    pub async fn count_episodes(&self, podcast_id: i64) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM episodes WHERE podcast_id = ?")
            .bind(podcast_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    /// Insert reconciled episodes in batches, returning the inserted count.
    /// `script_url` is always NULL on feed inserts; authors attach scripts
    /// separately.
    pub async fn insert_episodes(&self, podcast_id: i64, episodes: &[NewEpisode]) -> Result<usize> {
        if episodes.is_empty() {
            return Ok(0);
        }

        const BATCH_SIZE: usize = 100;
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0usize;

        for chunk in episodes.chunks(BATCH_SIZE) {
            let mut builder: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
                "INSERT INTO episodes (podcast_id, title, description, audio_url, script_url, \
                 duration_seconds, episode_number, season_number, published_at, created_at) ",
            );

            builder.push_values(chunk, |mut b, episode| {
                b.push_bind(podcast_id)
                    .push_bind(&episode.title)
                    .push_bind(&episode.description)
                    .push_bind(&episode.audio_url)
                    .push_bind(Option::<String>::None)
                    .push_bind(episode.duration_seconds)
                    .push_bind(episode.episode_number)
                    .push_bind(episode.season_number)
                    .push_bind(episode.published_at)
                    .push_bind(now);
            });

            let result = builder.build().execute(&mut *tx).await?;
            inserted += result.rows_affected() as usize;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// All episodes of a podcast, season then number order.
    pub async fn episodes_for_podcast(&self, podcast_id: i64) -> Result<Vec<Episode>> {
        let episodes = sqlx::query_as::<_, Episode>(
            r#"
            SELECT id, podcast_id, title, description, audio_url, script_url,
                   duration_seconds, episode_number, season_number, published_at, created_at
            FROM episodes
            WHERE podcast_id = ?
            ORDER BY season_number, episode_number
        "#,
        )
        .bind(podcast_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(episodes)
    }
}
