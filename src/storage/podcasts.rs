use anyhow::Result;
use sqlx::QueryBuilder;

use super::schema::Database;
use super::types::{NewPodcast, Podcast, PodcastPatch};

const PODCAST_COLUMNS: &str = "id, author_id, title, description, cover_image_url, \
     feed_image_url, category, language, rss_url, workflow_mode, approved";

impl Database {
    // ========================================================================
    // Podcast Operations
    // ========================================================================

    /// Insert a podcast record, returning its id.
    pub async fn insert_podcast(&self, podcast: &NewPodcast) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO podcasts (author_id, title, description, cover_image_url,
                                  feed_image_url, category, language, rss_url,
                                  workflow_mode, approved)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
        "#,
        )
        .bind(&podcast.author_id)
        .bind(&podcast.title)
        .bind(&podcast.description)
        .bind(&podcast.cover_image_url)
        .bind(&podcast.feed_image_url)
        .bind(&podcast.category)
        .bind(&podcast.language)
        .bind(&podcast.rss_url)
        .bind(&podcast.workflow_mode)
        .bind(podcast.approved)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    /// Fetch a single podcast by id.
    pub async fn get_podcast(&self, podcast_id: i64) -> Result<Option<Podcast>> {
        let podcast = sqlx::query_as::<_, Podcast>(&format!(
            "SELECT {PODCAST_COLUMNS} FROM podcasts WHERE id = ?"
        ))
        .bind(podcast_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(podcast)
    }

    /// All podcasts owned by an author that have a feed URL to sync from.
    pub async fn get_author_podcasts_with_feed(&self, author_id: &str) -> Result<Vec<Podcast>> {
        let podcasts = sqlx::query_as::<_, Podcast>(&format!(
            r#"
            SELECT {PODCAST_COLUMNS} FROM podcasts
            WHERE author_id = ? AND rss_url IS NOT NULL AND rss_url != ''
            ORDER BY id
        "#
        ))
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(podcasts)
    }

    /// All approved podcasts platform-wide that have a feed URL.
    pub async fn get_approved_podcasts_with_feed(&self) -> Result<Vec<Podcast>> {
        let podcasts = sqlx::query_as::<_, Podcast>(&format!(
            r#"
            SELECT {PODCAST_COLUMNS} FROM podcasts
            WHERE approved = 1 AND rss_url IS NOT NULL AND rss_url != ''
            ORDER BY id
        "#
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(podcasts)
    }

    /// Apply a staged metadata patch, updating only the fields it carries.
    /// An empty patch is a no-op.
    pub async fn apply_podcast_patch(&self, podcast_id: i64, patch: &PodcastPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }

        let mut builder: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new("UPDATE podcasts SET ");
        {
            let mut assignments = builder.separated(", ");
            if let Some(title) = &patch.title {
                assignments.push("title = ").push_bind_unseparated(title);
            }
            if let Some(description) = &patch.description {
                assignments
                    .push("description = ")
                    .push_bind_unseparated(description);
            }
            if let Some(category) = &patch.category {
                assignments
                    .push("category = ")
                    .push_bind_unseparated(category);
            }
            if let Some(language) = &patch.language {
                assignments
                    .push("language = ")
                    .push_bind_unseparated(language);
            }
            if let Some(cover) = &patch.cover_image_url {
                assignments
                    .push("cover_image_url = ")
                    .push_bind_unseparated(cover);
            }
            if let Some(source) = &patch.feed_image_url {
                assignments
                    .push("feed_image_url = ")
                    .push_bind_unseparated(source);
            }
        }
        builder.push(" WHERE id = ");
        builder.push_bind(podcast_id);

        builder.build().execute(&self.pool).await?;
        Ok(())
    }
}
