use std::sync::Arc;

use serde::Serialize;

use crate::feed::{fetch_feed, FetchLimits};
use crate::storage::{Database, Podcast};

use super::images::ImageStore;
use super::metadata::stage_updates;
use super::reconcile::reconcile;
use super::SyncError;

/// Shared sync engine handed to every API handler.
#[derive(Clone)]
pub struct Syncer {
    db: Database,
    client: reqwest::Client,
    images: Arc<ImageStore>,
    limits: FetchLimits,
}

/// Result of syncing one podcast.
#[derive(Debug, Serialize)]
pub struct SyncOutcome {
    pub podcast_id: i64,
    pub existing_episodes: usize,
    pub new_episodes: usize,
    pub metadata_updated: bool,
    pub image_updated: bool,
}

/// One podcast's entry in a batch report. Failures carry the error
/// message instead of a count.
#[derive(Debug, Serialize)]
pub struct PodcastSyncReport {
    pub podcast_id: i64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_episodes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PodcastSyncReport {
    fn ok(podcast: &Podcast, new_episodes: usize) -> Self {
        Self {
            podcast_id: podcast.id,
            title: podcast.title.clone(),
            new_episodes: Some(new_episodes),
            error: None,
        }
    }

    fn failed(podcast: &Podcast, error: &SyncError) -> Self {
        Self {
            podcast_id: podcast.id,
            title: podcast.title.clone(),
            new_episodes: None,
            error: Some(error.to_string()),
        }
    }
}

/// Aggregate result of a platform-wide sync.
#[derive(Debug, Serialize)]
pub struct BatchSummary {
    pub podcasts_processed: usize,
    pub new_episodes: usize,
    pub errors: usize,
    pub reports: Vec<PodcastSyncReport>,
}

impl Syncer {
    pub fn new(
        db: Database,
        client: reqwest::Client,
        images: Arc<ImageStore>,
        limits: FetchLimits,
    ) -> Self {
        Self {
            db,
            client,
            images,
            limits,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn images(&self) -> &ImageStore {
        &self.images
    }

    /// Full sync of a single podcast: fetch, reconcile, insert, then
    /// stage and apply metadata updates.
    pub async fn sync_podcast(&self, podcast: &Podcast) -> Result<SyncOutcome, SyncError> {
        let rss_url = podcast
            .rss_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(SyncError::NotFound)?;

        let parsed = fetch_feed(&self.client, rss_url, &self.limits).await?;
        if parsed.skipped > 0 {
            tracing::debug!(
                podcast_id = podcast.id,
                skipped = parsed.skipped,
                "Feed items lacked both title and enclosure"
            );
        }

        let existing = self
            .db
            .episode_keys(podcast.id)
            .await
            .map_err(|e| SyncError::Persistence(e.to_string()))?;

        let new_episodes = reconcile(&existing, &parsed.items);
        let inserted = if new_episodes.is_empty() {
            0
        } else {
            self.db
                .insert_episodes(podcast.id, &new_episodes)
                .await
                .map_err(|e| SyncError::Persistence(e.to_string()))?
        };

        let staged = stage_updates(
            &self.client,
            &self.images,
            &self.limits,
            podcast,
            &parsed.meta,
        )
        .await;

        if staged.changed {
            self.db
                .apply_podcast_patch(podcast.id, &staged.patch)
                .await
                .map_err(|e| SyncError::Persistence(e.to_string()))?;
        }

        tracing::info!(
            podcast_id = podcast.id,
            new_episodes = inserted,
            metadata_updated = staged.changed,
            image_updated = staged.image_updated,
            "Podcast synced"
        );

        Ok(SyncOutcome {
            podcast_id: podcast.id,
            existing_episodes: existing.len(),
            new_episodes: inserted,
            metadata_updated: staged.changed,
            image_updated: staged.image_updated,
        })
    }

    /// Syncs every feed-backed podcast an author owns, sequentially.
    /// Per-podcast failures are reported, never aborting the batch.
    pub async fn sync_author(&self, author_id: &str) -> Result<Vec<PodcastSyncReport>, SyncError> {
        let podcasts = self
            .db
            .get_author_podcasts_with_feed(author_id)
            .await
            .map_err(|e| SyncError::Persistence(e.to_string()))?;

        let mut reports = Vec::with_capacity(podcasts.len());
        for podcast in &podcasts {
            match self.sync_podcast(podcast).await {
                Ok(outcome) => reports.push(PodcastSyncReport::ok(podcast, outcome.new_episodes)),
                Err(e) => {
                    tracing::warn!(
                        podcast_id = podcast.id,
                        author_id = %author_id,
                        error = %e,
                        "Podcast sync failed in author batch"
                    );
                    reports.push(PodcastSyncReport::failed(podcast, &e));
                }
            }
        }

        Ok(reports)
    }

    /// Syncs every approved feed-backed podcast on the platform.
    pub async fn sync_all_approved(&self) -> Result<BatchSummary, SyncError> {
        let podcasts = self
            .db
            .get_approved_podcasts_with_feed()
            .await
            .map_err(|e| SyncError::Persistence(e.to_string()))?;

        let mut summary = BatchSummary {
            podcasts_processed: podcasts.len(),
            new_episodes: 0,
            errors: 0,
            reports: Vec::with_capacity(podcasts.len()),
        };

        for podcast in &podcasts {
            match self.sync_podcast(podcast).await {
                Ok(outcome) => {
                    summary.new_episodes += outcome.new_episodes;
                    summary
                        .reports
                        .push(PodcastSyncReport::ok(podcast, outcome.new_episodes));
                }
                Err(e) => {
                    tracing::warn!(
                        podcast_id = podcast.id,
                        error = %e,
                        "Podcast sync failed in platform batch"
                    );
                    summary.errors += 1;
                    summary.reports.push(PodcastSyncReport::failed(podcast, &e));
                }
            }
        }

        tracing::info!(
            podcasts = summary.podcasts_processed,
            new_episodes = summary.new_episodes,
            errors = summary.errors,
            "Platform sync complete"
        );

        Ok(summary)
    }
}
