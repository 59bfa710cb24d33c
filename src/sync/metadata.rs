use crate::feed::{FeedMeta, FetchLimits};
use crate::storage::{Podcast, PodcastPatch};

use super::images::ImageStore;

/// The metadata side of a sync run: a patch ready to persist plus flags
/// for the outcome report.
#[derive(Debug)]
pub struct StagedUpdate {
    pub patch: PodcastPatch,
    pub changed: bool,
    pub image_updated: bool,
}

/// Diffs feed metadata against the stored podcast, staging only fields
/// that are present in the feed and differ from what is stored. Blank
/// feed values never overwrite existing data.
pub fn diff_fields(podcast: &Podcast, meta: &FeedMeta) -> PodcastPatch {
    let mut patch = PodcastPatch::default();

    if let Some(title) = present(&meta.title) {
        if title != podcast.title {
            patch.title = Some(title.to_string());
        }
    }
    if let Some(description) = present(&meta.description) {
        if Some(description) != podcast.description.as_deref() {
            patch.description = Some(description.to_string());
        }
    }
    if let Some(category) = present(&meta.category) {
        if Some(category) != podcast.category.as_deref() {
            patch.category = Some(category.to_string());
        }
    }
    if let Some(language) = present(&meta.language) {
        if Some(language) != podcast.language.as_deref() {
            patch.language = Some(language.to_string());
        }
    }

    patch
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Builds the full update for one sync: text field diffs plus, when the
/// feed's image URL changed, a re-hosted cover image.
///
/// Re-hosting failures are logged and fall back to the remote URL so a
/// flaky image host never fails the sync.
pub async fn stage_updates(
    client: &reqwest::Client,
    images: &ImageStore,
    limits: &FetchLimits,
    podcast: &Podcast,
    meta: &FeedMeta,
) -> StagedUpdate {
    let mut patch = diff_fields(podcast, meta);
    let mut image_updated = false;

    if let Some(source_url) = present(&meta.image_url) {
        if podcast.feed_image_url.as_deref() != Some(source_url) {
            let cover = match images.rehost(client, source_url, limits).await {
                Ok(public_url) => public_url,
                Err(e) => {
                    tracing::warn!(
                        podcast_id = podcast.id,
                        source = %source_url,
                        error = %e,
                        "Image re-hosting failed, keeping remote URL"
                    );
                    source_url.to_string()
                }
            };
            patch.cover_image_url = Some(cover);
            patch.feed_image_url = Some(source_url.to_string());
            image_updated = true;
        }
    }

    let changed = !patch.is_empty();
    StagedUpdate {
        patch,
        changed,
        image_updated,
    }
}
