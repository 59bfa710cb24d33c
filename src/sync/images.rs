use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::feed::{fetch_image, FetchLimits};

/// Local store for re-hosted podcast cover images.
///
/// Filenames are derived from the sha256 of the source URL, so re-hosting
/// the same image twice overwrites in place instead of accumulating copies.
pub struct ImageStore {
    dir: PathBuf,
    public_base_url: String,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>, public_base_url: &str) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Directory images are written to (served under `/media`).
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Downloads an image and writes it into the store, returning its
    /// public URL. Any failure leaves the caller to fall back to the
    /// remote URL.
    pub async fn rehost(
        &self,
        client: &reqwest::Client,
        source_url: &str,
        limits: &FetchLimits,
    ) -> Result<String> {
        let (bytes, content_type) = fetch_image(client, source_url, limits)
            .await
            .with_context(|| format!("failed to download image from {}", source_url))?;

        let ext = extension_for(content_type.as_deref(), source_url);
        let name = format!("{:x}.{}", Sha256::digest(source_url.as_bytes()), ext);
        let path = self.dir.join(&name);

        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("failed to write image to {}", path.display()))?;

        tracing::debug!(source = %source_url, file = %name, bytes = bytes.len(), "Re-hosted cover image");
        Ok(format!("{}/{}", self.public_base_url, name))
    }
}

/// File extension from the response content type, falling back to the
/// source URL's path extension, then to a neutral default.
fn extension_for(content_type: Option<&str>, source_url: &str) -> String {
    match content_type {
        Some("image/jpeg") => return "jpg".to_string(),
        Some("image/png") => return "png".to_string(),
        Some("image/gif") => return "gif".to_string(),
        Some("image/webp") => return "webp".to_string(),
        _ => {}
    }

    url::Url::parse(source_url)
        .ok()
        .and_then(|u| {
            Path::new(u.path())
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
        })
        .filter(|e| e.len() <= 5 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "img".to_string())
}
