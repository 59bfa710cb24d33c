use crate::feed::parser::{parse_feed, ParsedFeed};
use crate::util::validate_url;
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while retrieving a feed or image over HTTP.
///
/// These cover URL policy rejections, network issues, HTTP status
/// failures, oversized bodies, and feed documents that fetched fine but
/// could not be parsed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// URL failed validation (unparseable, bad scheme, forbidden host)
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Request exceeded the configured timeout
    #[error("request timed out")]
    Timeout,
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Response body exceeded the configured size limit
    #[error("response too large")]
    TooLarge,
    /// Document fetched but could not be parsed as a podcast feed
    #[error("feed malformed: {0}")]
    Malformed(String),
}

/// Size, time, and URL policy limits applied to every outbound request.
#[derive(Debug, Clone, Copy)]
pub struct FetchLimits {
    pub timeout: Duration,
    pub max_feed_bytes: usize,
    pub max_image_bytes: usize,
    /// Admit localhost and private-range hosts. Off by default; intended
    /// for deployments syncing feeds from inside their own network.
    pub allow_private_hosts: bool,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_feed_bytes: 10 * 1024 * 1024,
            max_image_bytes: 5 * 1024 * 1024,
            allow_private_hosts: false,
        }
    }
}

/// Retrieves and parses a podcast feed.
///
/// A failed fetch is not retried: the caller reports the failure and the
/// next manual or scheduled trigger tries again.
///
/// # Errors
///
/// - [`FetchError::InvalidUrl`] - URL rejected before any request is made
/// - [`FetchError::Network`] - connection or TLS errors
/// - [`FetchError::Timeout`] - request exceeded [`FetchLimits::timeout`]
/// - [`FetchError::HttpStatus`] - non-2xx HTTP response
/// - [`FetchError::TooLarge`] - body exceeded [`FetchLimits::max_feed_bytes`]
/// - [`FetchError::Malformed`] - invalid RSS document
pub async fn fetch_feed(
    client: &reqwest::Client,
    url: &str,
    limits: &FetchLimits,
) -> Result<ParsedFeed, FetchError> {
    validate_url(url, limits.allow_private_hosts)
        .map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

    let response = tokio::time::timeout(limits.timeout, client.get(url).send())
        .await
        .map_err(|_| FetchError::Timeout)?
        .map_err(FetchError::Network)?;

    if !response.status().is_success() {
        return Err(FetchError::HttpStatus(response.status().as_u16()));
    }

    let bytes = read_limited(response, limits.max_feed_bytes).await?;
    parse_feed(&bytes).map_err(|e| FetchError::Malformed(e.to_string()))
}

/// Retrieves raw image bytes plus the response content type (media type
/// only, parameters stripped). Same limits and no-retry policy as
/// [`fetch_feed`], with [`FetchLimits::max_image_bytes`] as the size cap.
pub async fn fetch_image(
    client: &reqwest::Client,
    url: &str,
    limits: &FetchLimits,
) -> Result<(Vec<u8>, Option<String>), FetchError> {
    validate_url(url, limits.allow_private_hosts)
        .map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

    let response = tokio::time::timeout(limits.timeout, client.get(url).send())
        .await
        .map_err(|_| FetchError::Timeout)?
        .map_err(FetchError::Network)?;

    if !response.status().is_success() {
        return Err(FetchError::HttpStatus(response.status().as_u16()));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());

    let bytes = read_limited(response, limits.max_image_bytes).await?;
    Ok((bytes, content_type))
}

async fn read_limited(response: reqwest::Response, limit: usize) -> Result<Vec<u8>, FetchError> {
    // Fast path: reject on Content-Length before streaming
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::TooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::TooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
