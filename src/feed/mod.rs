//! Podcast feed retrieval and parsing.
//!
//! - [`parser`] - event-driven RSS parsing (iTunes namespace aware) on quick-xml
//! - [`fetcher`] - HTTP retrieval with timeouts and response size limits
//!
//! Fetch failures are never retried here; reconciliation simply yields zero
//! new episodes for the cycle and the next trigger tries again.

mod fetcher;
mod parser;

pub use fetcher::{fetch_feed, fetch_image, FetchError, FetchLimits};
pub use parser::{parse_feed, FeedItem, FeedMeta, ParseError, ParsedFeed};
