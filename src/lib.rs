//! retell-sync: podcast RSS ingestion and reconciliation for the Retell
//! licensing marketplace.
//!
//! The service watches author-registered RSS feeds, reconciles their items
//! against the episode catalog (dedup by title and audio URL, stable
//! episode numbering), keeps podcast metadata in step with the feed, and
//! re-hosts cover art locally. Syncs are triggered over HTTP: per podcast,
//! per author, or platform-wide for scheduled runs.

pub mod api;
pub mod config;
pub mod feed;
pub mod storage;
pub mod sync;
pub mod util;
