// src/feed/mod.rs

//! Remote feed access: client, rate-limited fetcher, page classifier.

pub mod classify;
pub mod client;
pub mod fetcher;

pub use classify::{PageSummary, classify};
pub use client::FeedbinClient;
pub use fetcher::{FetchPolicy, PageData, RateLimitedFetcher};

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Article;

/// A paginated, newest-first starred-article feed.
///
/// Page numbers are 1-indexed. An `Ok` empty page means the feed is
/// genuinely exhausted at that page; throttling is signalled with
/// [`crate::error::AppError::Throttled`] so the fetcher can back off.
#[async_trait]
pub trait StarredFeed: Send + Sync {
    /// Fetch one page of starred articles, newest first.
    async fn fetch_page(&self, page: u32) -> Result<Vec<Article>>;

    /// Current total starred-article count.
    async fn total_starred(&self) -> Result<u64>;
}
