//! Rate-limited page fetching.
//!
//! Wraps a [`StarredFeed`] and enforces the politeness rules the
//! remote API expects: a fixed delay plus jitter before every request,
//! and bounded exponential backoff when the feed throttles us. Other
//! transport errors degrade to an "unavailable" page so one flaky page
//! cannot abort a multi-hour scan.

use std::time::Duration;

use rand::Rng;

use crate::config::FetchConfig;
use crate::error::{AppError, Result};
use crate::feed::StarredFeed;
use crate::models::Article;

/// Outcome of fetching one page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageData {
    /// Page fetched with data
    Articles(Vec<Article>),

    /// HTTP success with zero entries: genuine end of feed
    Exhausted,

    /// Transport/server error; caller skips the page and must not
    /// treat it as end-of-feed
    Unavailable,
}

/// Delay and retry policy.
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    /// Fixed delay before every request
    pub base_delay: Duration,

    /// Backoff ceiling
    pub max_delay: Duration,

    /// Upper bound of the random jitter added to every delay
    pub jitter: Duration,

    /// Retries per page after a throttled response
    pub max_retries: u32,
}

impl FetchPolicy {
    /// Backoff delay for the given retry attempt (1-based):
    /// `min(max_delay, base_delay * 2^attempt)`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(16);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl From<&FetchConfig> for FetchPolicy {
    fn from(config: &FetchConfig) -> Self {
        Self {
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter: Duration::from_millis(config.jitter_ms),
            max_retries: config.max_retries,
        }
    }
}

/// Sequential page fetcher with rate limiting and backoff.
///
/// Stateless beyond its policy; pages must still be requested in
/// ascending order by the caller for the scan invariants to hold.
pub struct RateLimitedFetcher<F> {
    feed: F,
    policy: FetchPolicy,
}

impl<F: StarredFeed> RateLimitedFetcher<F> {
    pub fn new(feed: F, policy: FetchPolicy) -> Self {
        Self { feed, policy }
    }

    /// Fetch one page, retrying throttled responses with exponential
    /// backoff. Returns [`AppError::RateLimited`] once the retry
    /// budget is spent; the page then counts as unfetched.
    pub async fn fetch(&self, page: u32) -> Result<PageData> {
        let mut attempt = 0u32;
        loop {
            let delay = if attempt == 0 {
                self.policy.base_delay + self.jitter()
            } else {
                self.policy.backoff_delay(attempt) + self.jitter()
            };
            tokio::time::sleep(delay).await;

            match self.feed.fetch_page(page).await {
                Ok(articles) if articles.is_empty() => return Ok(PageData::Exhausted),
                Ok(articles) => return Ok(PageData::Articles(articles)),
                Err(AppError::Throttled { .. }) => {
                    attempt += 1;
                    if attempt > self.policy.max_retries {
                        return Err(AppError::RateLimited {
                            page,
                            attempts: attempt,
                        });
                    }
                    log::warn!(
                        "Throttled on page {page}, retry {attempt}/{} after backoff",
                        self.policy.max_retries
                    );
                }
                Err(error) => {
                    log::warn!("Fetch failed for page {page}, skipping: {error}");
                    return Ok(PageData::Unavailable);
                }
            }
        }
    }

    /// Current total starred count from the remote feed.
    pub async fn total_starred(&self) -> Result<u64> {
        self.feed.total_starred().await
    }

    fn jitter(&self) -> Duration {
        let bound = self.policy.jitter.as_millis() as u64;
        if bound == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..=bound))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::testing::{Scripted, SyntheticFeed};
    use std::sync::atomic::Ordering;

    fn quick_policy() -> FetchPolicy {
        FetchPolicy {
            base_delay: Duration::ZERO,
            max_delay: Duration::from_millis(1),
            jitter: Duration::ZERO,
            max_retries: 3,
        }
    }

    fn one_page_feed() -> Vec<Vec<Article>> {
        vec![vec![SyntheticFeed::article(1, 2024, 3, 10)]]
    }

    #[test]
    fn test_backoff_is_exponential_and_capped() {
        let policy = FetchPolicy {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1_500),
            jitter: Duration::ZERO,
            max_retries: 10,
        };

        assert_eq!(policy.backoff_delay(1), Duration::from_millis(200));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(400));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(800));
        // Capped at max_delay from here on
        assert_eq!(policy.backoff_delay(4), Duration::from_millis(1_500));
        assert_eq!(policy.backoff_delay(30), Duration::from_millis(1_500));
    }

    #[tokio::test]
    async fn test_fetch_returns_articles() {
        let fetcher = RateLimitedFetcher::new(SyntheticFeed::new(one_page_feed()), quick_policy());

        match fetcher.fetch(1).await.unwrap() {
            PageData::Articles(articles) => assert_eq!(articles.len(), 1),
            other => panic!("expected articles, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_past_end_is_exhausted() {
        let fetcher = RateLimitedFetcher::new(SyntheticFeed::new(one_page_feed()), quick_policy());

        assert_eq!(fetcher.fetch(2).await.unwrap(), PageData::Exhausted);
    }

    #[tokio::test]
    async fn test_throttle_retried_then_succeeds() {
        let feed = SyntheticFeed::new(one_page_feed()).script(1, Scripted::ThrottleOnce);
        let fetcher = RateLimitedFetcher::new(feed, quick_policy());

        match fetcher.fetch(1).await.unwrap() {
            PageData::Articles(articles) => assert_eq!(articles.len(), 1),
            other => panic!("expected articles after retry, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_throttle_exhausts_retry_budget() {
        let feed = SyntheticFeed::new(one_page_feed()).script(1, Scripted::ThrottleAlways);
        let fetcher = RateLimitedFetcher::new(feed, quick_policy());

        let error = fetcher.fetch(1).await.unwrap_err();
        match error {
            AppError::RateLimited { page, attempts } => {
                assert_eq!(page, 1);
                assert_eq!(attempts, 4); // initial try + 3 retries
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transport_error_degrades_to_unavailable() {
        let feed = SyntheticFeed::new(one_page_feed()).script(1, Scripted::FailOnce);
        let fetcher = RateLimitedFetcher::new(feed, quick_policy());

        // Not retried, not an error: caller skips the page
        assert_eq!(fetcher.fetch(1).await.unwrap(), PageData::Unavailable);
    }

    #[tokio::test]
    async fn test_rate_limited_page_counts_as_unfetched() {
        let feed = SyntheticFeed::new(one_page_feed()).script(1, Scripted::ThrottleAlways);
        let fetcher = RateLimitedFetcher::new(feed, quick_policy());

        let _ = fetcher.fetch(1).await;
        // initial try + max_retries, nothing beyond the budget
        assert_eq!(fetcher.feed.fetch_count.load(Ordering::SeqCst), 4);
    }
}
