//! Month query with opportunistic self-healing.
//!
//! The read path for a route layer: turn a month/year filter into the
//! remote page to fetch, and feed whatever a live fetch revealed back
//! into the index. Live traffic only ever tightens start pages, so
//! concurrent queries are safe without locking as long as the store's
//! save is atomic.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::Result;
use crate::feed::classify;
use crate::models::{Article, MonthKey, MonthRecord};
use crate::store::IndexStore;

/// Query-time API surface over the month index.
pub struct MonthQuery {
    store: Arc<dyn IndexStore>,
}

impl MonthQuery {
    pub fn new(store: Arc<dyn IndexStore>) -> Self {
        Self { store }
    }

    /// The page to fetch for a month/year filter.
    ///
    /// An index hit returns the recorded start page; anything else
    /// (no filter, unknown month, unreadable store) falls back to the
    /// caller's requested page. Soft degradation, never an error.
    pub async fn resolve_page(
        &self,
        year: Option<i32>,
        month: Option<u32>,
        requested_page: u32,
    ) -> u32 {
        let requested = requested_page.max(1);
        let (Some(year), Some(month)) = (year, month) else {
            return requested;
        };
        if !(1..=12).contains(&month) {
            log::warn!("Ignoring out-of-range month filter: {month}");
            return requested;
        }

        match self.store.load().await {
            Ok(index) => {
                let key = MonthKey::new(year, month);
                match index.start_page(key) {
                    Some(page) => {
                        log::debug!("Index hit: {key} starts on page {page}");
                        page
                    }
                    None => requested,
                }
            }
            Err(error) => {
                log::warn!("Index unavailable, falling back to page {requested}: {error}");
                requested
            }
        }
    }

    /// Feed one fetched page back into the index.
    ///
    /// Every month present on the page is upserted only if that
    /// tightens its record (or creates one; the observed page may
    /// overestimate the true start, which a later full scan corrects
    /// downward). Returns how many records were written.
    pub async fn record_observation(&self, page: u32, articles: &[Article]) -> Result<usize> {
        let summary = classify(articles);
        if summary.is_empty() {
            return Ok(0);
        }

        let index = self.store.load().await?;
        let tightened: BTreeMap<MonthKey, MonthRecord> = summary
            .month_counts
            .iter()
            .filter(|&(&key, _)| index.start_page(key).is_none_or(|recorded| recorded > page))
            .map(|(&key, &count)| {
                (
                    key,
                    MonthRecord {
                        start_page: page,
                        article_count: count,
                    },
                )
            })
            .collect();

        if tightened.is_empty() {
            return Ok(0);
        }

        self.store.merge(&tightened, None).await?;
        log::debug!(
            "Observation of page {page} tightened {} month(s)",
            tightened.len()
        );
        Ok(tightened.len())
    }

    /// All months the index knows about, newest first.
    pub async fn list_available_months(&self) -> Result<Vec<MonthKey>> {
        Ok(self.store.load().await?.months_newest_first())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::testing::SyntheticFeed;
    use crate::models::MonthIndex;
    use crate::store::LocalStore;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Arc<LocalStore>, MonthQuery) {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(LocalStore::new(tmp.path()));
        let query = MonthQuery::new(store.clone() as Arc<dyn IndexStore>);
        (tmp, store, query)
    }

    #[tokio::test]
    async fn test_resolve_without_filter_returns_requested() {
        let (_tmp, _store, query) = setup();

        assert_eq!(query.resolve_page(None, None, 3).await, 3);
        assert_eq!(query.resolve_page(Some(2024), None, 3).await, 3);
        assert_eq!(query.resolve_page(None, Some(2), 3).await, 3);
    }

    #[tokio::test]
    async fn test_resolve_before_any_build_returns_requested() {
        let (_tmp, _store, query) = setup();

        assert_eq!(query.resolve_page(Some(2024), Some(2), 1).await, 1);
    }

    #[tokio::test]
    async fn test_resolve_clamps_page_zero() {
        let (_tmp, _store, query) = setup();

        assert_eq!(query.resolve_page(None, None, 0).await, 1);
    }

    #[tokio::test]
    async fn test_resolve_hits_the_index() {
        let (_tmp, store, query) = setup();

        let mut index = MonthIndex::default();
        index.upsert(MonthKey::new(2019, 3), 27, 0);
        store.save(&index).await.unwrap();

        assert_eq!(query.resolve_page(Some(2019), Some(3), 1).await, 27);
        assert_eq!(query.resolve_page(Some(2019), Some(4), 1).await, 1);
    }

    #[tokio::test]
    async fn test_observation_then_resolution() {
        // Query before any build falls back; the caller fetches page 2
        // directly and reports back; the next query is a hit.
        let (_tmp, _store, query) = setup();

        assert_eq!(query.resolve_page(Some(2024), Some(2), 1).await, 1);

        let fetched = vec![
            SyntheticFeed::article(1, 2024, 2, 20),
            SyntheticFeed::article(2, 2024, 2, 5),
        ];
        let written = query.record_observation(2, &fetched).await.unwrap();
        assert_eq!(written, 1);

        assert_eq!(query.resolve_page(Some(2024), Some(2), 1).await, 2);
    }

    #[tokio::test]
    async fn test_observation_only_tightens() {
        let (_tmp, store, query) = setup();

        let mut index = MonthIndex::default();
        index.upsert(MonthKey::new(2024, 2), 2, 0);
        store.save(&index).await.unwrap();

        // Seeing February again on a later page must not loosen it
        let later = vec![SyntheticFeed::article(1, 2024, 2, 1)];
        let written = query.record_observation(5, &later).await.unwrap();
        assert_eq!(written, 0);
        assert_eq!(query.resolve_page(Some(2024), Some(2), 1).await, 2);

        // Seeing it on an earlier page tightens
        let earlier = vec![SyntheticFeed::article(2, 2024, 2, 28)];
        let written = query.record_observation(1, &earlier).await.unwrap();
        assert_eq!(written, 1);
        assert_eq!(query.resolve_page(Some(2024), Some(2), 3).await, 1);
    }

    #[tokio::test]
    async fn test_observation_of_empty_page_is_a_noop() {
        let (_tmp, store, query) = setup();

        assert_eq!(query.record_observation(4, &[]).await.unwrap(), 0);
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_available_months_newest_first() {
        let (_tmp, store, query) = setup();

        let mut index = MonthIndex::default();
        index.upsert(MonthKey::new(2023, 11), 14, 0);
        index.upsert(MonthKey::new(2024, 2), 3, 0);
        index.upsert(MonthKey::new(2024, 1), 7, 0);
        store.save(&index).await.unwrap();

        assert_eq!(
            query.list_available_months().await.unwrap(),
            vec![
                MonthKey::new(2024, 2),
                MonthKey::new(2024, 1),
                MonthKey::new(2023, 11),
            ]
        );
    }
}
