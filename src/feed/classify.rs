//! Page classification.
//!
//! Pure function over one page's worth of articles: which months are
//! present, how many articles each got, and the chronological extremes.

use std::collections::BTreeMap;

use crate::models::{Article, MonthKey};

/// What one page of the feed told us.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageSummary {
    /// Months present on the page, with per-month article counts
    pub month_counts: BTreeMap<MonthKey, u64>,

    /// Month of the chronologically oldest article on the page
    pub oldest: Option<MonthKey>,

    /// Month of the chronologically newest article on the page
    pub newest: Option<MonthKey>,
}

impl PageSummary {
    pub fn is_empty(&self) -> bool {
        self.month_counts.is_empty()
    }
}

/// Classify a page of articles.
///
/// Extremes are decided on full timestamps, not the bucketed month, so
/// cross-month comparisons within one page come out right. An empty
/// page yields an empty summary with `None` extremes; the caller must
/// treat that distinctly from "page has data but no month transition".
pub fn classify(articles: &[Article]) -> PageSummary {
    let mut summary = PageSummary::default();

    let mut oldest_ts = None;
    let mut newest_ts = None;

    for article in articles {
        *summary.month_counts.entry(article.month_key()).or_insert(0) += 1;

        if oldest_ts.is_none_or(|ts| article.published < ts) {
            oldest_ts = Some(article.published);
            summary.oldest = Some(article.month_key());
        }
        if newest_ts.is_none_or(|ts| article.published > ts) {
            newest_ts = Some(article.published);
            summary.newest = Some(article.month_key());
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn article(id: u64, y: i32, m: u32, d: u32, h: u32) -> Article {
        Article {
            id,
            title: None,
            url: None,
            published: Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_empty_page() {
        let summary = classify(&[]);
        assert!(summary.is_empty());
        assert_eq!(summary.oldest, None);
        assert_eq!(summary.newest, None);
    }

    #[test]
    fn test_single_month_page() {
        let summary = classify(&[article(1, 2024, 3, 10, 0), article(2, 2024, 3, 1, 0)]);

        assert_eq!(summary.month_counts.len(), 1);
        assert_eq!(summary.month_counts[&MonthKey::new(2024, 3)], 2);
        assert_eq!(summary.oldest, Some(MonthKey::new(2024, 3)));
        assert_eq!(summary.newest, Some(MonthKey::new(2024, 3)));
    }

    #[test]
    fn test_month_boundary_page() {
        let summary = classify(&[
            article(1, 2024, 2, 20, 0),
            article(2, 2024, 1, 15, 0),
            article(3, 2024, 2, 1, 0),
        ]);

        assert_eq!(summary.month_counts[&MonthKey::new(2024, 2)], 2);
        assert_eq!(summary.month_counts[&MonthKey::new(2024, 1)], 1);
        assert_eq!(summary.oldest, Some(MonthKey::new(2024, 1)));
        assert_eq!(summary.newest, Some(MonthKey::new(2024, 2)));
    }

    #[test]
    fn test_extremes_use_full_timestamps() {
        // Same calendar day, different hours: timestamp decides
        let summary = classify(&[article(1, 2024, 1, 31, 23), article(2, 2024, 2, 1, 0)]);

        assert_eq!(summary.oldest, Some(MonthKey::new(2024, 1)));
        assert_eq!(summary.newest, Some(MonthKey::new(2024, 2)));
    }
}
