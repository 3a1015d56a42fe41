//! The persisted month index.
//!
//! Maps each calendar month to the lowest page number on which one of
//! its articles has been observed in the remote feed's newest-first
//! ordering. Merging only ever moves a start page earlier, so repeated
//! and overlapping scans converge to the same answer.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::MonthKey;

/// Per-month index payload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MonthRecord {
    /// Lowest page on which an article from this month was observed
    pub start_page: u32,

    /// Articles attributed to this month across all scans. Advisory
    /// only, never used for correctness.
    #[serde(default)]
    pub article_count: u64,
}

/// The durable month-to-page index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthIndex {
    /// Format version for cache busting
    pub version: u32,

    /// Timestamp of last successful save
    pub updated_at: DateTime<Utc>,

    /// Remote feed's total starred count as observed at last save.
    /// Used only to bound a scan, never trusted blindly.
    pub total_articles: u64,

    /// One record per month, keyed "YYYY-MM"
    pub entries: BTreeMap<MonthKey, MonthRecord>,
}

impl Default for MonthIndex {
    fn default() -> Self {
        Self {
            version: 1,
            updated_at: Utc::now(),
            total_articles: 0,
            entries: BTreeMap::new(),
        }
    }
}

impl MonthIndex {
    /// Look up the recorded start page for a month.
    pub fn start_page(&self, key: MonthKey) -> Option<u32> {
        self.entries.get(&key).map(|r| r.start_page)
    }

    /// Merge one observation into the index.
    ///
    /// Keeps the smaller start page (a later scan may discover an
    /// earlier true start, never a later one) and sums the advisory
    /// article count. Applying the same observation twice is a no-op
    /// for the start page.
    pub fn upsert(&mut self, key: MonthKey, start_page: u32, article_count: u64) {
        self.entries
            .entry(key)
            .and_modify(|record| {
                record.start_page = record.start_page.min(start_page);
                record.article_count += article_count;
            })
            .or_insert(MonthRecord {
                start_page,
                article_count,
            });
    }

    /// Merge a whole set of records, e.g. one scan's working set.
    pub fn merge_records(&mut self, records: &BTreeMap<MonthKey, MonthRecord>) {
        for (key, record) in records {
            self.upsert(*key, record.start_page, record.article_count);
        }
    }

    /// All indexed months, newest first.
    pub fn months_newest_first(&self) -> Vec<MonthKey> {
        self.entries.keys().rev().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
