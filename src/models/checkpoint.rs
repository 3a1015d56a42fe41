//! Scan checkpoint for resume capability.
//!
//! The authoritative resume state is exactly one integer:
//! `last_page_processed`. The `remaining_months` list is recomputed on
//! every save from the earliest month seen so far and is a progress
//! hint for a human reading the file, never control flow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::MonthKey;

/// Durable record of how far a scan got.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Checkpoint {
    /// Highest page fully classified and merged into the index
    pub last_page_processed: u32,

    /// Months still expected between here and the cutoff year.
    /// Derived diagnostic; resume reads `last_page_processed` only.
    pub remaining_months: Vec<MonthKey>,

    /// When this checkpoint was written
    pub saved_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Build a checkpoint, deriving the remaining-months hint from the
    /// earliest month this scan has seen and the configured cutoff.
    pub fn new(
        last_page_processed: u32,
        earliest_seen: Option<MonthKey>,
        earliest_year: i32,
    ) -> Self {
        Self {
            last_page_processed,
            remaining_months: derive_remaining(earliest_seen, earliest_year),
            saved_at: Utc::now(),
        }
    }
}

/// Months between the earliest one seen (exclusive) and January of the
/// cutoff year (inclusive), newest first.
fn derive_remaining(earliest_seen: Option<MonthKey>, earliest_year: i32) -> Vec<MonthKey> {
    let Some(seen) = earliest_seen else {
        return Vec::new();
    };

    let floor = MonthKey::new(earliest_year, 1);
    let mut remaining = Vec::new();
    let mut cursor = seen.pred();
    while cursor >= floor {
        remaining.push(cursor);
        cursor = cursor.pred();
    }
    remaining
}
