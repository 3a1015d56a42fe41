//! Durable storage for the month index and scan checkpoint.
//!
//! The index and checkpoint are the only shared mutable state in the
//! system. The contract assumes at most one build runs at a time
//! (cooperative single-writer); self-healing query writers are safe
//! alongside each other because they only ever tighten start pages and
//! every write goes through [`IndexStore::merge`], which re-loads the
//! persisted index before saving. A stale in-memory copy is never
//! written back wholesale.

pub mod local;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::Result;
use crate::models::{Checkpoint, MonthIndex, MonthKey, MonthRecord};

// Re-export for convenience
pub use local::LocalStore;

/// Trait for index storage backends.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Load the persisted index.
    ///
    /// Returns a fresh empty index when none is persisted yet, and
    /// also when the persisted one fails to parse (logged, rebuilt
    /// from scratch). Never fails on "not found".
    async fn load(&self) -> Result<MonthIndex>;

    /// Persist the index atomically: a concurrent reader sees either
    /// the old or the new document, never a partial write.
    async fn save(&self, index: &MonthIndex) -> Result<()>;

    /// Load-merge-save: fold `records` into the currently persisted
    /// index (minimum start page wins, advisory counts summed) and
    /// save the result. All writers must use this rather than saving
    /// a mutated copy of an earlier `load`.
    async fn merge(
        &self,
        records: &BTreeMap<MonthKey, MonthRecord>,
        total_articles: Option<u64>,
    ) -> Result<MonthIndex> {
        let mut index = self.load().await?;
        index.merge_records(records);
        if let Some(total) = total_articles {
            index.total_articles = total;
        }
        index.updated_at = Utc::now();
        self.save(&index).await?;
        Ok(index)
    }

    /// Load the scan checkpoint, if one is persisted.
    async fn load_checkpoint(&self) -> Result<Option<Checkpoint>>;

    /// Persist the scan checkpoint atomically.
    async fn save_checkpoint(&self, checkpoint: &Checkpoint) -> Result<()>;

    /// Remove the checkpoint; a missing checkpoint is not an error.
    async fn delete_checkpoint(&self) -> Result<()>;
}
