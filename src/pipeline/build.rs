//! Index build pipeline.
//!
//! Walks the feed from the newest page forward, recording the first
//! page on which each month is observed, and merges the run's working
//! set into the persisted index. Pages are fetched strictly in
//! ascending order; the first-sighting-wins rule depends on it.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::BuildSettings;
use crate::error::{AppError, Result};
use crate::feed::{PageData, PageSummary, RateLimitedFetcher, StarredFeed, classify};
use crate::models::{Checkpoint, MonthKey, MonthRecord};
use crate::store::IndexStore;

/// How a build run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// From page 1
    Full,
    /// From the checkpoint's next page; falls back to a full scan when
    /// no checkpoint is persisted
    Resume,
}

/// Builder life cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Scanning,
    /// Stopped early with progress persisted; resumable
    Checkpointed,
    Completed,
    Failed,
}

/// What a build run accomplished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// Months recorded by this run
    pub entries_found: usize,

    /// Pages visited by this run (including skipped unavailable ones)
    pub pages_scanned: u32,

    /// Whether the run reached a stopping condition rather than an
    /// interruption
    pub completed: bool,
}

/// One run's in-memory working set.
struct RunState {
    records: BTreeMap<MonthKey, MonthRecord>,
    /// Month of the first article observed this run
    leading: Option<MonthKey>,
    /// Chronologically earliest month seen so far
    earliest: Option<MonthKey>,
    pages_scanned: u32,
    /// Whether this run started at page 1 and therefore observed the
    /// true head of the feed
    from_head: bool,
}

impl RunState {
    fn new(from_head: bool) -> Self {
        Self {
            records: BTreeMap::new(),
            leading: None,
            earliest: None,
            pages_scanned: 0,
            from_head,
        }
    }

    /// Fold one classified page into the working set.
    ///
    /// First sighting wins: a month already recorded keeps its start
    /// page even when later pages straddle the same month. The leading
    /// month of a from-head run is anchored to page 1 regardless of
    /// which page first revealed it (page 1 itself may have been
    /// skipped as unavailable).
    fn absorb(&mut self, page: u32, summary: &PageSummary) {
        if self.leading.is_none() {
            self.leading = summary.newest;
        }

        for (&key, &count) in &summary.month_counts {
            let start_page = if self.from_head && Some(key) == self.leading {
                1
            } else {
                page
            };
            self.records
                .entry(key)
                .and_modify(|record| record.article_count += count)
                .or_insert(MonthRecord {
                    start_page,
                    article_count: count,
                });
        }

        if let Some(oldest) = summary.oldest {
            self.earliest = Some(self.earliest.map_or(oldest, |e| e.min(oldest)));
        }
    }
}

enum RunOutcome {
    Completed,
    Interrupted { last_processed: u32 },
}

/// Orchestrates fetcher, classifier and store into a scan.
pub struct IndexBuilder<F> {
    fetcher: RateLimitedFetcher<F>,
    store: Arc<dyn IndexStore>,
    settings: BuildSettings,
    page_size: u32,
    cancel: Arc<AtomicBool>,
    state: ScanState,
}

impl<F: StarredFeed> IndexBuilder<F> {
    pub fn new(
        fetcher: RateLimitedFetcher<F>,
        store: Arc<dyn IndexStore>,
        settings: BuildSettings,
        page_size: u32,
    ) -> Self {
        Self {
            fetcher,
            store,
            settings,
            page_size,
            cancel: Arc::new(AtomicBool::new(false)),
            state: ScanState::Idle,
        }
    }

    /// Flag checked between pages; flip it to stop the scan cleanly
    /// with progress persisted.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Run the scan to a stopping condition or interruption.
    pub async fn run(&mut self, mode: BuildMode) -> Result<BuildReport> {
        let start_page = match mode {
            BuildMode::Full => 1,
            BuildMode::Resume => self.resume_page().await?,
        };

        let total = self.fetcher.total_starred().await?;
        let total_pages = total.div_ceil(self.page_size as u64) as u32;
        log::info!(
            "Scanning pages {start_page}..={total_pages} ({total} starred articles, page size {})",
            self.page_size
        );

        self.state = ScanState::Scanning;
        let mut run = RunState::new(start_page == 1);

        let mut page = start_page;
        let outcome = loop {
            if page > total_pages {
                log::info!("Reached the last expected page ({total_pages})");
                break RunOutcome::Completed;
            }
            if self.cancel.load(Ordering::SeqCst) {
                log::warn!("Cancellation requested; stopping before page {page}");
                break RunOutcome::Interrupted {
                    last_processed: page - 1,
                };
            }

            match self.fetcher.fetch(page).await {
                Ok(PageData::Exhausted) => {
                    log::info!("Feed exhausted at page {page}");
                    break RunOutcome::Completed;
                }
                Ok(PageData::Unavailable) => {
                    // Degrade and continue; reprocessing on a later
                    // resume is safe under the merge rule
                    run.pages_scanned += 1;
                }
                Ok(PageData::Articles(articles)) => {
                    let summary = classify(&articles);
                    run.absorb(page, &summary);
                    run.pages_scanned += 1;

                    if let Some(oldest) = summary.oldest
                        && oldest.year <= self.settings.earliest_year
                    {
                        log::info!(
                            "Oldest article on page {page} is in {oldest}, at or past the \
                             {} cutoff",
                            self.settings.earliest_year
                        );
                        break RunOutcome::Completed;
                    }
                }
                Err(error @ AppError::RateLimited { .. }) => {
                    log::warn!("{error}; stopping this run, resume later");
                    break RunOutcome::Interrupted {
                        last_processed: page - 1,
                    };
                }
                Err(error) => {
                    self.state = ScanState::Failed;
                    return Err(error);
                }
            }

            if page % self.settings.checkpoint_interval == 0 {
                self.persist_progress(&mut run, page, total).await?;
                self.state = ScanState::Checkpointed;
            }
            page += 1;
        };

        let report = BuildReport {
            entries_found: run.records.len(),
            pages_scanned: run.pages_scanned,
            completed: matches!(outcome, RunOutcome::Completed),
        };

        match outcome {
            RunOutcome::Completed => {
                if let Err(error) = self.store.merge(&run.records, Some(total)).await {
                    // Don't silently discard the run; leave a
                    // checkpoint so the operator can retry
                    log::error!("Failed to persist index: {error}");
                    let checkpoint =
                        Checkpoint::new(page - 1, run.earliest, self.settings.earliest_year);
                    if let Err(cp_error) = self.store.save_checkpoint(&checkpoint).await {
                        log::error!("Failed to persist checkpoint as well: {cp_error}");
                    }
                    self.state = ScanState::Failed;
                    return Err(error);
                }
                self.store.delete_checkpoint().await?;
                self.state = ScanState::Completed;
                log::info!(
                    "Build complete: {} months over {} pages",
                    report.entries_found,
                    report.pages_scanned
                );
            }
            RunOutcome::Interrupted { last_processed } => {
                self.persist_progress(&mut run, last_processed, total).await?;
                self.state = ScanState::Checkpointed;
                log::info!(
                    "Build interrupted at page {last_processed}: {} months so far; \
                     run `resume` to continue",
                    report.entries_found
                );
            }
        }

        Ok(report)
    }

    /// Where a resumed run starts.
    async fn resume_page(&self) -> Result<u32> {
        match self.store.load_checkpoint().await? {
            Some(checkpoint) => {
                let index = self.store.load().await?;
                if index.is_empty() && checkpoint.last_page_processed > 0 {
                    // The checkpoint is the single source of truth for
                    // where to continue; reprocessed pages merge safely
                    log::warn!(
                        "Checkpoint says page {} but the index is empty; trusting the checkpoint",
                        checkpoint.last_page_processed
                    );
                }
                log::info!(
                    "Resuming after page {} (checkpoint saved {})",
                    checkpoint.last_page_processed,
                    checkpoint.saved_at
                );
                Ok(checkpoint.last_page_processed + 1)
            }
            None => {
                log::info!("No checkpoint found; starting a full scan");
                Ok(1)
            }
        }
    }

    /// Merge the working set into the persisted index and write a
    /// checkpoint, so a crash loses at most the pages since the last
    /// call.
    async fn persist_progress(
        &self,
        run: &mut RunState,
        last_processed: u32,
        total: u64,
    ) -> Result<()> {
        self.store.merge(&run.records, Some(total)).await?;
        // Counts merge additively; zero them so the next merge applies
        // only the delta. Start pages are idempotent under min.
        for record in run.records.values_mut() {
            record.article_count = 0;
        }
        let checkpoint = Checkpoint::new(last_processed, run.earliest, self.settings.earliest_year);
        self.store.save_checkpoint(&checkpoint).await
    }
}
