//! Crawl coordinator - one bucket from start page to store
//!
//! The [`Crawler`] owns the fetcher, the site strategy and the store handle.
//! A crawl runs the session loop, merges items into the bucket every
//! `checkpoint_every` pages when configured, and always performs a final
//! merge of anything still pending once the session terminates.

use crate::config::Config;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::session::{CrawlSession, Pacing, SessionOutcome, TerminationReason};
use crate::extract::ExtractionStrategy;
use crate::output::{write_snapshot, Snapshot};
use crate::storage::{Item, MergeOutcome, Storage};
use crate::url::normalize_page_reference;
use crate::HarvestError;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use url::Url;

/// Summary of one crawl
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub bucket: String,
    pub start: String,
    pub pages_visited: u32,
    /// Items resolved by the session (before store dedup)
    pub items: Vec<Item>,
    pub items_failed: u32,
    pub termination: TerminationReason,
    /// Combined result of every merge; `None` when nothing was merged
    pub merge: Option<MergeOutcome>,
    pub snapshot: Option<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CrawlReport {
    pub fn items_found(&self) -> usize {
        self.items.len()
    }

    /// Items the store did not already have
    pub fn items_added(&self) -> usize {
        self.merge.map_or(0, |m| m.added)
    }
}

/// Drives crawl sessions against one store
pub struct Crawler<St: Storage> {
    fetcher: Fetcher,
    strategy: Box<dyn ExtractionStrategy>,
    store: St,
    pacing: Pacing,
    checkpoint_every: u32,
    snapshot_dir: Option<PathBuf>,
}

impl<St: Storage> Crawler<St> {
    /// Creates a crawler
    ///
    /// # Arguments
    ///
    /// * `config` - Fetcher, pacing and snapshot settings
    /// * `strategy` - Site-specific extraction logic
    /// * `store` - Destination of merged items
    pub fn new(
        config: &Config,
        strategy: Box<dyn ExtractionStrategy>,
        store: St,
    ) -> Result<Self, HarvestError> {
        Ok(Self {
            fetcher: Fetcher::new(&config.fetcher)?,
            strategy,
            store,
            pacing: Pacing::from_config(&config.crawl),
            checkpoint_every: config.crawl.checkpoint_every,
            snapshot_dir: config.store.snapshot_dir.as_ref().map(PathBuf::from),
        })
    }

    pub fn store(&self) -> &St {
        &self.store
    }

    /// Runs one session without touching the store
    pub async fn run_session(&self, start: &Url, max_pages: u32) -> SessionOutcome {
        CrawlSession::new(start.clone(), max_pages, self.pacing)
            .run(&self.fetcher, self.strategy.as_ref())
            .await
    }

    /// Crawls `start` and merges the resolved items into `bucket`
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - Session finished and every pending item was merged
    /// * `Err(HarvestError::UrlError)` - The start reference is not a page URL
    /// * `Err(HarvestError::Persist)` - The final merge failed; the error
    ///   carries the session outcome so the items are not lost
    pub async fn crawl(
        &self,
        start: &str,
        bucket: &str,
        max_pages: u32,
    ) -> Result<CrawlReport, HarvestError> {
        let start_ref = normalize_page_reference(start)?;
        let started_at = Utc::now();

        tracing::info!(
            "Crawling '{}' from {} (max {} pages, strategy {})",
            bucket,
            start_ref,
            max_pages,
            self.strategy.name()
        );

        let mut session = CrawlSession::new(start_ref.clone(), max_pages, self.pacing);
        let mut merged_upto = 0usize;
        let mut merge: Option<MergeOutcome> = None;

        while session.step(&self.fetcher, self.strategy.as_ref()).await {
            if self.checkpoint_every == 0 || session.page_count() % self.checkpoint_every != 0 {
                continue;
            }

            let pending = &session.collected()[merged_upto..];
            if pending.is_empty() {
                continue;
            }

            match self.store.merge_bucket(bucket, pending) {
                Ok(outcome) => {
                    tracing::info!(
                        "Checkpoint after {} page(s): {} item(s) merged",
                        session.page_count(),
                        pending.len()
                    );
                    merge = Some(combine(merge, outcome));
                    merged_upto = session.collected().len();
                }
                Err(e) => {
                    tracing::warn!("Checkpoint merge into '{}' failed: {}", bucket, e);
                }
            }
        }

        let outcome = session.finish();
        tracing::info!(
            "Session for '{}' ended ({}): {} page(s), {} item(s), {} unresolved",
            bucket,
            outcome.termination,
            outcome.pages_visited,
            outcome.items.len(),
            outcome.items_failed
        );

        let pending = &outcome.items[merged_upto..];
        if !pending.is_empty() {
            match self.store.merge_bucket(bucket, pending) {
                Ok(result) => merge = Some(combine(merge, result)),
                Err(source) => {
                    tracing::error!(
                        "Could not merge {} item(s) into '{}' at {}: {}",
                        pending.len(),
                        bucket,
                        self.store.describe(),
                        source
                    );
                    return Err(HarvestError::Persist {
                        bucket: bucket.to_string(),
                        outcome: Box::new(outcome),
                        source,
                    });
                }
            }
        } else if outcome.items.is_empty() {
            tracing::info!("No items resolved; store left untouched");
        }

        let finished_at = Utc::now();
        let snapshot = self.write_snapshot(bucket, &start_ref, &outcome, finished_at);

        Ok(CrawlReport {
            bucket: bucket.to_string(),
            start: start_ref.to_string(),
            pages_visited: outcome.pages_visited,
            items: outcome.items,
            items_failed: outcome.items_failed,
            termination: outcome.termination,
            merge,
            snapshot,
            started_at,
            finished_at,
        })
    }

    /// Writes the per-run snapshot when a directory is configured
    ///
    /// Snapshot failures are logged and never fail the crawl.
    fn write_snapshot(
        &self,
        bucket: &str,
        start: &Url,
        outcome: &SessionOutcome,
        crawled_at: DateTime<Utc>,
    ) -> Option<PathBuf> {
        let dir = self.snapshot_dir.as_ref()?;
        let snapshot = Snapshot {
            bucket,
            start: start.as_str(),
            crawled_at,
            pages_visited: outcome.pages_visited,
            items: &outcome.items,
        };

        match write_snapshot(dir, &snapshot) {
            Ok(path) => {
                tracing::info!("Snapshot written to {}", path.display());
                Some(path)
            }
            Err(e) => {
                tracing::warn!("Failed to write snapshot for '{}': {}", bucket, e);
                None
            }
        }
    }
}

/// Folds a checkpoint merge into the running total
fn combine(previous: Option<MergeOutcome>, next: MergeOutcome) -> MergeOutcome {
    match previous {
        None => next,
        Some(prev) => MergeOutcome {
            existing: prev.existing,
            added: prev.added + next.added,
            total: next.total,
        },
    }
}
