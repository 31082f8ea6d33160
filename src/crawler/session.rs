//! Crawl session state machine
//!
//! A session walks a chain of listing pages from one start reference:
//!
//! ```text
//! Idle ──step──▶ Walking ──(no next page | page bound | revisit)──▶ Terminated
//! ```
//!
//! Each step visits one listing page, resolves its items strictly one after
//! another, and moves the frontier to the page's continuation. Page and item
//! failures only shrink the result; a session always terminates with an
//! outcome, never an error.

use crate::config::CrawlConfig;
use crate::crawler::fetcher::PageSource;
use crate::crawler::resolver::AssetResolver;
use crate::crawler::walker::walk;
use crate::extract::ExtractionStrategy;
use crate::storage::Item;
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Fixed delays throttling outbound requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pacing {
    /// Wait before moving to the next listing page
    pub page_delay: Duration,
    /// Wait between two detail-page resolutions
    pub item_delay: Duration,
}

impl Pacing {
    pub fn from_config(config: &CrawlConfig) -> Self {
        Self {
            page_delay: Duration::from_millis(config.page_delay_ms),
            item_delay: Duration::from_millis(config.item_delay_ms),
        }
    }
}

/// Why a session stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// The last visited page had no continuation (or could not be fetched)
    NoNextPage,
    /// `max_pages` listing pages were visited
    PageLimit,
    /// The continuation pointed at an already visited page
    LoopDetected,
    /// The session was finished before reaching an exit condition
    Stopped,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NoNextPage => "no next page",
            Self::PageLimit => "page limit reached",
            Self::LoopDetected => "pagination loop detected",
            Self::Stopped => "stopped",
        };
        f.write_str(text)
    }
}

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Walking,
    Terminated(TerminationReason),
}

/// What a finished session hands to the store
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    /// Resolved items in listing-then-item order, unique by URL
    pub items: Vec<Item>,
    /// Listing pages actually visited
    pub pages_visited: u32,
    /// Item references that did not resolve to an asset
    pub items_failed: u32,
    pub termination: TerminationReason,
}

/// Transient state of one crawl
#[derive(Debug)]
pub struct CrawlSession {
    state: SessionState,
    max_pages: u32,
    pacing: Pacing,
    visited_pages: HashSet<Url>,
    frontier: Option<Url>,
    page_count: u32,
    collected: Vec<Item>,
    collected_urls: HashSet<String>,
    seen_details: HashSet<Url>,
    items_failed: u32,
}

impl CrawlSession {
    /// Creates an idle session holding the start reference and page bound
    pub fn new(start: Url, max_pages: u32, pacing: Pacing) -> Self {
        Self {
            state: SessionState::Idle,
            max_pages,
            pacing,
            visited_pages: HashSet::new(),
            frontier: Some(start),
            page_count: 0,
            collected: Vec::new(),
            collected_urls: HashSet::new(),
            seen_details: HashSet::new(),
            items_failed: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Listing pages visited so far
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// The page the session will visit next
    pub fn frontier(&self) -> Option<&Url> {
        self.frontier.as_ref()
    }

    /// Items resolved so far
    pub fn collected(&self) -> &[Item] {
        &self.collected
    }

    /// Runs the session to termination
    pub async fn run<F, S>(mut self, source: &F, strategy: &S) -> SessionOutcome
    where
        F: PageSource + ?Sized,
        S: ExtractionStrategy + ?Sized,
    {
        while self.step(source, strategy).await {}
        self.finish()
    }

    /// Advances the session by one listing page
    ///
    /// Returns false once the session is terminated; no request is made on
    /// that call.
    pub async fn step<F, S>(&mut self, source: &F, strategy: &S) -> bool
    where
        F: PageSource + ?Sized,
        S: ExtractionStrategy + ?Sized,
    {
        match self.state {
            SessionState::Terminated(_) => return false,
            SessionState::Idle => self.state = SessionState::Walking,
            SessionState::Walking => {}
        }

        if let Some(reason) = self.exit_condition() {
            self.terminate(reason);
            return false;
        }

        let Some(page_ref) = self.frontier.take() else {
            self.terminate(TerminationReason::NoNextPage);
            return false;
        };
        self.visited_pages.insert(page_ref.clone());

        tracing::info!("[page {}] {}", strategy.page_index(&page_ref), page_ref);
        let result = walk(source, strategy, &page_ref).await;

        let resolver = AssetResolver::new(source, strategy);
        let total = result.item_references.len();
        let mut resolved_here = 0usize;
        let mut first = true;

        for (position, detail_ref) in result.item_references.iter().enumerate() {
            if !self.seen_details.insert(detail_ref.clone()) {
                tracing::debug!("  [{}/{}] already visited {}", position + 1, total, detail_ref);
                continue;
            }

            if !first && !self.pacing.item_delay.is_zero() {
                tokio::time::sleep(self.pacing.item_delay).await;
            }
            first = false;

            match resolver.resolve(detail_ref).await {
                Some(resolution) => {
                    let item = Item::new(resolution.url.as_str())
                        .with_title(strategy.derive_title(detail_ref));
                    tracing::debug!(
                        "  [{}/{}] ✓ {} (via {})",
                        position + 1,
                        total,
                        item.url,
                        resolution.source.as_str()
                    );
                    if self.collected_urls.insert(item.url.clone()) {
                        self.collected.push(item);
                        resolved_here += 1;
                    }
                }
                None => {
                    tracing::debug!("  [{}/{}] ✗ {}", position + 1, total, detail_ref);
                    self.items_failed += 1;
                }
            }
        }

        self.page_count += 1;
        tracing::info!("  → {} new item(s) on this page", resolved_here);

        self.frontier = result.next_page;
        if self.exit_condition().is_none() && !self.pacing.page_delay.is_zero() {
            tokio::time::sleep(self.pacing.page_delay).await;
        }

        true
    }

    /// Consumes the session and returns its outcome
    pub fn finish(self) -> SessionOutcome {
        let termination = match self.state {
            SessionState::Terminated(reason) => reason,
            SessionState::Idle | SessionState::Walking => TerminationReason::Stopped,
        };

        SessionOutcome {
            items: self.collected,
            pages_visited: self.page_count,
            items_failed: self.items_failed,
            termination,
        }
    }

    fn exit_condition(&self) -> Option<TerminationReason> {
        match &self.frontier {
            None => Some(TerminationReason::NoNextPage),
            Some(_) if self.page_count >= self.max_pages => Some(TerminationReason::PageLimit),
            Some(next) if self.visited_pages.contains(next) => {
                Some(TerminationReason::LoopDetected)
            }
            Some(_) => None,
        }
    }

    fn terminate(&mut self, reason: TerminationReason) {
        if reason == TerminationReason::LoopDetected {
            tracing::info!("Loop detected, stopping");
        }
        tracing::info!(
            "Session finished after {} page(s): {}",
            self.page_count,
            reason
        );
        self.state = SessionState::Terminated(reason);
    }
}
