//! Listing-page walker
//!
//! Turns one listing page into its item detail-page references and the
//! continuation to the next listing page. All site knowledge lives in the
//! [`ExtractionStrategy`]; the walker only fetches, deduplicates, and applies
//! the failure policy.

use crate::crawler::fetcher::PageSource;
use crate::extract::ExtractionStrategy;
use std::collections::HashSet;
use url::Url;

/// What one listing page yielded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkResult {
    /// Detail-page references, first occurrences only, in document order
    pub item_references: Vec<Url>,
    /// The continuation reference, if the page has a valid one
    pub next_page: Option<Url>,
}

impl WalkResult {
    /// The result for a page that could not be fetched or read
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Fetches a listing page and extracts its item references and next page
///
/// An unreachable page yields an empty result with no next page, which ends
/// that branch of the crawl without failing the session. A page with neither
/// items nor a next page is logged as a possible markup change.
pub async fn walk<F, S>(source: &F, strategy: &S, page_ref: &Url) -> WalkResult
where
    F: PageSource + ?Sized,
    S: ExtractionStrategy + ?Sized,
{
    let page = match source.fetch(page_ref).await {
        Ok(page) => page,
        Err(e) => {
            tracing::warn!("Listing page skipped: {}", e);
            return WalkResult::empty();
        }
    };

    let item_references = dedup_in_order(strategy.find_item_references(&page));

    // The index comes from the reference we asked for, not the final URL: a
    // redirect must not shift which continuation counts as "next".
    let current_index = strategy.page_index(page_ref);
    let next_page = strategy.find_next_page(&page, current_index);

    if item_references.is_empty() && next_page.is_none() {
        tracing::debug!(
            "[{}] no items and no continuation on {}",
            strategy.name(),
            page_ref
        );
    }

    WalkResult {
        item_references,
        next_page,
    }
}

/// Keeps the first occurrence of each URL, preserving order
///
/// Listing markup usually renders every card's link twice (thumbnail and
/// caption).
pub fn dedup_in_order(urls: Vec<Url>) -> Vec<Url> {
    let mut seen = HashSet::with_capacity(urls.len());
    urls.into_iter()
        .filter(|url| seen.insert(url.clone()))
        .collect()
}
