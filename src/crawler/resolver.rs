//! Asset resolution for item detail pages
//!
//! Candidates from the extraction strategy are tried in fixed priority order:
//!
//! 1. Download anchor
//! 2. Native media element
//! 3. Raw-body pattern scan (last resort; it can match any embedded URL)
//!
//! Each candidate is canonicalized (tracking suffix removed) and checked against
//! the strategy's asset policy. The first one that passes wins.

use crate::crawler::fetcher::PageSource;
use crate::extract::{AssetCandidate, AssetPolicy, CandidateSource, ExtractionStrategy};
use crate::url::canonicalize_asset_url;
use url::Url;

/// A resolved asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Canonical asset URL
    pub url: Url,
    /// The strategy that produced it
    pub source: CandidateSource,
}

/// Picks the canonical asset URL from a set of candidates
///
/// Candidates are stably ordered by source priority, so within one source the
/// document order the strategy reported is kept.
pub fn select_asset(
    mut candidates: Vec<AssetCandidate>,
    policy: &AssetPolicy,
) -> Option<Resolution> {
    candidates.sort_by_key(|candidate| candidate.source);

    candidates.into_iter().find_map(|candidate| {
        let canonical = canonicalize_asset_url(&candidate.url);
        if policy.permits(&canonical) {
            Some(Resolution {
                url: canonical,
                source: candidate.source,
            })
        } else {
            tracing::trace!(
                "Rejected {} candidate {}",
                candidate.source.as_str(),
                candidate.url
            );
            None
        }
    })
}

/// Resolves detail pages to canonical asset URLs
pub struct AssetResolver<'a, F: ?Sized, S: ?Sized> {
    source: &'a F,
    strategy: &'a S,
}

impl<'a, F, S> AssetResolver<'a, F, S>
where
    F: PageSource + ?Sized,
    S: ExtractionStrategy + ?Sized,
{
    pub fn new(source: &'a F, strategy: &'a S) -> Self {
        Self { source, strategy }
    }

    /// Fetches a detail page and resolves its asset
    ///
    /// Returns None when the page is unreachable or no candidate passes the
    /// asset policy. Neither case is an error for the session.
    pub async fn resolve(&self, detail_ref: &Url) -> Option<Resolution> {
        let page = match self.source.fetch(detail_ref).await {
            Ok(page) => page,
            Err(e) => {
                tracing::debug!("Detail page skipped: {}", e);
                return None;
            }
        };

        let candidates = self.strategy.find_asset_candidates(&page);
        if candidates.is_empty() {
            tracing::debug!(
                "[{}] no asset candidates on {}",
                self.strategy.name(),
                detail_ref
            );
            return None;
        }

        select_asset(candidates, self.strategy.asset_policy())
    }
}
