//! Site-specific extraction strategies
//!
//! Each crawl target supplies an [`ExtractionStrategy`] that knows how to read
//! its listing and detail pages:
//! - which links on a listing page are item detail pages
//! - which link continues the pagination
//! - which URLs on a detail page are asset candidates, in priority order
//!
//! The crawler never branches on site identity; it only talks to this trait.
//! Strategies are pure functions over fetched pages. When the markup does not
//! contain what they look for they return empty results, which the walker and
//! resolver treat the same as an unreachable page.

mod policy;
mod profile;
mod title;

pub use policy::AssetPolicy;
pub use profile::{ProfileStrategy, SiteProfile};
pub use title::title_from_slug;

use crate::crawler::Page;
use url::Url;

/// Where on a detail page an asset candidate was found
///
/// Variants are declared in resolution priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CandidateSource {
    /// A link carrying a download-tracking parameter or a `download` attribute
    DownloadAnchor,
    /// The source attribute of a native video/image element
    MediaElement,
    /// A media URL matched anywhere in the raw page body
    BodyScan,
}

impl CandidateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DownloadAnchor => "download-anchor",
            Self::MediaElement => "media-element",
            Self::BodyScan => "body-scan",
        }
    }
}

/// A possible asset URL found on a detail page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetCandidate {
    /// Absolute URL as found (tracking suffix not yet removed)
    pub url: Url,
    /// The strategy that produced it
    pub source: CandidateSource,
}

impl AssetCandidate {
    pub fn new(url: Url, source: CandidateSource) -> Self {
        Self { url, source }
    }
}

/// Pluggable, site-specific page reading logic
pub trait ExtractionStrategy: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Page index encoded in a listing-page reference
    fn page_index(&self, page_ref: &Url) -> u32;

    /// Item detail-page references on a listing page, in document order
    ///
    /// Duplicates are allowed; the walker keeps only first occurrences.
    fn find_item_references(&self, page: &Page) -> Vec<Url>;

    /// The continuation link to page `current_index + 1`, if the page has one
    fn find_next_page(&self, page: &Page, current_index: u32) -> Option<Url>;

    /// Asset candidates on a detail page, highest priority first
    fn find_asset_candidates(&self, detail: &Page) -> Vec<AssetCandidate>;

    /// Hosts in scope for this target's asset class
    fn asset_policy(&self) -> &AssetPolicy;

    /// Advisory display title for an item
    fn derive_title(&self, _detail_ref: &Url) -> Option<String> {
        None
    }
}
