//! Crawler module for walking listing pages and resolving assets
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with bounded retry
//! - Listing-page walking (item references and the continuation link)
//! - Detail-page resolution to one canonical asset URL
//! - The session state machine and the crawl coordinator

mod coordinator;
mod fetcher;
mod resolver;
mod session;
mod walker;

pub use coordinator::{CrawlReport, Crawler};
pub use fetcher::{build_http_client, FetchError, Fetcher, Page, PageSource};
pub use resolver::{select_asset, AssetResolver, Resolution};
pub use session::{CrawlSession, Pacing, SessionOutcome, SessionState, TerminationReason};
pub use walker::{dedup_in_order, walk, WalkResult};

use crate::config::{Config, SitePreset};
use crate::extract::{ProfileStrategy, SiteProfile};
use crate::storage::open_store;
use crate::HarvestError;

/// Runs a complete crawl of one bucket against the configured file store
///
/// This is the main entry point used by the CLI. It will:
/// 1. Build the site profile (preset overridden by `[site]`)
/// 2. Default the referer to the site root when none is configured
/// 3. Crawl from `start` and merge the items into `bucket`
///
/// # Arguments
///
/// * `config` - The harvester configuration
/// * `start` - First listing page
/// * `bucket` - Destination bucket name
/// * `max_pages` - Upper bound on listing pages visited
/// * `preset` - Overrides the `[site]` preset for this crawl
pub async fn crawl(
    config: &Config,
    start: &str,
    bucket: &str,
    max_pages: u32,
    preset: Option<SitePreset>,
) -> Result<CrawlReport, HarvestError> {
    let preset = preset.unwrap_or(config.site.preset);
    let profile = SiteProfile::from_config_with_preset(&config.site, preset)?;

    let mut config = config.clone();
    if config.fetcher.referer.is_none() {
        config.fetcher.referer = profile.base_url.as_ref().map(|u| u.to_string());
    }

    let strategy = ProfileStrategy::new(profile)?;
    let crawler = Crawler::new(&config, Box::new(strategy), open_store(&config.store))?;
    crawler.crawl(start, bucket, max_pages).await
}
