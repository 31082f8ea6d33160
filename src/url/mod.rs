//! URL handling module for Asset-Harvester
//!
//! This module provides page-reference normalization, href resolution,
//! asset URL canonicalization, pagination parameter parsing and host
//! rule matching.

mod matcher;
mod normalize;
mod pagination;

pub use matcher::{matches_host, HostRule};
pub use normalize::{canonicalize_asset_url, normalize_page_reference, resolve_href};
pub use pagination::{is_continuation, page_index, query_value};

use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use asset_harvester::url::extract_domain;
///
/// let url = Url::parse("https://CDN.anh.moe/f/x.jpeg").unwrap();
/// assert_eq!(extract_domain(&url), Some("cdn.anh.moe".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns true if both URLs point at the same host
pub fn same_host(a: &Url, b: &Url) -> bool {
    match (extract_domain(a), extract_domain(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
