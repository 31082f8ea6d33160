use crate::UrlError;
use url::Url;

/// Normalizes a listing-page reference so equal pages compare equal
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Accept only HTTP and HTTPS
/// 3. Require a host (the parser lowercases it)
/// 4. Remove the fragment
///
/// The query string is kept verbatim: it carries the page index and the
/// continuation token, and reordering it would produce a request the site
/// never emitted.
///
/// # Examples
///
/// ```
/// use asset_harvester::url::normalize_page_reference;
///
/// let url = normalize_page_reference("https://ANH.MOE/category/sfw/?page=3#top").unwrap();
/// assert_eq!(url.as_str(), "https://anh.moe/category/sfw/?page=3");
/// ```
pub fn normalize_page_reference(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    url.set_fragment(None);
    Ok(url)
}

/// Resolves an `href` found on a page against that page's URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only anchors
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_href(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    let mut absolute = base_url.join(href).ok()?;
    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return None;
    }
    absolute.set_fragment(None);
    Some(absolute)
}

/// Produces the canonical form of an asset URL
///
/// Download-tracking suffixes (`?dl=1` and friends) hang off the query
/// string, so the whole query and any fragment are dropped.
///
/// # Examples
///
/// ```
/// use asset_harvester::url::canonicalize_asset_url;
/// use url::Url;
///
/// let tracked = Url::parse("https://cdn.anh.moe/f/mcF5pEO.jpeg?dl=1").unwrap();
/// assert_eq!(
///     canonicalize_asset_url(&tracked).as_str(),
///     "https://cdn.anh.moe/f/mcF5pEO.jpeg"
/// );
/// ```
pub fn canonicalize_asset_url(url: &Url) -> Url {
    let mut canonical = url.clone();
    canonical.set_query(None);
    canonical.set_fragment(None);
    canonical
}
