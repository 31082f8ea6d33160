use url::Url;

/// Returns the first value of a query parameter, if present
pub fn query_value(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Reads the page index encoded in a listing-page URL
///
/// A missing or non-numeric index parameter means page 1.
///
/// # Examples
///
/// ```
/// use asset_harvester::url::page_index;
/// use url::Url;
///
/// let url = Url::parse("https://anh.moe/category/sfw/?page=3&seek=x").unwrap();
/// assert_eq!(page_index(&url, "page"), 3);
/// assert_eq!(page_index(&Url::parse("https://anh.moe/").unwrap(), "page"), 1);
/// ```
pub fn page_index(url: &Url, index_param: &str) -> u32 {
    query_value(url, index_param)
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(1)
}

/// Checks whether a link is a genuine continuation to `expected_index`
///
/// Both conditions are required: the index parameter must equal
/// `expected_index` exactly, and the token parameter must be present and
/// non-empty. Either one alone is just a same-looking link.
pub fn is_continuation(
    candidate: &Url,
    expected_index: u32,
    index_param: &str,
    token_param: &str,
) -> bool {
    let index_matches = query_value(candidate, index_param)
        .and_then(|raw| raw.trim().parse::<u32>().ok())
        == Some(expected_index);

    let has_token = query_value(candidate, token_param).is_some_and(|t| !t.trim().is_empty());

    index_matches && has_token
}
