use percent_encoding::percent_decode_str;
use url::Url;

/// Derives a display title from a detail-page slug
///
/// `/view/Some.Clip.Title.AbC12xY` becomes `Some Clip Title`: the last path
/// segment is percent-decoded, split on dots, and a trailing token that looks
/// like a short random ID is dropped. This is a best-effort guess; titles are
/// advisory and never used for identity.
///
/// # Examples
///
/// ```
/// use asset_harvester::extract::title_from_slug;
/// use url::Url;
///
/// let url = Url::parse("https://anh.moe/view/Some.Clip.Title.AbC12xY").unwrap();
/// assert_eq!(title_from_slug(&url), Some("Some Clip Title".to_string()));
/// ```
pub fn title_from_slug(url: &Url) -> Option<String> {
    let slug = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let decoded = percent_decode_str(slug).decode_utf8_lossy();

    let mut parts: Vec<&str> = decoded.split('.').collect();
    if parts.last().is_some_and(|last| looks_like_id(last)) {
        parts.pop();
    }

    let title = parts.join(" ").trim().to_string();
    (!title.is_empty()).then_some(title)
}

/// Short mixed alphanumeric token, not purely numeric
fn looks_like_id(token: &str) -> bool {
    (5..=12).contains(&token.len())
        && token.chars().all(|c| c.is_ascii_alphanumeric())
        && !token.chars().all(|c| c.is_ascii_digit())
}
