use url::Url;

/// Checks if a host matches a host pattern
///
/// Patterns are either exact (`cdn.anh.moe`) or wildcards (`*.anh.moe`), where
/// a wildcard matches the bare domain as well as any nested subdomain.
/// Callers pass lowercase hosts; the comparison itself is case-sensitive.
///
/// # Examples
///
/// ```
/// use asset_harvester::url::matches_host;
///
/// assert!(matches_host("cdn.anh.moe", "cdn.anh.moe"));
/// assert!(matches_host("*.anh.moe", "cdn.anh.moe"));
/// assert!(matches_host("*.anh.moe", "anh.moe"));
/// assert!(!matches_host("*.anh.moe", "anh.moe.example"));
/// ```
pub fn matches_host(pattern: &str, host: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => {
            host == base
                || host
                    .strip_suffix(base)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        }
        None => host == pattern,
    }
}

/// A host pattern with an optional path prefix
///
/// Used for the asset allow-list and deny-list: `cdn.anh.moe` + `/f/` selects
/// the image CDN while `cdn.anh.moe` + `/s` selects the video bucket on the
/// same host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRule {
    host: String,
    path_prefix: Option<String>,
}

impl HostRule {
    /// Creates a rule; the host pattern is lowercased
    pub fn new(host: &str, path_prefix: Option<&str>) -> Self {
        Self {
            host: host.trim().to_lowercase(),
            path_prefix: path_prefix
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
        }
    }

    /// Creates a rule that matches any path on the host
    pub fn host(host: &str) -> Self {
        Self::new(host, None)
    }

    /// The host pattern of this rule
    pub fn host_pattern(&self) -> &str {
        &self.host
    }

    /// The path prefix of this rule, if any
    pub fn path_prefix(&self) -> Option<&str> {
        self.path_prefix.as_deref()
    }

    /// Returns true if the URL's host and path satisfy this rule
    pub fn matches(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        if !matches_host(&self.host, &host.to_lowercase()) {
            return false;
        }
        match &self.path_prefix {
            Some(prefix) => url.path().starts_with(prefix.as_str()),
            None => true,
        }
    }
}
