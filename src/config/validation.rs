use crate::config::types::{
    BucketLayoutKind, Config, CrawlConfig, FetcherConfig, HostRuleEntry, SiteConfig, StoreConfig,
    TargetEntry,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_fetcher_config(&config.fetcher)?;
    validate_crawl_config(&config.crawl)?;
    validate_store_config(&config.store)?;
    validate_site_config(&config.site)?;
    validate_targets(&config.targets)?;
    Ok(())
}

/// Validates fetcher configuration
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if let Some(referer) = &config.referer {
        validate_http_url(referer, "referer")?;
    }

    Ok(())
}

/// Validates crawl bounds
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be >= 1, got {}",
            config.max_pages
        )));
    }
    Ok(())
}

/// Validates store configuration
fn validate_store_config(config: &StoreConfig) -> Result<(), ConfigError> {
    if config.path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "store path cannot be empty".to_string(),
        ));
    }

    let variable = config.js_variable.as_str();
    let valid_identifier = variable
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && variable
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if !valid_identifier {
        return Err(ConfigError::Validation(format!(
            "js-variable must be a JavaScript identifier, got '{}'",
            variable
        )));
    }

    let bucket_key = config.bucket_key();
    let mut keys = vec![("bucket-key", bucket_key)];
    if config.layout == BucketLayoutKind::List {
        keys.push(("name-field", config.name_field.as_str()));
        keys.push(("items-field", config.items_field.as_str()));
        if config.name_field == config.items_field {
            return Err(ConfigError::Validation(
                "name-field and items-field must differ".to_string(),
            ));
        }
    }
    if let Some(key) = &config.name_list_key {
        keys.push(("name-list-key", key.as_str()));
    }
    if let Some(key) = &config.index_key {
        keys.push(("index-key", key.as_str()));
    }

    for (name, key) in &keys {
        if key.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    for key in [&config.name_list_key, &config.index_key].into_iter().flatten() {
        if key == bucket_key || (config.write_total && key == "total") {
            return Err(ConfigError::Validation(format!(
                "store key '{}' is used twice",
                key
            )));
        }
    }
    if config.name_list_key.is_some() && config.name_list_key == config.index_key {
        return Err(ConfigError::Validation(
            "name-list-key and index-key must differ".to_string(),
        ));
    }
    if config.write_total && bucket_key == "total" {
        return Err(ConfigError::Validation(
            "bucket-key 'total' collides with write-total".to_string(),
        ));
    }

    Ok(())
}

/// Validates the site section
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    if let Some(base) = &config.base_url {
        validate_http_url(base, "base-url")?;
    }

    for (name, value) in [
        ("page-param", &config.page_param),
        ("token-param", &config.token_param),
    ] {
        if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    if let Some(prefix) = &config.item_link_prefix {
        if !prefix.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "item-link-prefix must start with '/', got '{}'",
                prefix
            )));
        }
    }

    if let Some(extensions) = &config.media_extensions {
        for ext in extensions {
            if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(ConfigError::Validation(format!(
                    "media extension '{}' must be alphanumeric",
                    ext
                )));
            }
        }
    }

    if let Some(selector) = &config.media_selector {
        scraper::Selector::parse(selector).map_err(|e| {
            ConfigError::Validation(format!("Invalid media-selector '{}': {:?}", selector, e))
        })?;
    }

    for entry in config.allow.iter().chain(config.deny.iter()).flatten() {
        validate_host_rule(entry)?;
    }

    Ok(())
}

/// Validates batch targets
fn validate_targets(targets: &[TargetEntry]) -> Result<(), ConfigError> {
    for target in targets {
        validate_http_url(&target.start, "target start")?;

        if target.bucket.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "Target '{}' must name a bucket",
                target.start
            )));
        }

        if target.max_pages == Some(0) {
            return Err(ConfigError::Validation(format!(
                "Target '{}' has max-pages = 0",
                target.start
            )));
        }
    }
    Ok(())
}

fn validate_http_url(value: &str, what: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", what, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use HTTP or HTTPS",
            what, value
        )));
    }

    Ok(())
}

fn validate_host_rule(entry: &HostRuleEntry) -> Result<(), ConfigError> {
    validate_host_pattern(&entry.host)?;

    if let Some(prefix) = &entry.path_prefix {
        if !prefix.starts_with('/') {
            return Err(ConfigError::InvalidPattern(format!(
                "path-prefix for '{}' must start with '/', got '{}'",
                entry.host, prefix
            )));
        }
    }

    Ok(())
}

/// Validates a host pattern (supports wildcards)
fn validate_host_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Host pattern cannot be empty".to_string(),
        ));
    }

    let host = pattern.strip_prefix("*.").unwrap_or(pattern);

    if host.is_empty() {
        return Err(ConfigError::InvalidPattern(format!(
            "Host pattern '{}' has no host after the wildcard",
            pattern
        )));
    }

    if !host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' contains invalid characters",
            host
        )));
    }

    if host.starts_with('.')
        || host.ends_with('.')
        || host.starts_with('-')
        || host.ends_with('-')
        || host.contains("..")
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' is malformed",
            host
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_host_pattern() {
        assert!(validate_host_pattern("cdn.anh.moe").is_ok());
        assert!(validate_host_pattern("*.save.moe").is_ok());
        assert!(validate_host_pattern("127.0.0.1").is_ok());
        assert!(validate_host_pattern("localhost").is_ok());

        assert!(validate_host_pattern("").is_err());
        assert!(validate_host_pattern("*.").is_err());
        assert!(validate_host_pattern(".anh.moe").is_err());
        assert!(validate_host_pattern("anh.moe.").is_err());
        assert!(validate_host_pattern("anh..moe").is_err());
        assert!(validate_host_pattern("anh.moe/f").is_err());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut config = Config::default();
        config.fetcher.max_attempts = 0;
        assert!(matches!(
            validate(&config).unwrap_err(),
            ConfigError::Validation(_)
        ));
    }

    #[test]
    fn test_bad_js_variable_rejected() {
        let mut config = Config::default();
        config.store.js_variable = "window.DATA".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_store_key_collisions_rejected() {
        let mut config = Config::default();
        config.store.bucket_key = Some("album_items".to_string());
        config.store.name_list_key = Some("tags".to_string());
        config.store.index_key = Some("items".to_string());
        assert!(validate(&config).is_ok());

        config.store.index_key = Some("album_items".to_string());
        assert!(validate(&config).is_err());

        config.store.index_key = Some("tags".to_string());
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_list_layout_fields_must_differ() {
        let mut config = Config::default();
        config.store.layout = BucketLayoutKind::List;
        assert!(validate(&config).is_ok());

        config.store.items_field = "title".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_target_without_bucket_rejected() {
        let mut config = Config::default();
        config.targets.push(TargetEntry {
            start: "https://anh.moe/album/Kuzu.7jdQy".to_string(),
            bucket: "  ".to_string(),
            max_pages: None,
            preset: None,
        });
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_target_with_ftp_start_rejected() {
        let mut config = Config::default();
        config.targets.push(TargetEntry {
            start: "ftp://anh.moe/album".to_string(),
            bucket: "kuzu".to_string(),
            max_pages: None,
            preset: None,
        });
        assert!(matches!(
            validate(&config).unwrap_err(),
            ConfigError::InvalidUrl(_)
        ));
    }

    #[test]
    fn test_bad_media_selector_rejected() {
        let mut config = Config::default();
        config.site.media_selector = Some("video[[".to_string());
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_relative_path_prefix_rejected() {
        let entry = HostRuleEntry {
            host: "cdn.anh.moe".to_string(),
            path_prefix: Some("f/".to_string()),
        };
        assert!(validate_host_rule(&entry).is_err());
    }
}
