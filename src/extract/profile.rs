//! Configurable extraction strategy
//!
//! A [`SiteProfile`] describes one site's markup conventions: where detail
//! pages live, how pagination is encoded, and which hosts serve the wanted
//! asset class. [`ProfileStrategy`] compiles a profile into CSS selectors and a
//! body-scan regex and implements [`ExtractionStrategy`] on top of them.

use crate::config::{HostRuleEntry, SiteConfig, SitePreset};
use crate::crawler::Page;
use crate::extract::{
    title_from_slug, AssetCandidate, AssetPolicy, CandidateSource, ExtractionStrategy,
};
use crate::url::{is_continuation, page_index, resolve_href, same_host, HostRule};
use crate::ConfigError;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Markup conventions of one crawl target
#[derive(Debug, Clone)]
pub struct SiteProfile {
    /// Profile name used in logs
    pub name: String,

    /// Site root; also the default referer
    pub base_url: Option<Url>,

    /// Path prefix of item detail pages
    pub item_link_prefix: String,

    /// Query parameter carrying the page index
    pub page_param: String,

    /// Query parameter carrying the continuation token
    pub token_param: String,

    /// Query parameters marking a download anchor
    pub download_params: Vec<String>,

    /// Selector for native media elements; `None` disables that strategy
    pub media_selector: Option<String>,

    /// Extensions for the raw-body scan; empty disables that strategy
    pub media_extensions: Vec<String>,

    /// Derive item titles from the detail-page slug
    pub derive_titles: bool,

    /// In-scope asset hosts
    pub policy: AssetPolicy,
}

impl SiteProfile {
    /// Returns the built-in profile for a preset
    pub fn preset(preset: SitePreset) -> Self {
        match preset {
            SitePreset::AnhmoeImages => Self {
                name: preset.as_str().to_string(),
                base_url: Url::parse("https://anh.moe/").ok(),
                // Image posts only expose the full-size file through the
                // download anchor; thumbnails and posters share the image CDN.
                media_selector: None,
                media_extensions: Vec::new(),
                derive_titles: false,
                policy: AssetPolicy::new(
                    vec![HostRule::new("cdn.anh.moe", Some("/f/"))],
                    vec![
                        HostRule::host("cdn.save.moe"),
                        HostRule::host("anh-cdn.cyou"),
                        HostRule::host("amvideos.cfd"),
                        HostRule::new("cdn.anh.moe", Some("/s")),
                    ],
                ),
                ..Self::generic(preset.as_str())
            },
            SitePreset::AnhmoeVideos => Self {
                name: preset.as_str().to_string(),
                base_url: Url::parse("https://anh.moe/").ok(),
                media_selector: Some("video[src], video source[src]".to_string()),
                media_extensions: vec!["mp4".into(), "webm".into(), "mov".into()],
                derive_titles: true,
                policy: AssetPolicy::new(
                    vec![
                        HostRule::host("cdn.save.moe"),
                        HostRule::host("cdn.anh.moe"),
                        HostRule::host("anh-cdn.cyou"),
                        HostRule::host("amvideos.cfd"),
                    ],
                    vec![HostRule::new("cdn.anh.moe", Some("/f/"))],
                ),
                ..Self::generic(preset.as_str())
            },
            SitePreset::Custom => Self::generic(preset.as_str()),
        }
    }

    /// Chevereto-style defaults with no host rules
    fn generic(name: &str) -> Self {
        Self {
            name: name.to_string(),
            base_url: None,
            item_link_prefix: "/view/".to_string(),
            page_param: "page".to_string(),
            token_param: "seek".to_string(),
            download_params: vec!["dl".to_string()],
            media_selector: Some("video[src], video source[src], img[src]".to_string()),
            media_extensions: vec!["mp4".into(), "webm".into(), "mov".into()],
            derive_titles: false,
            policy: AssetPolicy::default(),
        }
    }

    /// Builds a profile from the `[site]` section layered over its preset
    pub fn from_config(site: &SiteConfig) -> Result<Self, ConfigError> {
        Self::from_config_with_preset(site, site.preset)
    }

    /// Like [`SiteProfile::from_config`] but with an explicit preset
    pub fn from_config_with_preset(
        site: &SiteConfig,
        preset: SitePreset,
    ) -> Result<Self, ConfigError> {
        let mut profile = Self::preset(preset);

        if let Some(base) = &site.base_url {
            let url = Url::parse(base)
                .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url '{}': {}", base, e)))?;
            profile.base_url = Some(url);
        }
        if let Some(prefix) = &site.item_link_prefix {
            profile.item_link_prefix = prefix.clone();
        }
        if let Some(param) = &site.page_param {
            profile.page_param = param.clone();
        }
        if let Some(param) = &site.token_param {
            profile.token_param = param.clone();
        }
        if let Some(params) = &site.download_params {
            profile.download_params = params.clone();
        }
        if let Some(selector) = &site.media_selector {
            profile.media_selector = Some(selector.clone()).filter(|s| !s.trim().is_empty());
        }
        if let Some(extensions) = &site.media_extensions {
            profile.media_extensions = extensions.iter().map(|e| e.to_lowercase()).collect();
        }
        if let Some(derive) = site.derive_titles {
            profile.derive_titles = derive;
        }
        if site.allow.is_some() || site.deny.is_some() {
            let allow = site
                .allow
                .as_deref()
                .map(to_rules)
                .unwrap_or_else(|| profile.policy.allow_rules().to_vec());
            let deny = site
                .deny
                .as_deref()
                .map(to_rules)
                .unwrap_or_else(|| profile.policy.deny_rules().to_vec());
            profile.policy = AssetPolicy::new(allow, deny);
        }

        Ok(profile)
    }
}

fn to_rules(entries: &[HostRuleEntry]) -> Vec<HostRule> {
    entries
        .iter()
        .map(|e| HostRule::new(&e.host, e.path_prefix.as_deref()))
        .collect()
}

/// Extraction strategy driven by a [`SiteProfile`]
#[derive(Debug)]
pub struct ProfileStrategy {
    profile: SiteProfile,
    anchor_selector: Selector,
    media_selector: Option<Selector>,
    body_pattern: Option<Regex>,
}

impl ProfileStrategy {
    /// Compiles the profile's selectors and body-scan pattern
    pub fn new(profile: SiteProfile) -> Result<Self, ConfigError> {
        let anchor_selector = parse_selector("a[href]")?;

        let media_selector = profile
            .media_selector
            .as_deref()
            .map(parse_selector)
            .transpose()?;

        let body_pattern = if profile.media_extensions.is_empty() {
            None
        } else {
            let extensions = profile
                .media_extensions
                .iter()
                .map(|e| regex::escape(e))
                .collect::<Vec<_>>()
                .join("|");
            let pattern = format!(r#"(?i)https?://[^\s"'<>]+\.(?:{})"#, extensions);
            Some(Regex::new(&pattern).map_err(|e| {
                ConfigError::InvalidPattern(format!("Invalid media extensions: {}", e))
            })?)
        };

        Ok(Self {
            profile,
            anchor_selector,
            media_selector,
            body_pattern,
        })
    }

    /// Absolute links of every `<a href>` on the page, in document order
    fn anchors(&self, document: &Html, base: &Url) -> Vec<(Url, bool)> {
        document
            .select(&self.anchor_selector)
            .filter_map(|element| {
                let href = element.value().attr("href")?;
                let url = resolve_href(href, base)?;
                Some((url, element.value().attr("download").is_some()))
            })
            .collect()
    }

    fn is_download_link(&self, url: &Url, has_download_attr: bool) -> bool {
        has_download_attr
            || url
                .query_pairs()
                .any(|(key, _)| self.profile.download_params.iter().any(|p| *p == key))
    }
}

fn parse_selector(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::Validation(format!("Invalid selector '{}': {:?}", selector, e)))
}

impl ExtractionStrategy for ProfileStrategy {
    fn name(&self) -> &str {
        &self.profile.name
    }

    fn page_index(&self, page_ref: &Url) -> u32 {
        page_index(page_ref, &self.profile.page_param)
    }

    fn find_item_references(&self, page: &Page) -> Vec<Url> {
        let document = Html::parse_document(&page.body);
        self.anchors(&document, &page.url)
            .into_iter()
            .map(|(url, _)| url)
            .filter(|url| same_host(url, &page.url))
            .filter(|url| url.path().starts_with(&self.profile.item_link_prefix))
            .collect()
    }

    fn find_next_page(&self, page: &Page, current_index: u32) -> Option<Url> {
        let document = Html::parse_document(&page.body);
        let expected = current_index.checked_add(1)?;
        self.anchors(&document, &page.url)
            .into_iter()
            .map(|(url, _)| url)
            .find(|url| {
                is_continuation(
                    url,
                    expected,
                    &self.profile.page_param,
                    &self.profile.token_param,
                )
            })
    }

    fn find_asset_candidates(&self, detail: &Page) -> Vec<AssetCandidate> {
        let document = Html::parse_document(&detail.body);
        let mut candidates = Vec::new();

        for (url, has_download_attr) in self.anchors(&document, &detail.url) {
            if self.is_download_link(&url, has_download_attr) {
                candidates.push(AssetCandidate::new(url, CandidateSource::DownloadAnchor));
            }
        }

        if let Some(selector) = &self.media_selector {
            for element in document.select(selector) {
                if let Some(url) = element
                    .value()
                    .attr("src")
                    .and_then(|src| resolve_href(src, &detail.url))
                {
                    candidates.push(AssetCandidate::new(url, CandidateSource::MediaElement));
                }
            }
        }

        if let Some(pattern) = &self.body_pattern {
            let mut seen = HashSet::new();
            for found in pattern.find_iter(&detail.body) {
                if !seen.insert(found.as_str()) {
                    continue;
                }
                if let Ok(url) = Url::parse(found.as_str()) {
                    candidates.push(AssetCandidate::new(url, CandidateSource::BodyScan));
                }
            }
        }

        candidates
    }

    fn asset_policy(&self) -> &AssetPolicy {
        &self.profile.policy
    }

    fn derive_title(&self, detail_ref: &Url) -> Option<String> {
        if self.profile.derive_titles {
            title_from_slug(detail_ref)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(url: &str, body: &str) -> Page {
        Page {
            url: Url::parse(url).unwrap(),
            body: body.to_string(),
        }
    }

    fn images() -> ProfileStrategy {
        ProfileStrategy::new(SiteProfile::preset(SitePreset::AnhmoeImages)).unwrap()
    }

    fn videos() -> ProfileStrategy {
        ProfileStrategy::new(SiteProfile::preset(SitePreset::AnhmoeVideos)).unwrap()
    }

    #[test]
    fn test_item_references_in_document_order() {
        let listing = page(
            "https://anh.moe/category/sfw/?page=3&seek=a",
            r#"<div>
                <a href="/view/One.AbC12"><img src="t1.jpg"></a>
                <a href="/view/One.AbC12">One</a>
                <a href="/view/Two.XyZ34">Two</a>
                <a href="/album/Other.s6C6">album</a>
                <a href="https://elsewhere.example/view/Three">foreign</a>
            </div>"#,
        );
        let refs = images().find_item_references(&listing);
        let refs: Vec<&str> = refs.iter().map(Url::as_str).collect();
        assert_eq!(
            refs,
            vec![
                "https://anh.moe/view/One.AbC12",
                "https://anh.moe/view/One.AbC12",
                "https://anh.moe/view/Two.XyZ34",
            ]
        );
    }

    #[test]
    fn test_next_page_requires_index_and_token() {
        let listing = page(
            "https://anh.moe/category/sfw/?page=3&seek=a",
            r#"
                <a href="/category/sfw/?page=4">no token</a>
                <a href="/category/sfw/?seek=zzz">no index</a>
                <a href="/category/sfw/?page=40&seek=zzz">wrong index</a>
                <a href="/category/sfw/?page=4&seek=2025-07-30+05:08:28.frRGFq">next</a>
            "#,
        );
        let next = images().find_next_page(&listing, 3).unwrap();
        assert_eq!(
            next.as_str(),
            "https://anh.moe/category/sfw/?page=4&seek=2025-07-30+05:08:28.frRGFq"
        );
    }

    #[test]
    fn test_no_next_page() {
        let listing = page(
            "https://anh.moe/category/sfw/?page=3&seek=a",
            r#"<a href="/category/sfw/?page=4">no token</a><a href="/category/sfw/?page=2&seek=b">prev</a>"#,
        );
        assert!(images().find_next_page(&listing, 3).is_none());
    }

    #[test]
    fn test_candidates_in_priority_order() {
        let detail = page(
            "https://anh.moe/view/Clip.AbC12",
            r#"<html><body>
                <script>var u = "https://cdn.save.moe/v/clip.mp4";</script>
                <video src="https://cdn.save.moe/v/clip.mp4"></video>
                <a href="https://cdn.save.moe/v/clip.mp4?dl=1">Download</a>
            </body></html>"#,
        );
        let sources: Vec<CandidateSource> = videos()
            .find_asset_candidates(&detail)
            .into_iter()
            .map(|c| c.source)
            .collect();
        assert_eq!(
            sources,
            vec![
                CandidateSource::DownloadAnchor,
                CandidateSource::MediaElement,
                CandidateSource::BodyScan,
            ]
        );
    }

    #[test]
    fn test_download_attribute_marks_anchor() {
        let detail = page(
            "https://anh.moe/view/x",
            r#"<a href="https://cdn.anh.moe/f/x.jpeg" download>Save</a>"#,
        );
        let candidates = images().find_asset_candidates(&detail);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].source, CandidateSource::DownloadAnchor);
    }

    #[test]
    fn test_image_preset_ignores_media_and_body() {
        let detail = page(
            "https://anh.moe/view/x",
            r#"<img src="https://cdn.anh.moe/f/thumb.jpeg"> https://cdn.save.moe/v/a.mp4"#,
        );
        assert!(images().find_asset_candidates(&detail).is_empty());
    }

    #[test]
    fn test_body_scan_deduplicates_matches() {
        let detail = page(
            "https://anh.moe/view/x",
            r#"<script>a="https://cdn.save.moe/v/a.mp4"; b="https://cdn.save.moe/v/a.mp4";</script>"#,
        );
        let candidates: Vec<_> = videos()
            .find_asset_candidates(&detail)
            .into_iter()
            .filter(|c| c.source == CandidateSource::BodyScan)
            .collect();
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn test_titles_only_for_video_preset() {
        let detail_ref = Url::parse("https://anh.moe/view/Beach.Day.Qx81z").unwrap();
        assert_eq!(videos().derive_title(&detail_ref), Some("Beach Day".to_string()));
        assert_eq!(images().derive_title(&detail_ref), None);
    }

    #[test]
    fn test_config_overrides_layer_on_preset() {
        let site = SiteConfig {
            preset: SitePreset::AnhmoeImages,
            page_param: Some("p".to_string()),
            allow: Some(vec![HostRuleEntry {
                host: "img.example.org".to_string(),
                path_prefix: None,
            }]),
            ..SiteConfig::default()
        };
        let profile = SiteProfile::from_config(&site).unwrap();
        assert_eq!(profile.page_param, "p");
        assert_eq!(profile.token_param, "seek");
        assert_eq!(profile.policy.allow_rules().len(), 1);
        // deny list kept from the preset
        assert_eq!(profile.policy.deny_rules().len(), 4);
    }
}
