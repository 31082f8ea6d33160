use serde::Deserialize;

/// Browser-like identity; the target sites block obvious bot user agents
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

/// Main configuration structure for Asset-Harvester
///
/// Every section is optional; omitted values fall back to the defaults the
/// crawler was tuned with.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetcher: FetcherConfig,
    pub crawl: CrawlConfig,
    pub store: StoreConfig,
    pub site: SiteConfig,
    #[serde(rename = "target")]
    pub targets: Vec<TargetEntry>,
}

/// HTTP fetcher configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Fixed delay between attempts of the same request (milliseconds)
    #[serde(rename = "retry-delay-ms")]
    pub retry_delay_ms: u64,

    /// Maximum number of attempts per request
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Referer header sent with every request
    pub referer: Option<String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            retry_delay_ms: 2000,
            max_attempts: 3,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            referer: None,
        }
    }
}

/// Crawl pacing and bounds
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Delay between listing pages (milliseconds)
    #[serde(rename = "page-delay-ms")]
    pub page_delay_ms: u64,

    /// Delay between detail-page resolutions (milliseconds)
    #[serde(rename = "item-delay-ms")]
    pub item_delay_ms: u64,

    /// Default page bound when a target does not set one
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Merge pending items every N visited pages; 0 merges only at the end
    #[serde(rename = "checkpoint-every")]
    pub checkpoint_every: u32,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            page_delay_ms: 1000,
            item_delay_ms: 500,
            max_pages: 300,
            checkpoint_every: 0,
        }
    }
}

/// Store location and output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the store document (`.json`, or `.js` for a script wrapper)
    pub path: String,

    /// Global variable name used when the store is a `.js` file
    #[serde(rename = "js-variable")]
    pub js_variable: String,

    /// Directory for per-run snapshot files
    #[serde(rename = "snapshot-dir")]
    pub snapshot_dir: Option<String>,

    /// How buckets are arranged inside the document
    pub layout: BucketLayoutKind,

    /// Top-level key holding the buckets (`buckets` for `map`, `threads` for `list`)
    #[serde(rename = "bucket-key")]
    pub bucket_key: Option<String>,

    /// `list` layout: entry field carrying the bucket name
    #[serde(rename = "name-field")]
    pub name_field: String,

    /// `list` layout: entry field carrying the items
    #[serde(rename = "items-field")]
    pub items_field: String,

    /// Top-level array every merged bucket name is registered in
    #[serde(rename = "name-list-key")]
    pub name_list_key: Option<String>,

    /// Top-level object every merged bucket name gets an (empty) entry in
    #[serde(rename = "index-key")]
    pub index_key: Option<String>,

    /// Rewrite a top-level `total` item count on every merge
    #[serde(rename = "write-total")]
    pub write_total: bool,
}

impl StoreConfig {
    /// The configured bucket key, or the layout's default
    pub fn bucket_key(&self) -> &str {
        match (&self.bucket_key, self.layout) {
            (Some(key), _) => key,
            (None, BucketLayoutKind::Map) => "buckets",
            (None, BucketLayoutKind::List) => "threads",
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "harvest.json".to_string(),
            js_variable: "HARVEST_DATA".to_string(),
            snapshot_dir: None,
            layout: BucketLayoutKind::Map,
            bucket_key: None,
            name_field: "title".to_string(),
            items_field: "videos".to_string(),
            name_list_key: None,
            index_key: None,
            write_total: true,
        }
    }
}

/// Shape of the bucket collection in the store document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BucketLayoutKind {
    /// `{"<bucket-key>": {"<name>": [items]}}`
    #[default]
    Map,
    /// `{"<bucket-key>": [{"<name-field>": "<name>", "<items-field>": [items]}]}`
    List,
}

/// Built-in site profiles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum SitePreset {
    /// Image posts: image CDN allowed, video CDNs denied
    #[default]
    AnhmoeImages,
    /// Video posts: video CDNs allowed, titles derived from the view slug
    AnhmoeVideos,
    /// No built-in rules; everything comes from the `[site]` section
    Custom,
}

impl SitePreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AnhmoeImages => "anhmoe-images",
            Self::AnhmoeVideos => "anhmoe-videos",
            Self::Custom => "custom",
        }
    }
}

/// Site extraction settings layered over a preset
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub preset: SitePreset,

    /// Site root used for the referer default and for locating detail pages
    #[serde(rename = "base-url")]
    pub base_url: Option<String>,

    /// Path prefix of item detail pages (e.g. "/view/")
    #[serde(rename = "item-link-prefix")]
    pub item_link_prefix: Option<String>,

    /// Query parameter carrying the page index
    #[serde(rename = "page-param")]
    pub page_param: Option<String>,

    /// Query parameter carrying the continuation token
    #[serde(rename = "token-param")]
    pub token_param: Option<String>,

    /// Query parameters that mark a download anchor
    #[serde(rename = "download-params")]
    pub download_params: Option<Vec<String>>,

    /// CSS selector for native media elements
    #[serde(rename = "media-selector")]
    pub media_selector: Option<String>,

    /// File extensions recognized by the raw-body scan
    #[serde(rename = "media-extensions")]
    pub media_extensions: Option<Vec<String>>,

    /// Whether to derive item titles from the detail-page slug
    #[serde(rename = "derive-titles")]
    pub derive_titles: Option<bool>,

    /// Asset hosts in scope for this site
    pub allow: Option<Vec<HostRuleEntry>>,

    /// Asset hosts always rejected
    pub deny: Option<Vec<HostRuleEntry>>,
}

/// Host pattern entry for the allow and deny lists
#[derive(Debug, Clone, Deserialize)]
pub struct HostRuleEntry {
    /// Host pattern (e.g., "cdn.anh.moe" or "*.save.moe")
    pub host: String,

    /// Optional path prefix (e.g., "/f/")
    #[serde(rename = "path-prefix")]
    pub path_prefix: Option<String>,
}

/// One crawl target for batch runs
#[derive(Debug, Clone, Deserialize)]
pub struct TargetEntry {
    /// Start listing-page URL
    pub start: String,

    /// Bucket the results are merged into
    pub bucket: String,

    /// Page bound for this target
    #[serde(rename = "max-pages")]
    pub max_pages: Option<u32>,

    /// Preset override for this target
    pub preset: Option<SitePreset>,
}
