//! Integration tests for the crawler
//!
//! These tests use wiremock to serve listing, detail and asset-host pages and
//! drive full crawls end-to-end through the public API.

use asset_harvester::config::{Config, FetcherConfig, HostRuleEntry, SiteConfig, SitePreset};
use asset_harvester::crawler::{crawl, Crawler, TerminationReason};
use asset_harvester::extract::{ProfileStrategy, SiteProfile};
use asset_harvester::storage::{FileStore, Item, MemoryStore, Storage};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration: no delays, a single attempt, and a custom
/// site whose assets live under `/files/` on the mock server itself
fn create_test_config(store_path: &str) -> Config {
    let mut config = Config::default();
    config.fetcher = FetcherConfig {
        retry_delay_ms: 0,
        max_attempts: 2,
        timeout_secs: 5,
        ..FetcherConfig::default()
    };
    config.crawl.page_delay_ms = 0;
    config.crawl.item_delay_ms = 0;
    config.store.path = store_path.to_string();
    config.site = SiteConfig {
        preset: SitePreset::Custom,
        allow: Some(vec![HostRuleEntry {
            host: "127.0.0.1".to_string(),
            path_prefix: Some("/files/".to_string()),
        }]),
        ..SiteConfig::default()
    };
    config
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!("<html><body>{}</body></html>", body))
        .insert_header("content-type", "text/html")
}

/// Detail page whose download anchor points at `/files/<name>.jpg`
async fn mount_detail(server: &MockServer, name: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/view/{}", name)))
        .respond_with(html(&format!(
            r#"<img src="/thumbs/{name}.jpg">
               <a href="{base}/files/{name}.jpg?dl=1">Download</a>"#,
            name = name,
            base = server.uri()
        )))
        .mount(server)
        .await;
}

/// Page 1: a, b, a (duplicate) and a continuation; page 2: c, d and no continuation
async fn mount_two_page_listing(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/list/"))
        .and(query_param("page", "1"))
        .respond_with(html(
            r#"<a href="/view/a">A</a>
               <a href="/view/b">B</a>
               <a href="/view/a"><img src="/thumbs/a.jpg"></a>
               <a href="/list/?page=3&seek=zzz">skip</a>
               <a href="/list/?page=2">no token</a>
               <a href="/list/?page=2&seek=abc">Next</a>"#,
        ))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/list/"))
        .and(query_param("page", "2"))
        .respond_with(html(
            r#"<a href="/view/c">C</a>
               <a href="/view/d">D</a>
               <a href="/list/?page=1&seek=abc">Previous</a>"#,
        ))
        .expect(1)
        .mount(server)
        .await;

    for name in ["a", "b", "c", "d"] {
        mount_detail(server, name).await;
    }
}

fn asset(server: &MockServer, name: &str) -> String {
    format!("{}/files/{}.jpg", server.uri(), name)
}

fn strategy_for(config: &Config) -> Box<ProfileStrategy> {
    let profile = SiteProfile::from_config(&config.site).expect("valid profile");
    Box::new(ProfileStrategy::new(profile).expect("valid strategy"))
}

#[tokio::test]
async fn test_two_page_listing_in_page_then_item_order() {
    let mock_server = MockServer::start().await;
    mount_two_page_listing(&mock_server).await;

    let config = create_test_config("unused.json");
    let crawler = Crawler::new(&config, strategy_for(&config), MemoryStore::new()).unwrap();

    let start = url::Url::parse(&format!("{}/list/?page=1", mock_server.uri())).unwrap();
    let outcome = crawler.run_session(&start, 10).await;

    assert_eq!(outcome.pages_visited, 2);
    assert_eq!(outcome.termination, TerminationReason::NoNextPage);
    assert_eq!(outcome.items_failed, 0);

    let urls: Vec<&str> = outcome.items.iter().map(|i| i.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            asset(&mock_server, "a"),
            asset(&mock_server, "b"),
            asset(&mock_server, "c"),
            asset(&mock_server, "d"),
        ]
    );

    // run_session never writes
    assert!(crawler.store().load().unwrap().buckets().is_empty());
}

#[tokio::test]
async fn test_page_bound_stops_before_second_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/list/"))
        .and(query_param("page", "1"))
        .respond_with(html(
            r#"<a href="/view/a">A</a><a href="/list/?page=2&seek=abc">Next</a>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/list/"))
        .and(query_param("page", "2"))
        .respond_with(html(""))
        .expect(0)
        .mount(&mock_server)
        .await;
    mount_detail(&mock_server, "a").await;

    let config = create_test_config("unused.json");
    let crawler = Crawler::new(&config, strategy_for(&config), MemoryStore::new()).unwrap();
    let start = url::Url::parse(&format!("{}/list/?page=1", mock_server.uri())).unwrap();
    let outcome = crawler.run_session(&start, 1).await;

    assert_eq!(outcome.pages_visited, 1);
    assert_eq!(outcome.termination, TerminationReason::PageLimit);
    assert_eq!(outcome.items, vec![Item::new(asset(&mock_server, "a"))]);
}

#[tokio::test]
async fn test_unreachable_start_yields_empty_outcome() {
    let mock_server = MockServer::start().await;

    // Two attempts, both failing
    Mock::given(method("GET"))
        .and(path("/list/"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("harvest.json");
    let config = create_test_config(&store_path.to_string_lossy());

    let report = crawl(
        &config,
        &format!("{}/list/?page=1", mock_server.uri()),
        "empty",
        10,
        None,
    )
    .await
    .unwrap();

    assert_eq!(report.pages_visited, 1);
    assert!(report.items.is_empty());
    assert_eq!(report.termination, TerminationReason::NoNextPage);
    assert!(report.merge.is_none());
    // nothing resolved, so the store is never created
    assert!(!store_path.exists());
}

#[tokio::test]
async fn test_unresolvable_items_do_not_abort_the_crawl() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/list/"))
        .respond_with(html(
            r#"<a href="/view/gone">Gone</a>
               <a href="/view/video">Video</a>
               <a href="/view/a">A</a>"#,
        ))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/view/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    // Only an out-of-scope CDN link
    Mock::given(method("GET"))
        .and(path("/view/video"))
        .respond_with(html(
            r#"<a href="https://cdn.save.moe/v/clip.mp4?dl=1">Download</a>"#,
        ))
        .mount(&mock_server)
        .await;
    mount_detail(&mock_server, "a").await;

    let config = create_test_config("unused.json");
    let crawler = Crawler::new(&config, strategy_for(&config), MemoryStore::new()).unwrap();
    let report = crawler
        .crawl(&format!("{}/list/", mock_server.uri()), "mixed", 5)
        .await
        .unwrap();

    assert_eq!(report.items_failed, 2);
    assert_eq!(report.items, vec![Item::new(asset(&mock_server, "a"))]);
    assert_eq!(crawler.store().load().unwrap().bucket("mixed").len(), 1);
}

#[tokio::test]
async fn test_rerun_into_file_store_is_idempotent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/list/"))
        .and(query_param("page", "1"))
        .respond_with(html(
            r#"<a href="/view/a">A</a><a href="/view/b">B</a>
               <a href="/list/?page=2&seek=abc">Next</a>"#,
        ))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/list/"))
        .and(query_param("page", "2"))
        .respond_with(html(r#"<a href="/view/c">C</a>"#))
        .mount(&mock_server)
        .await;
    for name in ["a", "b", "c"] {
        mount_detail(&mock_server, name).await;
    }

    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("harvest.json");

    // Seed the bucket with one asset the crawl will find and one it will not
    let store = FileStore::new(&store_path, "HARVEST_DATA");
    store
        .merge_bucket(
            "girl-xinh",
            &[Item::new(asset(&mock_server, "b")), Item::new("https://old.example/x.jpg")],
        )
        .unwrap();
    store
        .merge_bucket("kuzu", &[Item::new("https://old.example/k.jpg")])
        .unwrap();

    let config = create_test_config(&store_path.to_string_lossy());
    let start = format!("{}/list/?page=1", mock_server.uri());

    let first = crawl(&config, &start, "girl-xinh", 10, None).await.unwrap();
    assert_eq!(first.pages_visited, 2);
    assert_eq!(first.items_found(), 3);
    assert_eq!(first.items_added(), 2);
    let merge = first.merge.unwrap();
    assert_eq!((merge.existing, merge.total), (2, 4));

    let after_first = std::fs::read_to_string(&store_path).unwrap();

    let second = crawl(&config, &start, "girl-xinh", 10, None).await.unwrap();
    assert_eq!(second.items_found(), 3);
    assert_eq!(second.items_added(), 0);
    assert_eq!(std::fs::read_to_string(&store_path).unwrap(), after_first);

    let document = store.load().unwrap();
    let urls: Vec<&str> = document
        .bucket("girl-xinh")
        .iter()
        .map(|i| i.url.as_str())
        .collect();
    assert_eq!(
        urls,
        vec![
            asset(&mock_server, "b"),
            "https://old.example/x.jpg".to_string(),
            asset(&mock_server, "a"),
            asset(&mock_server, "c"),
        ]
    );
    assert_eq!(document.bucket("kuzu").len(), 1);
    assert_eq!(document.total(), 5);
}

#[tokio::test]
async fn test_script_store_with_checkpoints() {
    let mock_server = MockServer::start().await;
    mount_two_page_listing(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("data").join("tags-data.js");

    let mut config = create_test_config(&store_path.to_string_lossy());
    config.store.js_variable = "TAGS_DATA".to_string();
    config.crawl.checkpoint_every = 1;

    let report = crawl(
        &config,
        &format!("{}/list/?page=1", mock_server.uri()),
        "tag",
        10,
        None,
    )
    .await
    .unwrap();

    assert_eq!(report.items_added(), 4);
    let raw = std::fs::read_to_string(&store_path).unwrap();
    assert!(raw.contains("window.TAGS_DATA = {"));

    let store = FileStore::new(&store_path, "TAGS_DATA");
    assert_eq!(store.load().unwrap().bucket("tag").len(), 4);
}
