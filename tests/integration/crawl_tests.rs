//! Integration tests for the crawler
//!
//! These tests run whole crawls, either against wiremock servers through the
//! real HTTP client or against an in-memory site behind the `Fetcher` trait.

use async_trait::async_trait;
use site_mirror::config::{Config, CrawlerConfig};
use site_mirror::crawler::{mirror, Coordinator, CrawlReport, Fetched, Fetcher};
use site_mirror::state::CrawlPhase;
use site_mirror::storage::ResourceStore;
use site_mirror::{ErrorKind, MirrorError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration writing into `dir`
fn create_test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.crawler.workers = 4;
    config.crawler.timeout_secs = 10;
    config.user_agent.crawler_name = "TestMirror".to_string();
    config.output.mirror_dir = dir.path().join("mirror");
    config
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/html; charset=utf-8")
}

/// Directory the mirror of a wiremock server lands in
fn host_dir(config: &Config, server: &MockServer) -> std::path::PathBuf {
    let url = Url::parse(&server.uri()).unwrap();
    let host = format!("{}:{}", url.host_str().unwrap(), url.port().unwrap());
    config.output.mirror_dir.join(host)
}

async fn run_mirror(seed: &str, depth: u32, config: &Config) -> CrawlReport {
    tokio::time::timeout(
        Duration::from_secs(20),
        mirror(seed, depth, config, CancellationToken::new()),
    )
    .await
    .expect("crawl should terminate")
    .expect("crawl should start")
}

#[tokio::test]
async fn test_mirror_same_site_links_once() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(&format!(
            r#"<html><body>
                <a href="/about">About</a>
                <a href="{}/about">About again</a>
                <a href="/about#team">Team</a>
                <a href="http://other.com/x">Elsewhere</a>
            </body></html>"#,
            server.uri()
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html(r#"<a href="/">Home</a>"#))
        .expect(1)
        .mount(&server)
        .await;

    let seed = format!("{}/", server.uri());
    let report = run_mirror(&seed, 1, &config).await;

    assert!(report.is_success(), "unexpected error: {:?}", report.first_error);
    assert_eq!(report.error_count, 0);
    assert_eq!(report.phase, CrawlPhase::Finished);
    assert_eq!(report.stats.resources_saved, 2);

    let root = host_dir(&config, &server);
    assert!(root.join("index.html").exists());
    assert!(root.join("about.html").exists());
    assert!(!config.output.mirror_dir.join("other.com").exists());
}

#[tokio::test]
async fn test_mirror_depth_zero_downloads_seed_only() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<a href="/a">A</a><img src="/logo.png">"#))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html("a"))
        .expect(0)
        .mount(&server)
        .await;

    let seed = format!("{}/", server.uri());
    let report = run_mirror(&seed, 0, &config).await;

    assert!(report.is_success());
    assert_eq!(report.stats.resources_saved, 1);
    assert_eq!(report.stats.links_discovered, 0);
}

#[tokio::test]
async fn test_mirror_not_found_returns_error_after_draining() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<a href="/missing">Missing</a>"#))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let seed = format!("{}/", server.uri());
    let report = run_mirror(&seed, 1, &config).await;

    assert_eq!(report.phase, CrawlPhase::Finished);
    assert_eq!(report.error_count, 1);
    assert!(host_dir(&config, &server).join("index.html").exists());

    let err = report.into_result().unwrap_err();
    assert!(matches!(err, MirrorError::HttpStatus { status: 404, .. }));
}

#[tokio::test]
async fn test_mirror_saves_non_html_assets() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(concat!(
            r#"<link rel="stylesheet" href="/css/site.css">"#,
            r#"<img srcset="/img/a.png 1x, /img/b.png 2x">"#,
        )))
        .mount(&server)
        .await;

    for (asset, content_type) in [
        ("/css/site.css", "text/css"),
        ("/img/a.png", "image/png"),
        ("/img/b.png", "image/png"),
    ] {
        Mock::given(method("GET"))
            .and(path(asset))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"asset".to_vec(), content_type))
            .expect(1)
            .mount(&server)
            .await;
    }

    let seed = format!("{}/", server.uri());
    let report = run_mirror(&seed, 3, &config).await;

    assert!(report.is_success());
    assert_eq!(report.stats.resources_saved, 4);

    let root = host_dir(&config, &server);
    assert!(root.join("css/site.css").exists());
    assert!(root.join("img/a.png").exists());
    assert!(root.join("img/b.png").exists());
}

#[tokio::test]
async fn test_mirror_rejects_invalid_seed() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);

    let err = mirror("not a url", 1, &config, CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidUrl);

    let err = mirror("mailto:me@example.com", 1, &config, CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedScheme);
}

// ===== In-memory site =====

/// An in-memory site that records every URL it is asked for
struct FakeSite {
    pages: HashMap<String, String>,
    delay: Duration,
    page_delays: HashMap<String, Duration>,
    requests: Mutex<Vec<String>>,
}

impl FakeSite {
    fn new(pages: &[(&str, &str)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(url, body)| (url.to_string(), body.to_string()))
                .collect(),
            delay: Duration::ZERO,
            page_delays: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Overrides the delay for a single URL
    fn with_page_delay(mut self, url: &str, delay: Duration) -> Self {
        self.page_delays.insert(url.to_string(), delay);
        self
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn request_count(&self, url: &str) -> usize {
        self.requests().iter().filter(|r| r.as_str() == url).count()
    }
}

#[async_trait]
impl Fetcher for FakeSite {
    async fn fetch(&self, url: &Url) -> Result<Fetched, MirrorError> {
        self.requests.lock().unwrap().push(url.to_string());
        let delay = self.page_delays.get(url.as_str()).copied().unwrap_or(self.delay);
        tokio::time::sleep(delay).await;

        match self.pages.get(url.as_str()) {
            Some(body) => Ok(Fetched {
                body: body.clone().into_bytes(),
                content_type: "text/html".to_string(),
                status: 200,
                final_url: url.clone(),
            }),
            None => Err(MirrorError::HttpStatus {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

fn crawler_config(workers: usize, queue_capacity: usize, fail_fast: bool) -> CrawlerConfig {
    CrawlerConfig {
        workers,
        queue_capacity,
        fail_fast,
        timeout_secs: 10,
        ..CrawlerConfig::default()
    }
}

async fn run_fake(
    site: Arc<FakeSite>,
    depth: u32,
    config: &CrawlerConfig,
) -> (TempDir, Arc<ResourceStore>, CrawlReport) {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(ResourceStore::open(dir.path()).unwrap());
    let seed = Url::parse("https://example.com/").unwrap();

    let coordinator = Coordinator::new(seed, depth, config, store.clone(), site).unwrap();
    let report = tokio::time::timeout(
        Duration::from_secs(20),
        coordinator.run(CancellationToken::new()),
    )
    .await
    .expect("crawl should terminate");

    (dir, store, report)
}

#[tokio::test]
async fn test_external_links_never_fetched() {
    let site = Arc::new(FakeSite::new(&[
        (
            "https://example.com/",
            r#"<a href="/about">About</a><a href="https://other.com/">Other</a>
               <a href="https://blog.example.com/post">Blog</a>"#,
        ),
        ("https://example.com/about", "about"),
        ("https://blog.example.com/post", "post"),
    ]));

    let (_dir, store, report) = run_fake(site.clone(), 2, &crawler_config(4, 100, true)).await;

    assert!(report.is_success());
    assert_eq!(store.len(), 3);
    assert_eq!(site.request_count("https://example.com/about"), 1);
    assert!(site.requests().iter().all(|url| !url.contains("other.com")));
}

#[tokio::test]
async fn test_cyclic_site_terminates() {
    let site = Arc::new(FakeSite::new(&[
        ("https://example.com/", r#"<a href="/a">a</a>"#),
        ("https://example.com/a", r#"<a href="/b">b</a><a href="/">home</a>"#),
        ("https://example.com/b", r#"<a href="/a">a</a><a href="/">home</a>"#),
    ]));

    let (_dir, store, report) = run_fake(site.clone(), 50, &crawler_config(3, 100, true)).await;

    assert!(report.is_success());
    assert_eq!(store.len(), 3);
    assert_eq!(store.disk_writes(), 3);
    for url in ["https://example.com/", "https://example.com/a", "https://example.com/b"] {
        assert_eq!(site.request_count(url), 1, "{} fetched more than once", url);
    }
}

#[tokio::test]
async fn test_queue_capacity_one_drops_second_child() {
    let site = Arc::new(FakeSite::new(&[
        ("https://example.com/", r#"<a href="/a">a</a><a href="/b">b</a>"#),
        ("https://example.com/a", "a"),
        ("https://example.com/b", "b"),
    ]));

    // One worker: nothing drains the queue while the seed's children are enqueued
    let (_dir, store, report) = run_fake(site.clone(), 1, &crawler_config(1, 1, false)).await;

    assert_eq!(report.error_count, 1);
    assert!(matches!(
        report.first_error,
        Some(MirrorError::QueueFull { ref url }) if url == "https://example.com/b"
    ));
    assert_eq!(report.stats.links_dropped, 1);
    assert_eq!(report.stats.errors_by_kind.get(&ErrorKind::QueueFull), Some(&1));
    assert_eq!(report.phase, CrawlPhase::Finished);

    assert_eq!(store.len(), 2);
    assert_eq!(site.request_count("https://example.com/b"), 0);
}

#[tokio::test]
async fn test_keep_going_collects_every_error() {
    let site = Arc::new(FakeSite::new(&[
        (
            "https://example.com/",
            r#"<a href="/gone1">1</a><a href="/gone2">2</a><a href="/ok">ok</a>"#,
        ),
        ("https://example.com/ok", "ok"),
    ]));

    let (_dir, store, report) = run_fake(site, 1, &crawler_config(2, 100, false)).await;

    assert_eq!(report.error_count, 2);
    assert_eq!(report.stats.errors_by_kind.get(&ErrorKind::FetchFailed), Some(&2));
    assert!(store.contains("https://example.com/ok"));
    assert_eq!(store.len(), 2);
}

/// A seed linking to a page that fails at once and to a slow page with a
/// chain of two pages behind it
fn failing_and_slow_branches() -> FakeSite {
    FakeSite::new(&[
        (
            "https://example.com/",
            r#"<a href="/gone">gone</a><a href="/slow">slow</a>"#,
        ),
        ("https://example.com/slow", r#"<a href="/deep1">deep</a>"#),
        ("https://example.com/deep1", r#"<a href="/deep2">deeper</a>"#),
        ("https://example.com/deep2", "bottom"),
    ])
    .with_page_delay("https://example.com/slow", Duration::from_millis(300))
}

#[tokio::test]
async fn test_fail_fast_stops_at_first_error() {
    let site = Arc::new(failing_and_slow_branches());

    let (_dir, store, report) = run_fake(site.clone(), 3, &crawler_config(2, 100, true)).await;

    assert_eq!(report.phase, CrawlPhase::Finished);
    assert_eq!(report.error_count, 1);
    assert!(matches!(
        report.first_error,
        Some(MirrorError::HttpStatus { ref url, status: 404 }) if url == "https://example.com/gone"
    ));

    // The slow fetch is abandoned, so nothing behind it is requested
    assert!(!store.contains("https://example.com/slow"));
    assert_eq!(site.request_count("https://example.com/deep1"), 0);
    assert_eq!(site.request_count("https://example.com/deep2"), 0);

    let err = report.into_result().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FetchFailed);
}

#[tokio::test]
async fn test_keep_going_crawls_past_first_error() {
    let site = Arc::new(failing_and_slow_branches());

    let (_dir, store, report) = run_fake(site.clone(), 3, &crawler_config(2, 100, false)).await;

    assert_eq!(report.phase, CrawlPhase::Finished);
    assert_eq!(report.error_count, 1);
    assert_eq!(report.stats.errors_by_kind.get(&ErrorKind::FetchFailed), Some(&1));
    assert_eq!(site.request_count("https://example.com/deep1"), 1);
    assert_eq!(site.request_count("https://example.com/deep2"), 1);
    assert!(store.contains("https://example.com/deep2"));
    assert_eq!(store.len(), 4);
}

#[tokio::test]
async fn test_slow_deep_chain_is_fully_crawled() {
    // Each page only links to the next, so the in-flight counter would hit
    // zero between pages if children were tracked after the parent finished
    let pages: Vec<(String, String)> = (0..8)
        .map(|i| {
            let url = if i == 0 {
                "https://example.com/".to_string()
            } else {
                format!("https://example.com/p{}", i)
            };
            (url, format!(r#"<a href="/p{}">next</a>"#, i + 1))
        })
        .collect();
    let page_refs: Vec<(&str, &str)> = pages
        .iter()
        .map(|(url, body)| (url.as_str(), body.as_str()))
        .collect();

    let site = Arc::new(FakeSite::new(&page_refs).with_delay(Duration::from_millis(15)));

    let (_dir, store, report) = run_fake(site, 7, &crawler_config(4, 100, true)).await;

    assert!(report.is_success(), "unexpected error: {:?}", report.first_error);
    assert_eq!(store.len(), 8);
    assert!(store.contains("https://example.com/p7"));
}

#[tokio::test]
async fn test_shared_assets_written_once() {
    let mut pages = vec![(
        "https://example.com/".to_string(),
        (0..10)
            .map(|i| format!(r#"<a href="/page{}">p</a>"#, i))
            .collect::<String>(),
    )];
    for i in 0..10 {
        pages.push((
            format!("https://example.com/page{}", i),
            r#"<a href="/shared">shared</a><a href="/">home</a>"#.to_string(),
        ));
    }
    pages.push(("https://example.com/shared".to_string(), "shared".to_string()));
    let page_refs: Vec<(&str, &str)> = pages
        .iter()
        .map(|(url, body)| (url.as_str(), body.as_str()))
        .collect();

    let site = Arc::new(FakeSite::new(&page_refs).with_delay(Duration::from_millis(5)));

    let (_dir, store, report) = run_fake(site, 2, &crawler_config(8, 100, true)).await;

    assert!(report.is_success(), "unexpected error: {:?}", report.first_error);
    assert_eq!(store.len(), 12);
    assert_eq!(store.disk_writes(), 12);
    assert_eq!(report.stats.resources_saved, 12);
}
