//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! crawl cycle end-to-end: HTTP fetch, parse, dedup, per-worker JSON output
//! and finalization. The crawl itself is blocking, so it runs on tokio's
//! blocking pool while the mock server lives on the async runtime.

use ripple_crawl::config::Config;
use ripple_crawl::output::{merge_output_dir, worker_file_name, PageRecord};
use ripple_crawl::{crawl, CrawlError, CrawlReport, StopReason};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration writing into `output_dir`
fn create_test_config(output_dir: &Path, workers: usize, max_depth: u32) -> Config {
    let mut config = Config::default();
    config.crawler.workers = workers;
    config.crawler.max_depth = max_depth;
    config.crawler.delay_ms = 10; // Very short for testing
    config.crawler.poll_interval_ms = 10;
    config.fetcher.timeout_secs = 5;
    config.fetcher.user_agent = "TestBot/1.0".to_string();
    config.output.directory = output_dir.to_string_lossy().into_owned();
    config
}

/// Runs the blocking crawl off the async runtime
async fn run_crawl(config: Config, seed: String) -> Result<CrawlReport, CrawlError> {
    tokio::task::spawn_blocking(move || crawl(&config, &seed))
        .await
        .expect("crawl thread panicked")
}

fn html_page(title: &str, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!(
            "<html><head><title>{}</title></head><body>{}</body></html>",
            title, body
        ))
        .insert_header("content-type", "text/html")
}

fn sorted_urls(records: &[PageRecord]) -> Vec<String> {
    let mut urls: Vec<String> = records.iter().map(|r| r.url.clone()).collect();
    urls.sort();
    urls
}

#[tokio::test(flavor = "multi_thread")]
async fn test_full_crawl_single_domain() {
    // Start a mock server
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // Mock index page with relative and absolute links
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            "Home",
            &format!(
                r#"<a href="/page1">Page 1</a>
                   <a href="{}/page2">Page 2</a>
                   <a href="mailto:someone@example.com">Mail</a>"#,
                base_url
            ),
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    // page1 links back home and to itself with a fragment
    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(html_page(
            "Page 1",
            r#"<a href="/">Home</a><a href="/page1#top">Top</a>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    // page2 links to a page that does not exist
    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(html_page("Page 2", r#"<a href="/missing">Gone</a>"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let output_dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(output_dir.path(), 3, 2);

    let report = run_crawl(config, format!("{}/", base_url))
        .await
        .expect("Crawl failed");

    assert_eq!(report.reason, StopReason::Quiescent);
    assert_eq!(report.stats.pages_processed, 3);
    assert_eq!(report.stats.fetch_failures, 1);
    assert_eq!(report.workers.len(), 3);

    // Every worker wrote its own file
    for worker_id in 0..3 {
        assert!(output_dir.path().join(worker_file_name(worker_id)).exists());
    }

    let records = merge_output_dir(output_dir.path()).expect("Failed to merge output");
    assert_eq!(
        sorted_urls(&records),
        vec![
            format!("{}/", base_url),
            format!("{}/page1", base_url),
            format!("{}/page2", base_url),
        ]
    );

    let home = records
        .iter()
        .find(|r| r.url == format!("{}/", base_url))
        .expect("Home page not recorded");
    assert_eq!(home.title, "Home");
    assert_eq!(home.description, "No description");
    assert_eq!(home.depth, 0);
    assert_eq!(
        home.links,
        vec![format!("{}/page1", base_url), format!("{}/page2", base_url)]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_max_depth_zero_fetches_only_seed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Seed", r#"<a href="/next">Next</a>"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/next"))
        .respond_with(html_page("Next", ""))
        .expect(0)
        .mount(&mock_server)
        .await;

    let output_dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(output_dir.path(), 2, 0);

    let report = run_crawl(config, format!("{}/", mock_server.uri()))
        .await
        .expect("Crawl failed");

    assert_eq!(report.stats.pages_processed, 1);
    let records = merge_output_dir(output_dir.path()).expect("Failed to merge output");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].links, vec![format!("{}/next", mock_server.uri())]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_relative_links_resolve_against_redirect_target() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/old/start"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/new/start"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/new/start"))
        .respond_with(html_page("Moved", r#"<a href="child">Child</a>"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/new/child"))
        .respond_with(html_page("Child", ""))
        .expect(1)
        .mount(&mock_server)
        .await;

    let output_dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(output_dir.path(), 2, 1);

    run_crawl(config, format!("{}/old/start", base_url))
        .await
        .expect("Crawl failed");

    let records = merge_output_dir(output_dir.path()).expect("Failed to merge output");
    assert_eq!(
        sorted_urls(&records),
        vec![
            format!("{}/new/child", base_url),
            format!("{}/old/start", base_url),
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cycles_are_fetched_once() {
    let mock_server = MockServer::start().await;

    // Three pages all linking to each other
    for (page, title) in [("/a", "A"), ("/b", "B"), ("/c", "C")] {
        Mock::given(method("GET"))
            .and(path(page))
            .respond_with(html_page(
                title,
                r#"<a href="/a">A</a><a href="/b">B</a><a href="/c">C</a>"#,
            ))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let output_dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(output_dir.path(), 4, 10);

    let report = run_crawl(config, format!("{}/a", mock_server.uri()))
        .await
        .expect("Crawl failed");

    assert_eq!(report.reason, StopReason::Quiescent);
    assert_eq!(report.stats.pages_processed, 3);
    assert_eq!(report.stats.links_enqueued, 2);
}

#[test]
fn test_unreachable_seed_leaves_empty_arrays() {
    let output_dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = create_test_config(output_dir.path(), 2, 3);
    config.fetcher.timeout_secs = 1;

    // Nothing listens on the discard port
    let report = crawl(&config, "http://127.0.0.1:9/").expect("Crawl failed");

    assert_eq!(report.reason, StopReason::Quiescent);
    assert_eq!(report.stats.pages_processed, 0);
    assert_eq!(report.stats.fetch_failures, 1);

    for worker_id in 0..2 {
        let content = std::fs::read_to_string(output_dir.path().join(worker_file_name(worker_id)))
            .expect("Missing worker file");
        let records: Vec<PageRecord> =
            serde_json::from_str(&content).expect("Worker file is not a JSON array");
        assert!(records.is_empty());
    }
}

#[test]
fn test_shared_output_directory_keeps_foreign_files() {
    let output_dir = TempDir::new().expect("Failed to create temp dir");
    let notes = output_dir.path().join("notes.txt");
    let image = output_dir.path().join("image.png");
    std::fs::write(&notes, "keep me").expect("Failed to write notes");
    std::fs::write(&image, [0xffu8, 0xfe, 0x00]).expect("Failed to write image");

    // Output of an earlier run with more workers
    let stale = output_dir.path().join(worker_file_name(5));
    std::fs::write(
        &stale,
        r#"[{"url":"https://old.test/","title":"Old","description":"Old","depth":0,"links":[]}]"#,
    )
    .expect("Failed to write stale output");

    let mut config = create_test_config(output_dir.path(), 2, 3);
    config.fetcher.timeout_secs = 1;

    let report = crawl(&config, "http://127.0.0.1:9/").expect("Crawl failed");
    assert_eq!(report.reason, StopReason::Quiescent);

    assert!(!stale.exists());
    assert_eq!(std::fs::read_to_string(&notes).unwrap(), "keep me");
    assert_eq!(std::fs::read(&image).unwrap(), vec![0xff, 0xfe, 0x00]);

    let records = merge_output_dir(output_dir.path()).expect("Failed to merge output");
    assert!(records.is_empty());
}

#[test]
fn test_invalid_configuration_is_fatal() {
    let output_dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(output_dir.path(), 0, 3);

    let result = crawl(&config, "http://127.0.0.1:9/");
    assert!(matches!(result, Err(CrawlError::Config(_))));
}

#[test]
fn test_invalid_seed_is_fatal() {
    let output_dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(output_dir.path(), 1, 3);

    let result = crawl(&config, "ftp://example.com/");
    assert!(matches!(result, Err(CrawlError::Config(_))));
}
