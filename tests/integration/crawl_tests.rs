//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! crawl cycle end-to-end.

use potator_crawler::config::{Config, StorageBackend};
use potator_crawler::frontier::Frontier;
use potator_crawler::storage::{content_address, open_storage, MemoryStorage, PageMetadata};
use potator_crawler::{CrawlEngine, StopReason};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Creates a fast test configuration
fn create_test_config(max_pages: usize, max_depth: u32) -> Config {
    let mut config = Config::default();
    config.crawler.max_pages = max_pages;
    config.crawler.max_depth = max_depth;
    config.crawler.user_agent = "TestBot/1.0".to_string();
    config.crawler.politeness_ms = 0;
    config.crawler.fetch_retries = 1;
    config.crawler.supervisor_tick_ms = 20;
    config.crawler.empty_grace_ms = 200;
    config.crawler.shutdown_grace_ms = 5_000;
    config
}

/// An HTML page linking to each of `links`
fn html_page(title: &str, links: &[String]) -> ResponseTemplate {
    let anchors: String = links
        .iter()
        .map(|link| format!(r#"<a href="{}">{}</a>"#, link, link))
        .collect();

    ResponseTemplate::new(200)
        .set_body_string(format!(
            "<html><head><title>{}</title></head><body>{}</body></html>",
            title, anchors
        ))
        .insert_header("content-type", "text/html")
}

async fn mount_page(server: &MockServer, page: &str, links: &[&str]) {
    let links: Vec<String> = links.iter().map(|l| l.to_string()).collect();
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(html_page(page, &links))
        .mount(server)
        .await;
}

/// Paths requested from the server, robots.txt excluded
async fn page_requests(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| r.url.path().to_string())
        .filter(|p| p != "/robots.txt")
        .collect()
}

fn assert_no_duplicates(requests: &[String]) {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for request in requests {
        *counts.entry(request).or_default() += 1;
    }
    for (path, count) in counts {
        assert_eq!(count, 1, "{} was fetched {} times", path, count);
    }
}

#[tokio::test]
async fn test_budget_bounds_wide_page() {
    let server = MockServer::start().await;
    let uri = server.uri();

    let links: Vec<String> = (0..10).map(|i| format!("/p{}", i)).collect();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Home", &links))
        .expect(1)
        .mount(&server)
        .await;

    // Depth-1 pages link one level further down
    Mock::given(method("GET"))
        .and(path_regex(r"^/p\d$"))
        .respond_with(html_page("Child", &["/deeper".to_string()]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/deeper"))
        .respond_with(html_page("Grandchild", &[]))
        .expect(0)
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryStorage::new());
    let engine = CrawlEngine::new(create_test_config(5, 1), storage.clone()).unwrap();
    let summary = engine.run(&[uri.clone()]).await;

    assert_eq!(summary.stop_reason, StopReason::BudgetReached);
    assert_eq!(summary.pages_crawled, 5);
    assert_eq!(storage.len(), 5);
    assert!(storage.get(&format!("{}/", uri)).is_some());

    let requests = page_requests(&server).await;
    assert_eq!(requests.len(), 5);
    assert_eq!(requests.iter().filter(|p| p.as_str() == "/").count(), 1);
    assert_no_duplicates(&requests);
}

#[tokio::test]
async fn test_robots_disallow_is_enforced() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("User-agent: *\nDisallow: /private\n\nUser-agent: other\nDisallow: /public\n"),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/", &["/private/x", "/public"]).await;
    mount_page(&server, "/public", &[]).await;
    Mock::given(method("GET"))
        .and(path("/private/x"))
        .respond_with(html_page("Secret", &[]))
        .expect(0)
        .mount(&server)
        .await;

    let engine = CrawlEngine::new(create_test_config(50, 2), Arc::new(MemoryStorage::new())).unwrap();
    let summary = engine.run(&[format!("{}/", server.uri())]).await;

    assert_eq!(summary.stop_reason, StopReason::FrontierExhausted);
    assert_eq!(summary.pages_crawled, 2);
    assert_eq!(summary.metrics.skipped, 1);
}

#[tokio::test]
async fn test_no_page_is_fetched_twice() {
    let server = MockServer::start().await;

    // Every page links to every other, including itself
    let all = ["/", "/a", "/b", "/c", "/a#top", "./b"];
    for page in ["/", "/a", "/b", "/c"] {
        mount_page(&server, page, &all).await;
    }

    let mut config = create_test_config(100, 5);
    config.crawler.workers = 8;

    let engine = CrawlEngine::new(config, Arc::new(MemoryStorage::new())).unwrap();
    let summary = engine.run(&[server.uri(), format!("{}/", server.uri())]).await;

    assert_eq!(summary.stop_reason, StopReason::FrontierExhausted);

    let requests = page_requests(&server).await;
    assert_no_duplicates(&requests);
    for page in ["/", "/a", "/b", "/c"] {
        assert!(requests.iter().any(|p| p == page), "{} was never fetched", page);
    }
}

#[tokio::test]
async fn test_depth_bound_is_respected() {
    let server = MockServer::start().await;

    mount_page(&server, "/", &["/d1"]).await;
    mount_page(&server, "/d1", &["/d2"]).await;
    mount_page(&server, "/d2", &["/d3"]).await;
    Mock::given(method("GET"))
        .and(path("/d3"))
        .respond_with(html_page("Too deep", &[]))
        .expect(0)
        .mount(&server)
        .await;

    let engine = CrawlEngine::new(create_test_config(100, 2), Arc::new(MemoryStorage::new())).unwrap();
    let summary = engine.run(&[server.uri()]).await;

    assert_eq!(summary.pages_crawled, 3);
    assert_eq!(summary.stop_reason, StopReason::FrontierExhausted);
}

#[tokio::test]
async fn test_allow_list_keeps_crawl_on_listed_hosts() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        &["/local", "https://elsewhere.invalid/page"],
    )
    .await;
    mount_page(&server, "/local", &[]).await;

    let mut config = create_test_config(100, 2);
    config.allowed_hosts.insert("127.0.0.1".to_string());

    let engine = CrawlEngine::new(config, Arc::new(MemoryStorage::new())).unwrap();
    let summary = engine.run(&[server.uri()]).await;

    assert_eq!(summary.pages_crawled, 2);
    assert_eq!(summary.metrics.failed, 0);
}

/// Records when each request arrived
struct ArrivalRecorder {
    arrivals: Arc<Mutex<Vec<Instant>>>,
}

impl Respond for ArrivalRecorder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.arrivals.lock().unwrap().push(Instant::now());
        html_page("Leaf", &[])
    }
}

#[tokio::test]
async fn test_same_host_fetches_are_spaced() {
    let server = MockServer::start().await;
    let arrivals = Arc::new(Mutex::new(Vec::new()));

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Home", &["/1".into(), "/2".into(), "/3".into()]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/\d$"))
        .respond_with(ArrivalRecorder {
            arrivals: arrivals.clone(),
        })
        .mount(&server)
        .await;

    let mut config = create_test_config(100, 1);
    config.crawler.politeness_ms = 200;
    config.crawler.workers = 4;

    let engine = CrawlEngine::new(config, Arc::new(MemoryStorage::new())).unwrap();
    let summary = engine.run(&[server.uri()]).await;
    assert_eq!(summary.pages_crawled, 4);

    let mut arrivals = arrivals.lock().unwrap().clone();
    arrivals.sort();
    assert_eq!(arrivals.len(), 3);
    for pair in arrivals.windows(2) {
        assert!(
            pair[1] - pair[0] >= Duration::from_millis(150),
            "fetches only {:?} apart",
            pair[1] - pair[0]
        );
    }
}

#[tokio::test]
async fn test_failures_do_not_stop_the_crawl() {
    let server = MockServer::start().await;
    mount_page(&server, "/", &["/broken", "/image.png", "/ok"]).await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/image.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0u8; 16])
                .insert_header("content-type", "image/png"),
        )
        .mount(&server)
        .await;
    mount_page(&server, "/ok", &[]).await;

    let engine = CrawlEngine::new(create_test_config(100, 2), Arc::new(MemoryStorage::new())).unwrap();
    let summary = engine.run(&[server.uri()]).await;

    assert_eq!(summary.stop_reason, StopReason::FrontierExhausted);
    assert_eq!(summary.pages_crawled, 2);
    assert_eq!(summary.metrics.failed, 1);
    assert_eq!(summary.metrics.skipped, 1);
    assert_eq!(summary.metrics.top_failing_hosts[0].1, 1);
}

#[tokio::test]
async fn test_file_storage_writes_pages() {
    let server = MockServer::start().await;
    mount_page(&server, "/", &["/next"]).await;
    mount_page(&server, "/next", &[]).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(100, 2);
    config.crawler.storage_dir = dir.path().join("pages");

    let storage = open_storage(&config.crawler).unwrap();
    let engine = CrawlEngine::new(config.clone(), storage).unwrap();
    let summary = engine.run(&[server.uri()]).await;
    assert_eq!(summary.pages_crawled, 2);

    let root = format!("{}/", server.uri());
    let hash = content_address(&root);
    let body = std::fs::read_to_string(config.crawler.storage_dir.join(format!("{}.html", hash))).unwrap();
    assert!(body.contains("/next"));

    let metadata: PageMetadata = serde_json::from_slice(
        &std::fs::read(config.crawler.storage_dir.join(format!("{}.json", hash))).unwrap(),
    )
    .unwrap();
    assert_eq!(metadata.url, root);
    assert_eq!(metadata.title, "/");
    assert_eq!(metadata.links, vec![format!("{}/next", server.uri())]);
}

#[tokio::test]
async fn test_storage_failure_is_not_fatal() {
    let server = MockServer::start().await;
    mount_page(&server, "/", &["/next"]).await;
    mount_page(&server, "/next", &[]).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(100, 2);
    config.crawler.storage_dir = dir.path().join("pages");

    let storage = open_storage(&config.crawler).unwrap();
    std::fs::remove_dir_all(&config.crawler.storage_dir).unwrap();

    let engine = CrawlEngine::new(config, storage).unwrap();
    let summary = engine.run(&[server.uri()]).await;

    assert_eq!(summary.pages_crawled, 2);
    assert_eq!(summary.metrics.failed, 0);
}

#[tokio::test]
async fn test_sqlite_storage_backend() {
    let server = MockServer::start().await;
    mount_page(&server, "/", &[]).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(100, 2);
    config.crawler.storage_dir = dir.path().to_path_buf();
    config.crawler.storage_backend = StorageBackend::Sqlite;

    let storage = open_storage(&config.crawler).unwrap();
    let engine = CrawlEngine::new(config, storage).unwrap();
    let summary = engine.run(&[server.uri()]).await;

    assert_eq!(summary.pages_crawled, 1);
    assert!(dir.path().join("pages.db").exists());
}

#[tokio::test]
async fn test_durable_frontier_resumes_pending_work() {
    let server = MockServer::start().await;
    mount_page(&server, "/", &["/a", "/b"]).await;
    mount_page(&server, "/a", &[]).await;
    mount_page(&server, "/b", &[]).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(1, 2);
    config.crawler.frontier_db = Some(dir.path().join("frontier.db"));

    let first = CrawlEngine::new(config.clone(), Arc::new(MemoryStorage::new())).unwrap();
    let summary = first.run(&[server.uri()]).await;
    assert_eq!(summary.stop_reason, StopReason::BudgetReached);
    assert_eq!(summary.pending, 2);

    config.crawler.max_pages = 10;
    let storage = Arc::new(MemoryStorage::new());
    let second = CrawlEngine::new(config, storage.clone()).unwrap();
    let summary = second.run(&[]).await;

    assert_eq!(summary.stop_reason, StopReason::FrontierExhausted);
    assert_eq!(summary.pages_crawled, 2);
    assert!(storage.get(&format!("{}/a", server.uri())).is_some());
    assert!(storage.get(&format!("{}/b", server.uri())).is_some());
}

#[tokio::test]
async fn test_injected_frontier_is_used() {
    let server = MockServer::start().await;
    mount_page(&server, "/queued", &[]).await;

    let frontier = Frontier::in_memory();
    frontier
        .add(&format!("{}/queued", server.uri()), 0)
        .unwrap();

    let engine = CrawlEngine::new(create_test_config(10, 1), Arc::new(MemoryStorage::new()))
        .unwrap()
        .with_frontier(frontier);
    let summary = engine.run(&[]).await;

    assert_eq!(summary.pages_crawled, 1);
    assert_eq!(page_requests(&server).await, vec!["/queued".to_string()]);
}
