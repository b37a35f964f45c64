//! Integration tests for the paginated crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use page_sweep::config::{parse_config, Config};
use page_sweep::crawler::crawl_from_config;
use page_sweep::proxy::FetchError;
use page_sweep::storage::{record_crawl, RunStatus, SqliteStorage, Storage};
use page_sweep::CrawlError;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Renders a listing page with the given products and page count
fn listing(products: &[&str], total_pages: u64) -> String {
    let items: String = products
        .iter()
        .map(|p| format!(r#"<li class="product"><a href="/p/{0}">{0}</a></li>"#, p))
        .collect();
    let pagination: String = (1..=total_pages)
        .map(|n| format!("<li>{}</li>", n))
        .collect();

    format!(
        r#"<html><body><ul class="results">{}</ul><ul class="pagination"><li>Prev</li>{}<li>Next</li></ul></body></html>"#,
        items, pagination
    )
}

/// Creates a test configuration for the given page URL template
fn create_test_config(page_url: &str, extra: &str) -> Config {
    let content = format!(
        r#"
[crawler]
page-url = "{}"
max-concurrent-pages = 2
item-buffer = 2

[extract]
item-selector = "li.product a"
total-pages-selector = "ul.pagination li"

[client]
user-agent = "PageSweepTest/1.0"
timeout-secs = 5

{}
"#,
        page_url, extra
    );
    parse_config(&content).expect("Failed to parse test config")
}

async fn mount_listing(server: &MockServer, page: u64, products: &[&str], total_pages: u64) {
    Mock::given(method("GET"))
        .and(path("/list"))
        .and(query_param("page", page.to_string()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing(products, total_pages))
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_direct() {
    let mock_server = MockServer::start().await;

    mount_listing(&mock_server, 1, &["tea", "coffee"], 3).await;
    mount_listing(&mock_server, 2, &["cocoa"], 3).await;
    mount_listing(&mock_server, 3, &["mate", "chai"], 3).await;

    let config = create_test_config(
        &format!("{}/list?page={{page}}", mock_server.uri()),
        "",
    );

    let crawl = crawl_from_config(&config, CancellationToken::new()).expect("Failed to start");
    let (items, outcome) = crawl.collect().await;

    let stats = outcome.expect("Crawl failed");
    assert_eq!(stats.total_pages, 3);
    assert_eq!(stats.pages_crawled, 3);
    assert_eq!(stats.items_emitted, 5);

    // Page 1 items come first, in page order
    assert_eq!(&items[..2], &["tea".to_string(), "coffee".to_string()]);
    let all: HashSet<&str> = items.iter().map(String::as_str).collect();
    assert_eq!(all, HashSet::from(["tea", "coffee", "cocoa", "mate", "chai"]));
}

#[tokio::test]
async fn test_failing_page_fails_the_run() {
    let mock_server = MockServer::start().await;

    mount_listing(&mock_server, 1, &["tea"], 4).await;
    mount_listing(&mock_server, 3, &["mate"], 4).await;
    mount_listing(&mock_server, 4, &["chai"], 4).await;

    Mock::given(method("GET"))
        .and(path("/list"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let config = create_test_config(
        &format!("{}/list?page={{page}}", mock_server.uri()),
        "",
    );

    let outcome = crawl_from_config(&config, CancellationToken::new())
        .expect("Failed to start")
        .finish()
        .await;

    match outcome {
        Err(CrawlError::Fetch {
            page,
            source: FetchError::Status { status, .. },
        }) => {
            assert_eq!(page, 2);
            assert_eq!(status, 500);
        }
        other => panic!("expected HTTP 500 on page 2, got {:?}", other),
    }
}

#[tokio::test]
async fn test_first_page_failure_stops_everything() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/list"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/list"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing(&["x"], 5)))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(
        &format!("{}/list?page={{page}}", mock_server.uri()),
        "",
    );

    let (items, outcome) = crawl_from_config(&config, CancellationToken::new())
        .expect("Failed to start")
        .collect()
        .await;

    assert!(items.is_empty());
    assert!(matches!(outcome, Err(CrawlError::Fetch { page: 1, .. })));
}

#[tokio::test]
async fn test_crawl_through_escrow_with_retries() {
    let target = MockServer::start().await;
    let escrow = MockServer::start().await;
    let page_url = format!("{}/list?page={{page}}", target.uri());

    // The escrow fails the first attempt for page 2
    Mock::given(method("GET"))
        .and(query_param("url", page_url.replace("{page}", "2")))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&escrow)
        .await;

    for (page, products) in [(1u64, vec!["tea"]), (2, vec!["cocoa"]), (3, vec!["mate"])] {
        Mock::given(method("GET"))
            .and(query_param("token", "secret"))
            .and(query_param("url", page_url.replace("{page}", &page.to_string())))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing(&products, 3)))
            .mount(&escrow)
            .await;
    }

    let config = create_test_config(
        &page_url,
        &format!(
            r#"
[proxy]
kind = "escrow"
token = "secret"
endpoint = "{}/"
attempts = 3
retry-pause-ms = 10
attempt-timeout-ms = 2000
"#,
            escrow.uri()
        ),
    );

    let (items, outcome) = crawl_from_config(&config, CancellationToken::new())
        .expect("Failed to start")
        .collect()
        .await;

    assert!(outcome.is_ok(), "crawl failed: {:?}", outcome);
    let all: HashSet<&str> = items.iter().map(String::as_str).collect();
    assert_eq!(all, HashSet::from(["tea", "cocoa", "mate"]));

    // The target itself is never contacted directly
    assert!(target.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_items_persisted_with_run_outcome() {
    let mock_server = MockServer::start().await;

    mount_listing(&mock_server, 1, &["tea", "coffee"], 2).await;
    mount_listing(&mock_server, 2, &["cocoa"], 2).await;

    let config = create_test_config(
        &format!("{}/list?page={{page}}", mock_server.uri()),
        "",
    );

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut storage =
        SqliteStorage::new(&dir.path().join("items.db")).expect("Failed to open DB");
    let run_id = storage.create_run("test-hash").expect("Failed to create run");

    let cancel = CancellationToken::new();
    let crawl = crawl_from_config(&config, cancel.clone()).expect("Failed to start");
    let stats = record_crawl(&mut storage, run_id, crawl, &cancel, |_| {})
        .await
        .expect("Crawl failed");
    assert_eq!(stats.items_emitted, 3);

    let run = storage.get_run(run_id).expect("Failed to load run");
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.pages_total, Some(2));
    assert_eq!(storage.count_items(run_id).unwrap(), 3);
}

#[tokio::test]
async fn test_cancelled_crawl_records_cancellation() {
    let mock_server = MockServer::start().await;
    mount_listing(&mock_server, 1, &["tea"], 2).await;

    let config = create_test_config(
        &format!("{}/list?page={{page}}", mock_server.uri()),
        "",
    );

    let cancel = CancellationToken::new();
    cancel.cancel();

    let (items, outcome) = crawl_from_config(&config, cancel)
        .expect("Failed to start")
        .collect()
        .await;

    assert!(items.is_empty());
    assert_eq!(RunStatus::from_outcome(&outcome), RunStatus::Cancelled);
    assert!(mock_server.received_requests().await.unwrap_or_default().is_empty());
}
