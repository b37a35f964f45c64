//! Single-page crawl
//!
//! Fetches one page, parses it, and pushes its items into the shared item
//! stream. Used by the orchestrator both for page 1 and for every worker.

use crate::crawler::PageSource;
use crate::proxy::{FetchError, Proxy};
use crate::CrawlError;
use reqwest::{Method, Request};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Result of a successfully crawled page
#[derive(Debug, Clone)]
pub struct CrawledPage {
    /// Raw page body as returned by the proxy
    pub body: String,

    /// Number of items emitted for this page
    pub items: usize,
}

/// Builds the GET request for a page URL
///
/// # Returns
///
/// * `Ok(Request)` - A request ready to hand to a proxy
/// * `Err(CrawlError::InvalidPageUrl)` - The URL is malformed or not http(s)
pub fn build_request(page: u64, url: &str) -> Result<Request, CrawlError> {
    let invalid = |reason: String| CrawlError::InvalidPageUrl {
        page,
        url: url.to_string(),
        reason,
    };

    let parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
    }

    Ok(Request::new(Method::GET, parsed))
}

/// Crawls a single page and emits its items
///
/// # Flow
///
/// 1. Bail out if the run is already cancelled
/// 2. Fetch the body through the proxy (raced against cancellation)
/// 3. Parse it into items
/// 4. Send the items one at a time; a slow consumer blocks this call, but
///    cancellation still interrupts it
///
/// No items are emitted when the fetch or the parse fails.
pub async fn crawl_page<S: PageSource>(
    proxy: &dyn Proxy,
    page: u64,
    request: Request,
    source: &S,
    items: &mpsc::Sender<S::Item>,
    cancel: &CancellationToken,
) -> Result<CrawledPage, CrawlError> {
    if cancel.is_cancelled() {
        return Err(CrawlError::Cancelled);
    }

    tracing::debug!("Fetching page {}: {}", page, request.url());

    let fetched = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(CrawlError::Cancelled),
        fetched = proxy.fetch(request, cancel) => fetched,
    };

    let body = match fetched {
        Ok(body) => body,
        Err(FetchError::Cancelled) => return Err(CrawlError::Cancelled),
        Err(source) => return Err(CrawlError::Fetch { page, source }),
    };

    let parsed = source
        .parse(&body)
        .map_err(|source| CrawlError::Parse { page, source })?;
    let count = parsed.len();

    for item in parsed {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CrawlError::Cancelled),
            sent = items.send(item) => {
                if sent.is_err() {
                    return Err(CrawlError::ItemStreamClosed { page });
                }
            }
        }
    }

    tracing::trace!("Page {} emitted {} items", page, count);

    Ok(CrawledPage { body, items: count })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{page_source, ParseError};
    use async_trait::async_trait;

    struct StaticProxy(Result<&'static str, &'static str>);

    #[async_trait]
    impl Proxy for StaticProxy {
        async fn fetch(
            &self,
            _request: Request,
            _cancel: &CancellationToken,
        ) -> Result<String, FetchError> {
            self.0
                .map(str::to_string)
                .map_err(|e| FetchError::Upstream(e.to_string()))
        }
    }

    fn words() -> impl PageSource<Item = String> {
        page_source(
            |page| format!("https://example.com/?p={}", page),
            |body: &str| Ok(body.split_whitespace().map(str::to_string).collect::<Vec<String>>()),
            |_body: &str| 1,
        )
    }

    #[test]
    fn test_build_request() {
        let request = build_request(3, "https://example.com/?p=3").unwrap();
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.url().as_str(), "https://example.com/?p=3");
    }

    #[test]
    fn test_build_request_rejects_bad_urls() {
        assert!(matches!(
            build_request(1, "not a url"),
            Err(CrawlError::InvalidPageUrl { page: 1, .. })
        ));
        assert!(matches!(
            build_request(2, "mailto:someone@example.com"),
            Err(CrawlError::InvalidPageUrl { page: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_crawl_page_emits_items_in_order() {
        let (tx, mut rx) = mpsc::channel(8);
        let proxy = StaticProxy(Ok("alpha beta gamma"));
        let request = build_request(1, "https://example.com/?p=1").unwrap();

        let crawled = crawl_page(&proxy, 1, request, &words(), &tx, &CancellationToken::new())
            .await
            .unwrap();
        drop(tx);

        assert_eq!(crawled.body, "alpha beta gamma");
        assert_eq!(crawled.items, 3);

        let mut received = Vec::new();
        while let Some(item) = rx.recv().await {
            received.push(item);
        }
        assert_eq!(received, vec!["alpha", "beta", "gamma"]);
    }

    #[tokio::test]
    async fn test_crawl_page_fetch_failure_emits_nothing() {
        let (tx, mut rx) = mpsc::channel(8);
        let proxy = StaticProxy(Err("boom"));
        let request = build_request(4, "https://example.com/?p=4").unwrap();

        let result = crawl_page(&proxy, 4, request, &words(), &tx, &CancellationToken::new()).await;
        drop(tx);

        match result {
            Err(CrawlError::Fetch { page, source }) => {
                assert_eq!(page, 4);
                assert_eq!(source.to_string(), "boom");
            }
            other => panic!("expected fetch error, got {:?}", other),
        }
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_crawl_page_parse_failure() {
        let (tx, mut rx) = mpsc::channel::<String>(8);
        let proxy = StaticProxy(Ok("garbage"));
        let source = page_source(
            |page| format!("https://example.com/?p={}", page),
            |_body: &str| -> Result<Vec<String>, ParseError> {
                Err(ParseError::new("no listing found"))
            },
            |_body: &str| 1,
        );
        let request = build_request(2, "https://example.com/?p=2").unwrap();

        let result = crawl_page(&proxy, 2, request, &source, &tx, &CancellationToken::new()).await;
        drop(tx);

        assert!(matches!(result, Err(CrawlError::Parse { page: 2, .. })));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_crawl_page_skips_fetch_when_cancelled() {
        let (tx, _rx) = mpsc::channel(8);
        let proxy = StaticProxy(Ok("alpha"));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let request = build_request(1, "https://example.com/?p=1").unwrap();

        let result = crawl_page(&proxy, 1, request, &words(), &tx, &cancel).await;
        assert!(matches!(result, Err(CrawlError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_blocked_emission() {
        // Capacity 1 and nobody reading: the second send blocks
        let (tx, _rx) = mpsc::channel(1);
        let proxy = StaticProxy(Ok("one two three"));
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            canceller.cancel();
        });
        let request = build_request(1, "https://example.com/?p=1").unwrap();

        let result = crawl_page(&proxy, 1, request, &words(), &tx, &cancel).await;
        assert!(matches!(result, Err(CrawlError::Cancelled)));
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_reported() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let proxy = StaticProxy(Ok("one"));
        let request = build_request(5, "https://example.com/?p=5").unwrap();

        let result = crawl_page(&proxy, 5, request, &words(), &tx, &CancellationToken::new()).await;
        assert!(matches!(result, Err(CrawlError::ItemStreamClosed { page: 5 })));
    }
}
