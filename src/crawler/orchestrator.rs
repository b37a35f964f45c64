//! Pagination orchestrator
//!
//! Crawls a paginated resource in four strictly ordered phases:
//!
//! 1. **Bootstrap** - page 1 is fetched on its own, before anything else
//! 2. **Count discovery** - the page count is read off page 1's body
//! 3. **Fan-out** - pages 2..=last are handed to workers, at most
//!    `max_concurrent_pages` at a time
//! 4. **Drain & close** - every launched worker is joined, then the item
//!    stream is closed
//!
//! Any page failing fails the whole run. Only the first failure is reported.

use crate::crawler::page::{build_request, crawl_page};
use crate::crawler::PageSource;
use crate::proxy::Proxy;
use crate::CrawlError;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

/// How the discovered page count maps to the last page index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LastPage {
    /// The page count is the number of the last page
    #[default]
    Inclusive,

    /// The page count is one past the last page
    Exclusive,
}

impl LastPage {
    /// Returns the index of the last page to crawl for a discovered count
    pub fn resolve(self, total_pages: u64) -> u64 {
        match self {
            Self::Inclusive => total_pages,
            Self::Exclusive => total_pages.saturating_sub(1),
        }
    }
}

/// Tuning knobs for a paginated crawl
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Maximum number of pages after the first fetched at once
    pub max_concurrent_pages: usize,

    /// Boundary policy for the discovered page count
    pub last_page: LastPage,

    /// Items buffered ahead of the consumer before workers block
    pub item_buffer: usize,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            max_concurrent_pages: 4,
            last_page: LastPage::Inclusive,
            item_buffer: 16,
        }
    }
}

impl From<&crate::config::CrawlerConfig> for CrawlOptions {
    fn from(config: &crate::config::CrawlerConfig) -> Self {
        Self {
            max_concurrent_pages: config.max_concurrent_pages as usize,
            last_page: config.last_page,
            item_buffer: config.item_buffer as usize,
        }
    }
}

/// Statistics for a crawl that finished successfully
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Page count reported by page 1
    pub total_pages: u64,

    /// Pages fetched, parsed and fully emitted
    pub pages_crawled: u64,

    /// Items sent into the item stream
    pub items_emitted: u64,

    /// Wall time from the first fetch to the stream closing
    pub elapsed: Duration,
}

/// Handle to a running crawl
///
/// Items arrive through [`next_item`](Self::next_item) until the stream
/// closes. Closing only says the run is over; the outcome returned by
/// [`finish`](Self::finish) tells whether it succeeded.
#[derive(Debug)]
pub struct PageCrawl<T> {
    items: mpsc::Receiver<T>,
    total_pages: watch::Receiver<Option<u64>>,
    outcome: JoinHandle<Result<CrawlStats, CrawlError>>,
}

impl<T> PageCrawl<T> {
    /// Page count read off page 1, once it is known
    ///
    /// Stays available when a later page fails the run.
    pub fn total_pages(&self) -> Option<u64> {
        *self.total_pages.borrow()
    }

    /// Receives the next item, or `None` once the stream is closed
    pub async fn next_item(&mut self) -> Option<T> {
        self.items.recv().await
    }

    /// Discards any remaining items and waits for the outcome
    pub async fn finish(mut self) -> Result<CrawlStats, CrawlError> {
        while self.items.recv().await.is_some() {}
        join_outcome(self.outcome).await
    }

    /// Collects every item, then waits for the outcome
    pub async fn collect(mut self) -> (Vec<T>, Result<CrawlStats, CrawlError>) {
        let mut collected = Vec::new();
        while let Some(item) = self.items.recv().await {
            collected.push(item);
        }
        (collected, join_outcome(self.outcome).await)
    }

    /// Splits the handle into the raw item receiver and the outcome task
    pub fn into_parts(
        self,
    ) -> (
        mpsc::Receiver<T>,
        JoinHandle<Result<CrawlStats, CrawlError>>,
    ) {
        (self.items, self.outcome)
    }
}

async fn join_outcome(
    outcome: JoinHandle<Result<CrawlStats, CrawlError>>,
) -> Result<CrawlStats, CrawlError> {
    match outcome.await {
        Ok(result) => result,
        Err(e) => Err(CrawlError::TaskFailed(e.to_string())),
    }
}

/// Starts crawling every page of a paginated resource
///
/// Must be called from within a tokio runtime. The crawl runs on its own
/// task; the returned handle streams items as they are extracted. Page 1's
/// items always come first; items of later pages may interleave.
///
/// # Arguments
///
/// * `source` - Page URLs, parser and page count reader
/// * `proxy` - Fetch capability shared by all workers
/// * `options` - Concurrency, boundary policy and buffering
/// * `cancel` - Stops the crawl; already running pages are still joined
///
/// # Example
///
/// ```no_run
/// use page_sweep::crawler::{crawl_pages, page_source, CrawlOptions};
/// use page_sweep::proxy::{DirectProxy, Proxy};
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn run() {
/// let source = page_source(
///     |page| format!("https://example.com/list?page={}", page),
///     |body: &str| Ok(body.lines().map(str::to_string).collect::<Vec<_>>()),
///     |_first: &str| 10,
/// );
/// let proxy: Arc<dyn Proxy> = Arc::new(DirectProxy::new(reqwest::Client::new(), None));
///
/// let mut crawl = crawl_pages(Arc::new(source), proxy, CrawlOptions::default(), CancellationToken::new());
/// while let Some(line) = crawl.next_item().await {
///     println!("{}", line);
/// }
/// let stats = crawl.finish().await.unwrap();
/// println!("{} pages", stats.pages_crawled);
/// # }
/// ```
pub fn crawl_pages<S: PageSource>(
    source: Arc<S>,
    proxy: Arc<dyn Proxy>,
    options: CrawlOptions,
    cancel: CancellationToken,
) -> PageCrawl<S::Item> {
    let (items_tx, items_rx) = mpsc::channel(options.item_buffer.max(1));
    let (total_tx, total_rx) = watch::channel(None);
    let outcome = tokio::spawn(run(source, proxy, options, cancel, items_tx, total_tx));

    PageCrawl {
        items: items_rx,
        total_pages: total_rx,
        outcome,
    }
}

/// Drives the four phases; the item stream closes when this returns
async fn run<S: PageSource>(
    source: Arc<S>,
    proxy: Arc<dyn Proxy>,
    options: CrawlOptions,
    cancel: CancellationToken,
    items: mpsc::Sender<S::Item>,
    total_tx: watch::Sender<Option<u64>>,
) -> Result<CrawlStats, CrawlError> {
    let start_time = Instant::now();

    // Phase 1: page 1 alone
    let request = build_request(1, &source.page_url(1))?;
    let first = match crawl_page(proxy.as_ref(), 1, request, source.as_ref(), &items, &cancel).await
    {
        Ok(first) => first,
        Err(e) => {
            tracing::warn!("Page 1 failed, no further pages will be crawled: {}", e);
            return Err(e);
        }
    };

    // Phase 2: count discovery
    let total_pages = source.total_pages(&first.body);
    let last_page = options.last_page.resolve(total_pages);
    // Nobody listening is fine
    let _ = total_tx.send(Some(total_pages));
    tracing::info!(
        "Page 1 reports {} pages, crawling up to page {} with {} workers",
        total_pages,
        last_page,
        options.max_concurrent_pages
    );

    let mut stats = CrawlStats {
        total_pages,
        pages_crawled: 1,
        items_emitted: first.items as u64,
        elapsed: Duration::ZERO,
    };

    // Phase 3: fan-out
    let budget = options.max_concurrent_pages.clamp(1, Semaphore::MAX_PERMITS);
    let semaphore = Arc::new(Semaphore::new(budget));
    // Single slot: the first reported error is kept, later ones are dropped
    let (error_tx, mut error_rx) = mpsc::channel::<CrawlError>(1);
    let mut workers = JoinSet::new();
    let mut outcome: Option<CrawlError> = None;

    for page in 2..=last_page {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("Crawl cancelled before page {} was scheduled", page);
                outcome = Some(CrawlError::Cancelled);
                break;
            }
            Some(error) = error_rx.recv() => {
                tracing::debug!("Worker failure stops scheduling at page {}", page);
                outcome = Some(error);
                break;
            }
            acquired = Arc::clone(&semaphore).acquire_owned() => match acquired {
                Ok(permit) => permit,
                // The semaphore is never closed
                Err(_) => break,
            },
        };

        let source = Arc::clone(&source);
        let proxy = Arc::clone(&proxy);
        let items = items.clone();
        let cancel = cancel.clone();
        let errors = error_tx.clone();

        workers.spawn(async move {
            // Released on every exit path, including panics
            let _permit = permit;

            let crawled = match build_request(page, &source.page_url(page)) {
                Ok(request) => {
                    crawl_page(proxy.as_ref(), page, request, source.as_ref(), &items, &cancel)
                        .await
                }
                Err(e) => Err(e),
            };

            match crawled {
                Ok(crawled) => Some(crawled.items as u64),
                Err(e) => {
                    tracing::debug!("Page {} failed: {}", page, e);
                    // Never blocks: if the slot is taken this error is discarded
                    let _ = errors.try_send(e);
                    None
                }
            }
        });
    }

    // Phase 4: drain every launched worker before the stream can close
    let mut panicked = None;
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(Some(emitted)) => {
                stats.pages_crawled += 1;
                stats.items_emitted += emitted;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!("A page worker failed: {}", e);
                panicked.get_or_insert(CrawlError::TaskFailed(e.to_string()));
            }
        }
    }

    drop(items);

    let outcome = outcome.or_else(|| error_rx.try_recv().ok()).or(panicked);
    stats.elapsed = start_time.elapsed();

    match outcome {
        Some(e) => {
            tracing::warn!(
                "Crawl stopped after {} pages ({} items): {}",
                stats.pages_crawled,
                stats.items_emitted,
                e
            );
            Err(e)
        }
        None => {
            tracing::info!(
                "Crawl completed: {} pages, {} items in {:?}",
                stats.pages_crawled,
                stats.items_emitted,
                stats.elapsed
            );
            Ok(stats)
        }
    }
}
