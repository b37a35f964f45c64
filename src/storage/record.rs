//! Persisting a running crawl
//!
//! Ties a crawl's item stream to a run record so that the run always ends in
//! a terminal state, whether the crawl or the storage fails.

use crate::crawler::{CrawlStats, PageCrawl};
use crate::storage::{RunStatus, Storage};
use crate::SweepError;
use tokio_util::sync::CancellationToken;

/// Stores every item of `crawl` under `run_id` and closes the run
///
/// `on_item` sees each item before it is stored. If an item cannot be
/// stored, the crawl is cancelled and drained, and the run is closed as
/// failed before the storage error is returned.
///
/// # Returns
///
/// * `Ok(CrawlStats)` - The crawl succeeded and every item was stored
/// * `Err(SweepError::Crawl)` - The crawl failed; the run records why
/// * `Err(SweepError::Storage)` - An item or the run record could not be written
pub async fn record_crawl<S: Storage + ?Sized>(
    storage: &mut S,
    run_id: i64,
    mut crawl: PageCrawl<String>,
    cancel: &CancellationToken,
    mut on_item: impl FnMut(&str),
) -> crate::Result<CrawlStats> {
    let mut store_error = None;

    while let Some(item) = crawl.next_item().await {
        on_item(&item);
        if let Err(e) = storage.insert_item(run_id, &item) {
            tracing::error!("Failed to store item, stopping crawl: {}", e);
            cancel.cancel();
            store_error = Some(e);
            break;
        }
    }

    // Join in-flight pages before the run is closed
    while crawl.next_item().await.is_some() {}
    let pages_total = crawl.total_pages();
    let outcome = crawl.finish().await;

    if let Some(e) = store_error {
        let message = format!("Failed to store item: {}", e);
        if let Err(close) =
            storage.finish_run(run_id, RunStatus::Failed, pages_total, Some(&message))
        {
            tracing::warn!("Run {} could not be closed: {}", run_id, close);
        }
        return Err(e.into());
    }

    let error_message = outcome.as_ref().err().map(|e| e.to_string());
    storage.finish_run(
        run_id,
        RunStatus::from_outcome(&outcome),
        pages_total,
        error_message.as_deref(),
    )?;

    Ok(outcome?)
}
