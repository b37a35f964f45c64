//! Crawler module for paginated resources
//!
//! This module contains the core crawling logic, including:
//! - The page source contract (URLs, parsing, page count)
//! - The single-page crawl shared by the first page and every worker
//! - The pagination orchestrator with bounded fan-out
//! - A CSS-selector based extractor for HTML listings

mod extract;
mod orchestrator;
mod page;
mod source;

pub use extract::HtmlExtractor;
pub use orchestrator::{crawl_pages, CrawlOptions, CrawlStats, LastPage, PageCrawl};
pub use page::{build_request, crawl_page, CrawledPage};
pub use source::{page_source, FnSource, PageSource, ParseError};

use crate::config::Config;
use crate::proxy::build_proxy;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Starts a crawl of the HTML listing described by the configuration
///
/// This is the main entry point for configuration-driven crawls. It will:
/// 1. Compile the extraction selectors
/// 2. Build the HTTP client and the configured proxy
/// 3. Start the orchestrator
///
/// Must be called from within a tokio runtime.
///
/// # Returns
///
/// * `Ok(PageCrawl<String>)` - The running crawl
/// * `Err(SweepError)` - The extractor or the HTTP client could not be built
pub fn crawl_from_config(
    config: &Config,
    cancel: CancellationToken,
) -> crate::Result<PageCrawl<String>> {
    let extractor = HtmlExtractor::new(&config.crawler.page_url, &config.extract)?;
    let proxy = build_proxy(config)?;

    Ok(crawl_pages(
        Arc::new(extractor),
        proxy,
        CrawlOptions::from(&config.crawler),
        cancel,
    ))
}
