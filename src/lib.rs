//! Page-Sweep: a bounded-concurrency paginated crawler
//!
//! This crate fetches page 1 of a paginated listing, discovers how many pages
//! exist from its content, then fetches the remaining pages concurrently while
//! streaming the extracted items to a consumer.

pub mod config;
pub mod crawler;
pub mod proxy;
pub mod storage;

use thiserror::Error;

/// Main error type for Page-Sweep operations
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Crawl error: {0}")]
    Crawl(#[from] CrawlError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),
}

/// Terminal outcome of a failed crawl
///
/// Only the first failure observed by a run is ever reported; failures of
/// other pages that happen concurrently are discarded.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Invalid URL for page {page} ({url}): {reason}")]
    InvalidPageUrl {
        page: u64,
        url: String,
        reason: String,
    },

    #[error("Failed to fetch page {page}: {source}")]
    Fetch {
        page: u64,
        #[source]
        source: proxy::FetchError,
    },

    #[error("Failed to parse page {page}: {source}")]
    Parse {
        page: u64,
        #[source]
        source: crawler::ParseError,
    },

    #[error("Crawl cancelled")]
    Cancelled,

    #[error("Item stream closed by consumer while emitting page {page}")]
    ItemStreamClosed { page: u64 },

    #[error("Crawl task failed: {0}")]
    TaskFailed(String),
}

impl CrawlError {
    /// Returns true if this outcome was caused by cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result type alias for Page-Sweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{
    crawl_from_config, crawl_pages, page_source, CrawlOptions, CrawlStats, LastPage, PageCrawl,
    PageSource,
};
pub use proxy::{DirectProxy, EscrowProxy, FetchError, Proxy};
