//! Configuration module for Page-Sweep
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use page_sweep::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sweep.toml")).unwrap();
//! println!("Pages will be fetched from: {}", config.crawler.page_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ClientConfig, Config, CrawlerConfig, EscrowConfig, ExtractConfig, OutputConfig, ProxyConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

/// Placeholder replaced by the page number in `crawler.page-url`
pub const PAGE_PLACEHOLDER: &str = "{page}";
