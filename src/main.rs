//! Page-Sweep main entry point
//!
//! This is the command-line interface for the Page-Sweep paginated crawler.

use anyhow::Context;
use clap::Parser;
use page_sweep::config::{load_config_with_hash, Config, ProxyConfig};
use page_sweep::crawler::{crawl_from_config, HtmlExtractor, PageSource};
use page_sweep::storage::{record_crawl, RunStatus, SqliteStorage, Storage};
use page_sweep::SweepError;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Page-Sweep: a bounded-concurrency paginated crawler
///
/// Fetches page 1 of a listing, reads the page count from it, then fetches
/// every remaining page concurrently and prints the extracted items.
#[derive(Parser, Debug)]
#[command(name = "page-sweep")]
#[command(version = "1.0.0")]
#[command(about = "A bounded-concurrency paginated crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else {
        handle_crawl(config, &config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr so stdout carries only extracted items.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("page_sweep=info,warn"),
            1 => EnvFilter::new("page_sweep=debug,info"),
            2 => EnvFilter::new("page_sweep=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let extractor = HtmlExtractor::new(&config.crawler.page_url, &config.extract)?;

    println!("=== Page-Sweep Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  First page: {}", extractor.page_url(1));
    println!("  Max concurrent pages: {}", config.crawler.max_concurrent_pages);
    println!("  Last page policy: {:?}", config.crawler.last_page);
    println!("  Item buffer: {}", config.crawler.item_buffer);

    println!("\nExtraction:");
    println!("  Item selector: {}", config.extract.item_selector);
    if let Some(attribute) = &config.extract.item_attribute {
        println!("  Item attribute: {}", attribute);
    }
    println!("  Page count selector: {}", config.extract.total_pages_selector);

    println!("\nProxy:");
    match &config.proxy {
        ProxyConfig::Direct => {
            println!("  Direct");
            match &config.client.user_agent {
                Some(ua) => println!("  User agent: {}", ua),
                None => println!("  User agent: random browser"),
            }
        }
        ProxyConfig::Escrow(escrow) => {
            println!("  Escrow: {}", escrow.endpoint);
            println!("  Attempts: {}", escrow.attempts);
            println!("  Attempt timeout: {}ms", escrow.attempt_timeout_ms);
            println!("  Retry pause: {}ms", escrow.retry_pause_ms);
        }
    }

    println!("\nOutput:");
    match &config.output.database_path {
        Some(path) => println!("  Database: {}", path),
        None => println!("  stdout only"),
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: &str) -> anyhow::Result<()> {
    let mut storage = match &config.output.database_path {
        Some(path) => {
            let storage = SqliteStorage::new(Path::new(path))
                .with_context(|| format!("Failed to open database {}", path))?;
            Some(storage)
        }
        None => None,
    };
    let run_id = match storage.as_mut() {
        Some(storage) => Some(storage.create_run(config_hash)?),
        None => None,
    };

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after in-flight pages");
            ctrl_c.cancel();
        }
    });

    tracing::info!("Starting crawl of {}", config.crawler.page_url);
    let crawl = match crawl_from_config(&config, cancel.clone()) {
        Ok(crawl) => crawl,
        Err(e) => {
            if let (Some(storage), Some(run_id)) = (storage.as_mut(), run_id) {
                storage.finish_run(run_id, RunStatus::Failed, None, Some(&e.to_string()))?;
            }
            return Err(e.into());
        }
    };

    let outcome = match (storage.as_mut(), run_id) {
        (Some(storage), Some(run_id)) => {
            let outcome =
                record_crawl(storage, run_id, crawl, &cancel, |item| println!("{}", item)).await;
            if let Ok(count) = storage.count_items(run_id) {
                tracing::info!("Run {} stored with {} items", run_id, count);
            }
            outcome
        }
        _ => {
            let mut crawl = crawl;
            while let Some(item) = crawl.next_item().await {
                println!("{}", item);
            }
            crawl.finish().await.map_err(SweepError::from)
        }
    };

    match outcome {
        Ok(stats) => {
            tracing::info!(
                "Crawl completed: {} of {} pages, {} items in {:?}",
                stats.pages_crawled,
                stats.total_pages,
                stats.items_emitted,
                stats.elapsed
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
