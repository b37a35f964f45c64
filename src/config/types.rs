use crate::crawler::LastPage;
use serde::Deserialize;

/// Main configuration structure for Page-Sweep
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub extract: ExtractConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Pagination behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// URL template for a page; `{page}` is replaced by the page number
    #[serde(rename = "page-url")]
    pub page_url: String,

    /// Maximum number of pages (after the first) fetched concurrently
    #[serde(rename = "max-concurrent-pages", default = "default_max_concurrent_pages")]
    pub max_concurrent_pages: u32,

    /// Whether the discovered page count is itself the last page
    #[serde(rename = "last-page", default)]
    pub last_page: LastPage,

    /// Number of extracted items buffered ahead of the consumer
    #[serde(rename = "item-buffer", default = "default_item_buffer")]
    pub item_buffer: u32,
}

/// Item extraction configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractConfig {
    /// CSS selector matching one element per item
    #[serde(rename = "item-selector")]
    pub item_selector: String,

    /// Attribute to extract instead of the element text
    #[serde(rename = "item-attribute", default)]
    pub item_attribute: Option<String>,

    /// CSS selector matching the pagination elements holding page numbers
    #[serde(rename = "total-pages-selector")]
    pub total_pages_selector: String,
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Whole-request timeout in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connection timeout in seconds
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Fixed user agent; a random browser user agent is used when unset
    #[serde(rename = "user-agent", default)]
    pub user_agent: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            user_agent: None,
        }
    }
}

/// Which fetch capability to route page requests through
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ProxyConfig {
    /// Fetch pages directly
    #[default]
    Direct,

    /// Fetch pages through a fetch-escrow API
    Escrow(EscrowConfig),
}

/// Fetch-escrow API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EscrowConfig {
    /// API token sent with every request
    pub token: String,

    #[serde(default = "default_escrow_endpoint")]
    pub endpoint: String,

    /// Number of attempts per page before giving up
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,

    #[serde(default = "default_retry_pause_ms")]
    pub retry_pause_ms: u64,

    /// Time the API lets a page render before capturing it
    #[serde(default)]
    pub page_wait_ms: u64,
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file; items are only printed when unset
    #[serde(rename = "database-path", default)]
    pub database_path: Option<String>,
}

fn default_max_concurrent_pages() -> u32 {
    4
}

fn default_item_buffer() -> u32 {
    16
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_escrow_endpoint() -> String {
    "https://api.proxycrawl.com/".to_string()
}

fn default_attempts() -> u32 {
    3
}

fn default_attempt_timeout_ms() -> u64 {
    60_000
}

fn default_retry_pause_ms() -> u64 {
    3_000
}
