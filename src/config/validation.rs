use crate::config::types::{ClientConfig, Config, CrawlerConfig, ExtractConfig, ProxyConfig};
use crate::config::PAGE_PLACEHOLDER;
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_extract_config(&config.extract)?;
    validate_client_config(&config.client)?;
    validate_proxy_config(&config.proxy)?;
    Ok(())
}

/// Validates pagination configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_page_url(&config.page_url)?;

    if config.max_concurrent_pages < 1 || config.max_concurrent_pages > 100 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-pages must be between 1 and 100, got {}",
            config.max_concurrent_pages
        )));
    }

    if config.item_buffer < 1 {
        return Err(ConfigError::Validation(format!(
            "item-buffer must be >= 1, got {}",
            config.item_buffer
        )));
    }

    Ok(())
}

/// Validates the page URL template
///
/// The template must contain the `{page}` placeholder and must produce an
/// absolute http(s) URL once it is filled in.
fn validate_page_url(template: &str) -> Result<(), ConfigError> {
    if !template.contains(PAGE_PLACEHOLDER) {
        return Err(ConfigError::Validation(format!(
            "page-url '{}' must contain the {} placeholder",
            template, PAGE_PLACEHOLDER
        )));
    }

    let sample = template.replace(PAGE_PLACEHOLDER, "1");
    let url = Url::parse(&sample)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid page-url '{}': {}", template, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "page-url '{}' must use http or https",
            template
        )));
    }

    Ok(())
}

/// Validates that both selectors compile
fn validate_extract_config(config: &ExtractConfig) -> Result<(), ConfigError> {
    validate_selector("item-selector", &config.item_selector)?;
    validate_selector("total-pages-selector", &config.total_pages_selector)?;

    if let Some(attribute) = &config.item_attribute {
        if attribute.trim().is_empty() {
            return Err(ConfigError::Validation(
                "item-attribute cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_selector(name: &str, selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector(format!("{} '{}': {:?}", name, selector, e)))
}

/// Validates HTTP client configuration
fn validate_client_config(config: &ClientConfig) -> Result<(), ConfigError> {
    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "connect-timeout-secs must be >= 1".to_string(),
        ));
    }

    if let Some(ua) = &config.user_agent {
        if ua.trim().is_empty() || !ua.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) {
            return Err(ConfigError::Validation(format!(
                "user-agent must be non-empty printable ASCII, got '{}'",
                ua
            )));
        }
    }

    Ok(())
}

/// Validates proxy configuration
fn validate_proxy_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    let escrow = match config {
        ProxyConfig::Direct => return Ok(()),
        ProxyConfig::Escrow(escrow) => escrow,
    };

    if escrow.token.is_empty() {
        return Err(ConfigError::Validation(
            "escrow token cannot be empty".to_string(),
        ));
    }

    Url::parse(&escrow.endpoint).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid escrow endpoint '{}': {}", escrow.endpoint, e))
    })?;

    if escrow.attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "escrow attempts must be >= 1, got {}",
            escrow.attempts
        )));
    }

    if escrow.attempt_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "escrow attempt-timeout-ms must be > 0".to_string(),
        ));
    }

    Ok(())
}
