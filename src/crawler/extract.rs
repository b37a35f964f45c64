//! HTML listing extractor
//!
//! This module turns listing pages into items using CSS selectors:
//! - Items are the text (or an attribute) of every element matching the
//!   item selector
//! - The page count is the largest number found in the pagination elements

use crate::config::{ExtractConfig, PAGE_PLACEHOLDER};
use crate::crawler::{PageSource, ParseError};
use crate::ConfigError;
use scraper::{Html, Selector};

/// [`PageSource`] for HTML listings described by CSS selectors
#[derive(Debug, Clone)]
pub struct HtmlExtractor {
    page_url: String,
    item_selector: Selector,
    item_attribute: Option<String>,
    total_pages_selector: Selector,
}

impl HtmlExtractor {
    /// Creates an extractor
    ///
    /// # Arguments
    ///
    /// * `page_url` - URL template where `{page}` is replaced by the page number
    /// * `config` - Selectors for items and for the pagination
    ///
    /// # Returns
    ///
    /// * `Ok(HtmlExtractor)` - Both selectors compiled
    /// * `Err(ConfigError::InvalidSelector)` - A selector is not valid CSS
    ///
    /// # Example
    ///
    /// ```
    /// use page_sweep::config::ExtractConfig;
    /// use page_sweep::crawler::{HtmlExtractor, PageSource};
    ///
    /// let extractor = HtmlExtractor::new(
    ///     "https://example.com/list?page={page}",
    ///     &ExtractConfig {
    ///         item_selector: "li.item".to_string(),
    ///         item_attribute: None,
    ///         total_pages_selector: "nav a".to_string(),
    ///     },
    /// )
    /// .unwrap();
    ///
    /// let html = r#"<ul><li class="item">Tea</li></ul><nav><a>1</a><a>2</a></nav>"#;
    /// assert_eq!(extractor.parse(html).unwrap(), vec!["Tea".to_string()]);
    /// assert_eq!(extractor.total_pages(html), 2);
    /// ```
    pub fn new(page_url: &str, config: &ExtractConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            page_url: page_url.to_string(),
            item_selector: compile(&config.item_selector)?,
            item_attribute: config.item_attribute.clone(),
            total_pages_selector: compile(&config.total_pages_selector)?,
        })
    }
}

fn compile(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}

/// Finds the largest run of ASCII digits in a piece of text
fn largest_number(text: &str) -> Option<u64> {
    text.split(|c: char| !c.is_ascii_digit())
        .filter(|part| !part.is_empty())
        .filter_map(|part| part.parse::<u64>().ok())
        .max()
}

impl PageSource for HtmlExtractor {
    type Item = String;

    fn page_url(&self, page: u64) -> String {
        self.page_url.replace(PAGE_PLACEHOLDER, &page.to_string())
    }

    fn parse(&self, body: &str) -> Result<Vec<String>, ParseError> {
        let document = Html::parse_document(body);

        let items = document
            .select(&self.item_selector)
            .filter_map(|element| match &self.item_attribute {
                Some(attribute) => element.value().attr(attribute).map(str::to_string),
                None => Some(element.text().collect::<String>()),
            })
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .collect();

        Ok(items)
    }

    fn total_pages(&self, first_page: &str) -> u64 {
        let document = Html::parse_document(first_page);

        let total = document
            .select(&self.total_pages_selector)
            .filter_map(|element| largest_number(&element.text().collect::<String>()))
            .max();

        match total {
            Some(total) => total.max(1),
            None => {
                tracing::warn!("No page count found on page 1, assuming a single page");
                1
            }
        }
    }
}
