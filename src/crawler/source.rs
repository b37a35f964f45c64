//! Page source contract
//!
//! A [`PageSource`] describes a paginated resource: where each page lives, how
//! to turn a page body into items, and how to read the page count off the
//! first page. The orchestrator treats all three as pure functions.

use std::fmt;
use thiserror::Error;

/// Error raised by a parser that could not make sense of a page body
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ParseError(pub String);

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// The collaborators the orchestrator needs to walk a paginated resource
///
/// Implementations are shared across concurrent workers, so every method
/// must be callable from several tasks at once and must not block.
pub trait PageSource: Send + Sync + 'static {
    /// Payload emitted for each extracted item
    type Item: Send + 'static;

    /// Returns the URL of a page (pages are numbered from 1)
    fn page_url(&self, page: u64) -> String;

    /// Extracts the items found on a page, in page order
    fn parse(&self, body: &str) -> Result<Vec<Self::Item>, ParseError>;

    /// Reads the total number of pages from the body of page 1
    fn total_pages(&self, first_page: &str) -> u64;
}

/// A [`PageSource`] assembled from three closures
///
/// Built with [`page_source`].
pub struct FnSource<U, P, T> {
    page_url: U,
    parse: P,
    total_pages: T,
}

/// Adapts three closures into a [`PageSource`]
///
/// # Example
///
/// ```
/// use page_sweep::crawler::{page_source, PageSource};
///
/// let source = page_source(
///     |page| format!("https://example.com/?p={}", page),
///     |body: &str| Ok(vec![body.len()]),
///     |_body: &str| 3,
/// );
/// assert_eq!(source.page_url(2), "https://example.com/?p=2");
/// assert_eq!(source.total_pages(""), 3);
/// ```
pub fn page_source<U, P, T, I>(page_url: U, parse: P, total_pages: T) -> FnSource<U, P, T>
where
    U: Fn(u64) -> String + Send + Sync + 'static,
    P: Fn(&str) -> Result<Vec<I>, ParseError> + Send + Sync + 'static,
    T: Fn(&str) -> u64 + Send + Sync + 'static,
    I: Send + 'static,
{
    FnSource {
        page_url,
        parse,
        total_pages,
    }
}

impl<U, P, T, I> PageSource for FnSource<U, P, T>
where
    U: Fn(u64) -> String + Send + Sync + 'static,
    P: Fn(&str) -> Result<Vec<I>, ParseError> + Send + Sync + 'static,
    T: Fn(&str) -> u64 + Send + Sync + 'static,
    I: Send + 'static,
{
    type Item = I;

    fn page_url(&self, page: u64) -> String {
        (self.page_url)(page)
    }

    fn parse(&self, body: &str) -> Result<Vec<I>, ParseError> {
        (self.parse)(body)
    }

    fn total_pages(&self, first_page: &str) -> u64 {
        (self.total_pages)(first_page)
    }
}

impl<U, P, T> fmt::Debug for FnSource<U, P, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSource").finish_non_exhaustive()
    }
}
