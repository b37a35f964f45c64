//! Direct fetcher
//!
//! Sends requests straight to the target host. The only thing it adds to a
//! request is a `User-Agent` header, and only when the caller set none.

use crate::config::ClientConfig;
use crate::proxy::{FetchError, Proxy};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, USER_AGENT};
use reqwest::{Client, Request};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const BROWSER_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.2478.67",
];

/// Picks a browser user agent at random
pub fn random_user_agent() -> &'static str {
    BROWSER_USER_AGENTS[fastrand::usize(..BROWSER_USER_AGENTS.len())]
}

/// Builds an HTTP client with the configured timeouts
///
/// No default user agent is set on the client: the proxies decide per
/// request what identification to send.
///
/// # Example
///
/// ```no_run
/// use page_sweep::config::ClientConfig;
/// use page_sweep::proxy::build_http_client;
///
/// let client = build_http_client(&ClientConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &ClientConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches pages without any intermediary
#[derive(Debug, Clone)]
pub struct DirectProxy {
    client: Client,
    user_agent: Option<String>,
}

impl DirectProxy {
    /// Creates a direct proxy
    ///
    /// # Arguments
    ///
    /// * `client` - The HTTP client to send requests with
    /// * `user_agent` - Fixed user agent for requests that carry none; a
    ///   random browser user agent is used when this is `None`
    pub fn new(client: Client, user_agent: Option<String>) -> Self {
        Self { client, user_agent }
    }

    fn default_user_agent(&self) -> HeaderValue {
        self.user_agent
            .as_deref()
            .and_then(|ua| HeaderValue::from_str(ua).ok())
            .unwrap_or_else(|| HeaderValue::from_static(random_user_agent()))
    }
}

#[async_trait]
impl Proxy for DirectProxy {
    async fn fetch(
        &self,
        mut request: Request,
        cancel: &CancellationToken,
    ) -> Result<String, FetchError> {
        if !request.headers().contains_key(USER_AGENT) {
            request
                .headers_mut()
                .insert(USER_AGENT, self.default_user_agent());
        }

        let url = request.url().to_string();
        tracing::trace!("Fetching {}", url);

        let fetch = async {
            let response = self.client.execute(request).await?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    url,
                    status: status.as_u16(),
                });
            }
            Ok(response.text().await?)
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            result = fetch => result,
        }
    }
}
