//! Fetch-escrow proxy
//!
//! Routes every fetch through a third-party crawling API that loads the page
//! on our behalf. The API is unreliable, so each logical fetch is attempted
//! several times.
//!
//! # Retry Logic
//!
//! | Condition | Action |
//! |-----------|--------|
//! | HTTP 200 from the API | Return the body |
//! | Any other status | Pause, retry |
//! | Transport error | Pause, retry |
//! | Attempt timeout | Pause, retry |
//! | Cancellation | Stop immediately |
//! | Attempts exhausted | `AttemptsExhausted` |

use crate::config::EscrowConfig;
use crate::proxy::{FetchError, Proxy};
use async_trait::async_trait;
use reqwest::{Client, Request, StatusCode};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Proxy that delegates fetches to a fetch-escrow API
#[derive(Debug, Clone)]
pub struct EscrowProxy {
    client: Client,
    endpoint: String,
    token: String,
    /// Number of times to try a page before giving up
    attempts: u32,
    /// How long to wait on a single attempt before abandoning it
    attempt_timeout: Duration,
    /// Pause between failed attempts
    retry_pause: Duration,
    /// How long the API should let the page render before capturing it
    page_wait: Duration,
}

impl EscrowProxy {
    /// Creates an escrow proxy from its configuration section
    pub fn from_config(client: Client, config: &EscrowConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            token: config.token.clone(),
            attempts: config.attempts,
            attempt_timeout: Duration::from_millis(config.attempt_timeout_ms),
            retry_pause: Duration::from_millis(config.retry_pause_ms),
            page_wait: Duration::from_millis(config.page_wait_ms),
        }
    }

    /// Builds the API URL that asks the escrow to load `target`
    fn escrow_url(&self, target: &Url) -> Result<Url, FetchError> {
        let mut url = Url::parse(&self.endpoint)
            .map_err(|e| FetchError::Upstream(format!("Invalid escrow endpoint: {}", e)))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("token", &self.token);
            query.append_pair("url", target.as_str());
            if !self.page_wait.is_zero() {
                query.append_pair("page_wait", &self.page_wait.as_millis().to_string());
            }
        }

        Ok(url)
    }

    /// Runs one attempt against the escrow API
    ///
    /// The attempt timeout replaces the client's whole-request timeout, which
    /// is sized for direct fetches and may be shorter than the escrow's
    /// rendering time.
    async fn attempt(&self, url: Url) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .timeout(self.attempt_timeout)
            .send()
            .await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status {
                url: response.url().to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl Proxy for EscrowProxy {
    async fn fetch(
        &self,
        request: Request,
        cancel: &CancellationToken,
    ) -> Result<String, FetchError> {
        let escrow_url = self.escrow_url(request.url())?;

        for attempt in 1..=self.attempts {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                outcome = tokio::time::timeout(self.attempt_timeout, self.attempt(escrow_url.clone())) => outcome,
            };

            match outcome {
                Ok(Ok(body)) => return Ok(body),
                Ok(Err(e)) => {
                    tracing::warn!(
                        "Escrow attempt {}/{} for {} failed: {}",
                        attempt,
                        self.attempts,
                        request.url(),
                        e
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        "Escrow attempt {}/{} for {} timed out after {:?}",
                        attempt,
                        self.attempts,
                        request.url(),
                        self.attempt_timeout
                    );
                }
            }

            if attempt < self.attempts {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                    _ = tokio::time::sleep(self.retry_pause) => {}
                }
            }
        }

        Err(FetchError::AttemptsExhausted {
            attempts: self.attempts,
        })
    }
}
