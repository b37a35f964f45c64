//! Fetch capabilities
//!
//! A [`Proxy`] performs one HTTP-level fetch and returns the response body.
//! Two implementations are provided:
//! - [`DirectProxy`] sends the request straight to the target
//! - [`EscrowProxy`] routes it through a fetch-escrow API with retries

mod direct;
mod escrow;

pub use direct::{build_http_client, random_user_agent, DirectProxy};
pub use escrow::EscrowProxy;

use crate::config::{Config, ProxyConfig};
use async_trait::async_trait;
use reqwest::Request;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors that can occur while fetching a page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to get a successful response after max attempts ({attempts})")]
    AttemptsExhausted { attempts: u32 },

    #[error("Fetch cancelled")]
    Cancelled,

    #[error("{0}")]
    Upstream(String),
}

/// Something that can fetch a page body for a request
///
/// Implementations are shared between concurrent workers, so they must be
/// safe to call from many tasks at once. An in-flight fetch must return
/// promptly with [`FetchError::Cancelled`] once `cancel` fires.
#[async_trait]
pub trait Proxy: Send + Sync {
    async fn fetch(
        &self,
        request: Request,
        cancel: &CancellationToken,
    ) -> Result<String, FetchError>;
}

/// Builds the proxy described by the configuration
///
/// # Arguments
///
/// * `config` - The full crawler configuration
///
/// # Returns
///
/// * `Ok(Arc<dyn Proxy>)` - A shareable fetch capability
/// * `Err(reqwest::Error)` - Failed to build the HTTP client
pub fn build_proxy(config: &Config) -> Result<Arc<dyn Proxy>, reqwest::Error> {
    let client = build_http_client(&config.client)?;

    let proxy: Arc<dyn Proxy> = match &config.proxy {
        ProxyConfig::Direct => Arc::new(DirectProxy::new(client, config.client.user_agent.clone())),
        ProxyConfig::Escrow(escrow) => Arc::new(EscrowProxy::from_config(client, escrow)),
    };

    Ok(proxy)
}
