//! HTTP client for the upstream management endpoint.

use std::time::Duration;

use tracing::trace;

use crate::config::UpstreamConfig;
use crate::error::{Error, Result};

/// Fetches the upstream JSON document.
///
/// One client is shared by every scrape so idle connections are reused.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    url: String,
}

impl UpstreamClient {
    /// Create a client for `url` with the configured timeout and idle pool.
    pub fn new(url: impl Into<String>, config: &UpstreamConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(config.max_idle_connections)
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// The URL fetched on every scrape.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue one GET and return the body of a 2xx response.
    pub async fn fetch(&self) -> Result<String> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(Error::UpstreamStatus {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        trace!(url = %self.url, bytes = body.len(), "Fetched upstream document");
        Ok(body)
    }
}
