use crate::types::{FilterError, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Fetches candidate article pages over plain GET. Owns its HTTP client so
/// the API client's auth headers never leak onto article requests.
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    pub fn new(user_agent: &str, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()?;
        Ok(Self { client })
    }

    /// GET the page and return its body. Any non-200 status is an error;
    /// the caller decides whether to retry (it doesn't — the next scheduled
    /// run reconsiders uncached entries).
    pub async fn fetch(&self, url: &str) -> Result<String> {
        debug!("Fetching page: {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(FilterError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.text().await?;
        Ok(body)
    }
}
