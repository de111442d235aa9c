// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::Client;

use crate::error::Result;
use crate::models::CrawlerConfig;

/// Create the shared HTTP client for a run.
pub fn create_client(config: &CrawlerConfig) -> Result<Client> {
    let client = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Fetch a URL, failing on non-2xx responses.
pub async fn fetch_bytes(client: &Client, url: &str) -> Result<Vec<u8>> {
    let response = client.get(url).send().await?.error_for_status()?;
    Ok(response.bytes().await?.to_vec())
}

/// Fetch a page body as text, failing on non-2xx responses.
pub async fn fetch_text(client: &Client, url: &str) -> Result<String> {
    let text = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    Ok(text)
}
