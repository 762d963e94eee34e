// src/utils/http.rs

//! HTTP client helpers.

use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::error::Result;
use crate::models::ClientConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_client(config: &ClientConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Fetch a URL and decode the response body as JSON.
///
/// Non-success status codes surface as errors.
pub async fn get_json(client: &reqwest::Client, url: Url) -> Result<Value> {
    let response = client.get(url).send().await?.error_for_status()?;
    Ok(response.json().await?)
}
