//! Shared HTTP plumbing for the upstream adapters.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//!
//! # Content Type Guard
//!
//! Mirrors of the results API sometimes answer with an HTML error page and a
//! 200 status. [`read_json`] refuses any body whose declared `Content-Type`
//! is not JSON, so those pages are never handed to the parser.

use anyhow::{bail, Context, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("paddock/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

/// Send a request, retrying transient failures with exponential backoff.
///
/// `build` is called once per attempt since a `RequestBuilder` is consumed
/// by `send`. Returns the first successful (2xx) response.
pub async fn send_with_retry<F>(max_retries: u32, mut build: F) -> Result<Response>
where
    F: FnMut() -> RequestBuilder,
{
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        match build().send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return Ok(response);
                }

                if status.as_u16() == 429 || status.is_server_error() {
                    last_err = Some(anyhow::anyhow!("upstream error {}", status));
                    continue;
                }

                bail!("upstream error {}", status);
            }
            Err(e) => {
                last_err = Some(anyhow::Error::from(e));
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("request failed after retries")))
}

/// Whether a declared `Content-Type` header names a JSON body.
pub fn is_json_content_type(value: Option<&str>) -> bool {
    value
        .map(|v| v.to_ascii_lowercase().contains("application/json"))
        .unwrap_or(false)
}

/// Check the declared content type, then decode the body.
pub async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if !is_json_content_type(content_type.as_deref()) {
        bail!(
            "expected a JSON response from {}, got content type {}",
            response.url(),
            content_type.as_deref().unwrap_or("(none)")
        );
    }

    let url = response.url().to_string();
    response
        .json::<T>()
        .await
        .with_context(|| format!("Malformed JSON body from {}", url))
}

/// GET a URL and decode its JSON body.
pub async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    query: &[(&str, String)],
    max_retries: u32,
) -> Result<T> {
    let response = send_with_retry(max_retries, || client.get(url).query(query)).await?;
    read_json(response).await
}
