//! HTTP client for fetching knowledge base snapshots
//!
//! Wraps reqwest with:
//! - Configurable timeout and User-Agent
//! - Exponential backoff retry on transport errors, rate limits and 5xx
//!   responses (max 2 retries by default)
//!
//! The timeout bounds the whole fetch, retries and body included, so a slow
//! host never holds the run for more than one timeout.

use crate::error::KnowledgeBaseError;
use reqwest::{Client, StatusCode};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Default timeout for fetching a snapshot
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default User-Agent header
const DEFAULT_USER_AGENT: &str = concat!("fusionup/", env!("CARGO_PKG_VERSION"));

/// Maximum number of retry attempts
const MAX_RETRIES: u32 = 2;

/// Base delay for exponential backoff (in milliseconds)
const BASE_DELAY_MS: u64 = 200;

/// HTTP client wrapper with retry logic
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    timeout: Duration,
    max_retries: u32,
}

impl HttpClient {
    /// Create a new HTTP client with a custom timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self, KnowledgeBaseError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()
            .map_err(|e| {
                KnowledgeBaseError::network_error(
                    "HTTP client",
                    format!("failed to create HTTP client: {}", e),
                )
            })?;

        Ok(Self {
            client,
            timeout,
            max_retries: MAX_RETRIES,
        })
    }

    /// Set the maximum number of retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Runs `fetch` under the overall deadline
    async fn with_deadline<T>(
        &self,
        url: &str,
        fetch: impl Future<Output = Result<T, KnowledgeBaseError>>,
    ) -> Result<T, KnowledgeBaseError> {
        match tokio::time::timeout(self.timeout, fetch).await {
            Ok(result) => result,
            Err(_) => {
                debug!(url, timeout_ms = self.timeout.as_millis() as u64, "knowledge base fetch hit its deadline");
                Err(KnowledgeBaseError::timeout(url))
            }
        }
    }

    /// Sends a GET request, retrying transient failures
    async fn send_with_retry(&self, url: &str) -> Result<reqwest::Response, KnowledgeBaseError> {
        let mut last_error = None;
        let mut delay = BASE_DELAY_MS;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                debug!(url, attempt, delay_ms = delay, "retrying knowledge base request");
                tokio::time::sleep(Duration::from_millis(delay)).await;
                delay *= 2;
            }

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    let error =
                        KnowledgeBaseError::network_error(url, format!("HTTP {}", status));
                    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        last_error = Some(error);
                        continue;
                    }
                    return Err(error);
                }
                Err(e) if e.is_timeout() => {
                    last_error = Some(KnowledgeBaseError::timeout(url));
                }
                Err(e) => {
                    last_error = Some(KnowledgeBaseError::network_error(url, e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| KnowledgeBaseError::network_error(url, "unknown error")))
    }

    /// Fetches `url` and parses the JSON body
    pub async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, KnowledgeBaseError> {
        self.with_deadline(url, async {
            let response = self.send_with_retry(url).await?;
            response.json::<T>().await.map_err(|e| {
                KnowledgeBaseError::invalid_response(url, format!("failed to parse JSON: {}", e))
            })
        })
        .await
    }
}
