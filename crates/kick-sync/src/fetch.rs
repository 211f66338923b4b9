//! Resilient JSON fetching with exponential backoff.
//!
//! [`RetryingFetcher`] wraps an [`HttpTransport`] with the retry policy used
//! for every outbound API call: pure exponential backoff, typed failure
//! classification, and immediate credential invalidation on HTTP 401.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::HeaderMap;
use serde_json::Value;
use tracing::warn;

use crate::config::RetryPolicy;
use crate::error::SyncError;
use crate::store::StateStore;

/// Minimal response surface the retry loop classifies.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// GET-only transport seam. The production implementation is reqwest-backed;
/// tests substitute scripted fakes.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str, headers: &HeaderMap) -> Result<HttpResponse, SyncError>;
}

/// Reqwest-backed transport with a fixed per-attempt timeout.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, headers: &HeaderMap) -> Result<HttpResponse, SyncError> {
        let response = self.client.get(url).headers(headers.clone()).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        Ok(HttpResponse {
            status,
            body,
        })
    }
}

/// Resilient request executor shared by both sync steps.
pub struct RetryingFetcher {
    transport: Arc<dyn HttpTransport>,
    store: Arc<StateStore>,
    policy: RetryPolicy,
}

impl RetryingFetcher {
    pub fn new(transport: Arc<dyn HttpTransport>, store: Arc<StateStore>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            store,
            policy,
        }
    }

    /// Fetch and parse a JSON body, retrying failures with exponential
    /// backoff. Only the final attempt's failure is surfaced; there is no
    /// delay after the last attempt and no retry after a success.
    pub async fn fetch_json(&self, url: &str, headers: &HeaderMap) -> Result<Value, SyncError> {
        let retries = self.policy.retries.max(1);
        for attempt in 0..retries {
            match self.attempt(url, headers).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if attempt + 1 >= retries {
                        warn!(url, attempts = retries, error = %err, "fetch failed, retries exhausted");
                        return Err(err);
                    }
                    let delay = self.policy.delay_for_attempt(attempt);
                    warn!(
                        url,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "fetch attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
        // Unreachable: the loop covers every attempt and the last one returns.
        Err(SyncError::Network("retry loop exited without result".to_string()))
    }

    /// One attempt: request, classify the status, parse the body.
    ///
    /// A 401 clears the stored credential before the error continues through
    /// the retry loop, so a later trigger starts from `Unauthenticated`
    /// instead of re-sending a known-bad token.
    async fn attempt(&self, url: &str, headers: &HeaderMap) -> Result<Value, SyncError> {
        let response = self.transport.get(url, headers).await?;
        match response.status {
            200..=299 => Ok(serde_json::from_slice(&response.body)?),
            401 => {
                self.store.clear_token();
                Err(SyncError::AuthExpired)
            }
            status => Err(SyncError::HttpStatus(status)),
        }
    }
}
