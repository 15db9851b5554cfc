// External gateway: a retrying HTTP client shared by every outbound adapter.
// Every outcome is normalized into Result<T, GatewayError>.

use std::{future::Future, time::Duration};

use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::time::Instant;

// Error types for outbound calls
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("Initialization error: {0}")]
    Init(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("API error: {status_code} - {message}")]
    ApiResponseError {
        status_code: u16,
        message: String,
        is_retryable: bool,
    },

    #[error("Decode error: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Network failures, timeouts and 5xx responses are transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Network(_) | GatewayError::Timeout(_) => true,
            GatewayError::ApiResponseError { is_retryable, .. } => *is_retryable,
            GatewayError::Init(_) | GatewayError::Decode(_) => false,
        }
    }

    pub(crate) fn from_status(status: StatusCode, body: &str) -> Self {
        GatewayError::ApiResponseError {
            status_code: status.as_u16(),
            message: extract_error_message(body).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown API error occurred")
                    .to_string()
            }),
            is_retryable: status.is_server_error(),
        }
    }
}

// Retry configuration: `max_attempts` counts the first call too
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl RetryConfig {
    // Linear backoff: the n-th retry waits n * retry_delay_ms
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_delay_ms.saturating_mul(attempt as u64))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub user_agent: String,
    pub retry: RetryConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_ms: 10_000,
            user_agent: "Bookshore-API/1.0".to_string(),
            retry: RetryConfig::default(),
        }
    }
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or the
/// attempt budget is spent. `op` receives the 1-based attempt number.
pub async fn retry_with_backoff<T, F, Fut>(
    config: &RetryConfig,
    label: &str,
    mut op: F,
) -> Result<T, GatewayError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_attempts && err.is_retryable() => {
                tracing::warn!(
                    endpoint = label,
                    attempt,
                    max_attempts,
                    error = %err,
                    "retrying request"
                );
                tokio::time::sleep(config.calculate_backoff(attempt)).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

pub struct ExternalGateway {
    client: Client,
    config: GatewayConfig,
}

impl ExternalGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| GatewayError::Init(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn url_for(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    /// GET `endpoint` with query parameters and extra headers, decoding the
    /// JSON body into `T`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
        headers: &[(&str, String)],
    ) -> Result<T, GatewayError> {
        let url = self.url_for(endpoint);

        retry_with_backoff(&self.config.retry, endpoint, |attempt| {
            let url = url.clone();
            async move {
                let started = Instant::now();
                let mut request = self.client.get(&url).query(query);
                for (name, value) in headers {
                    request = request.header(*name, value);
                }

                tracing::debug!(%url, attempt, "GET");

                let response = request.send().await.map_err(|e| {
                    if e.is_timeout() {
                        GatewayError::Timeout(self.config.timeout_ms)
                    } else {
                        GatewayError::Network(e.to_string())
                    }
                })?;

                let status = response.status();
                tracing::debug!(
                    %url,
                    status = status.as_u16(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "response"
                );

                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(GatewayError::from_status(status, &body));
                }

                let body = response
                    .text()
                    .await
                    .map_err(|e| GatewayError::Network(e.to_string()))?;
                serde_json::from_str::<T>(&body).map_err(|e| GatewayError::Decode(e.to_string()))
            }
        })
        .await
    }
}

// Pull a human-readable message out of an error body, if it has one
fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .map(str::to_string)
}
