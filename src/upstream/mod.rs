//! Upstream transport for the planning services
//!
//! Owns the network call only: URL building, auth headers supplied by the
//! adapter, status handling and transport-level retries. Circuit breaking,
//! caching and fallback happen one layer up.

use crate::config::{RetryConfig, ServiceConfig};
use crate::error::UpstreamError;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, warn};

pub mod signing;
pub use signing::sign_body;

/// Cap on how much of an error body ends up in logs and errors
const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One call to a planning service. `body` holds the exact bytes to send.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl UpstreamRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: Some(body),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Sends requests to one planning service
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &UpstreamRequest) -> Result<Value, UpstreamError>;
}

/// Services may wrap payloads as `{"data": ...}`
pub fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Delay before retry number `attempt` (1-based)
pub fn retry_delay(retry: &RetryConfig, attempt: u32) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
    let delay_ms = retry.delay_ms as f64 * retry.factor.powi(exponent);
    Duration::from_millis(delay_ms.min(u64::MAX as f64) as u64)
}

/// Per-attempt timeout carved out of the call budget.
///
/// With retries on, the backoff delays come off `timeout_ms` first and the rest is
/// split evenly across attempts, so a timed-out attempt still leaves room to retry.
/// If the delays alone exceed the budget, the budget is split evenly instead.
pub fn attempt_timeout(config: &ServiceConfig) -> Duration {
    let budget = config.timeout_ms;
    if !config.features.enable_retries || config.retry.attempts <= 1 {
        return Duration::from_millis(budget.max(1));
    }

    let attempts = u64::from(config.retry.attempts);
    let backoff_ms: u64 = (1..config.retry.attempts)
        .map(|attempt| retry_delay(&config.retry, attempt).as_millis() as u64)
        .fold(0, u64::saturating_add);

    let per_attempt = match budget.checked_sub(backoff_ms) {
        Some(remaining) if remaining >= attempts => remaining / attempts,
        _ => budget / attempts,
    };

    Duration::from_millis(per_attempt.max(1))
}

/// reqwest-backed transport (connection-pooled)
pub struct HttpTransport {
    service: String,
    client: Client,
    base_url: String,
    timeout_ms: u64,
    retry: Option<RetryConfig>,
}

impl HttpTransport {
    pub fn new(service: impl Into<String>, config: &ServiceConfig) -> Result<Self, UpstreamError> {
        let service = service.into();
        let per_attempt = attempt_timeout(config);

        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(per_attempt)
            .build()
            .map_err(|e| UpstreamError::Network {
                service: service.clone(),
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            service,
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_ms: per_attempt.as_millis() as u64,
            retry: config
                .features
                .enable_retries
                .then(|| config.retry.clone()),
        })
    }

    async fn send_once(&self, request: &UpstreamRequest) -> Result<Value, UpstreamError> {
        let url = format!("{}{}", self.base_url, request.path);

        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body.clone());
        }

        let response = builder.send().await.map_err(|e| {
            error!(service = %self.service, path = %request.path, "Upstream request failed: {}", e);
            if e.is_timeout() {
                UpstreamError::Timeout {
                    service: self.service.clone(),
                    timeout_ms: self.timeout_ms,
                }
            } else {
                UpstreamError::Network {
                    service: self.service.clone(),
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| UpstreamError::Network {
            service: self.service.clone(),
            message: format!("failed reading body: {}", e),
        })?;

        if !status.is_success() {
            let body: String = text.chars().take(MAX_ERROR_BODY_CHARS).collect();
            error!(service = %self.service, status = status.as_u16(), "Upstream error response: {}", body);
            return Err(UpstreamError::Status {
                service: self.service.clone(),
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&text).map_err(|e| UpstreamError::InvalidBody {
            service: self.service.clone(),
            message: e.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &UpstreamRequest) -> Result<Value, UpstreamError> {
        let max_attempts = self.retry.as_ref().map_or(1, |r| r.attempts.max(1));
        let mut attempt = 1;

        loop {
            debug!(service = %self.service, path = %request.path, attempt, "Calling upstream");

            match self.send_once(request).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < max_attempts && e.is_retryable() => {
                    let delay = self
                        .retry
                        .as_ref()
                        .map(|r| retry_delay(r, attempt))
                        .unwrap_or_default();
                    warn!(
                        service = %self.service,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying upstream call"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
