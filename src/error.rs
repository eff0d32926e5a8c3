//! Error types for the planning gateway

use thiserror::Error;

/// Result type alias for planning operations
pub type Result<T> = std::result::Result<T, PlanningError>;

#[derive(Error, Debug)]
pub enum PlanningError {

    // =============================
    // Caller-facing Errors
    // =============================

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlanningError {
    /// True for request or response schema violations
    pub fn is_validation(&self) -> bool {
        matches!(self, PlanningError::Validation(_))
    }
}

/// Schema violation, identifying the first failing field
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Failures talking to a planning service. Every variant counts as a breaker failure.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("request to {service} failed: {message}")]
    Network { service: String, message: String },

    #[error("{service} did not respond within {timeout_ms} ms")]
    Timeout { service: String, timeout_ms: u64 },

    #[error("{service} returned {status}: {body}")]
    Status {
        service: String,
        status: u16,
        body: String,
    },

    #[error("{service} returned a body that is not JSON: {message}")]
    InvalidBody { service: String, message: String },

    #[error("response failed validation: {0}")]
    InvalidResponse(ValidationError),

    #[error("request signing failed: {0}")]
    Signing(String),
}

impl UpstreamError {
    /// Transport-level retries only make sense for transient failures
    pub fn is_retryable(&self) -> bool {
        match self {
            UpstreamError::Network { .. } | UpstreamError::Timeout { .. } => true,
            UpstreamError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<sqlx::Error> for CacheError {
    fn from(e: sqlx::Error) -> Self {
        CacheError::Backend(e.to_string())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(String),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}
