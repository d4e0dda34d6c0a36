//! Error types for the Sentinel generation pipeline.
//!
//! `ApiError` is the crate-wide error. `BackendFailure` is the contained,
//! per-backend failure marker: it travels inside a failed generation outcome
//! and is never propagated to the stream consumer.

use serde::Serialize;
use thiserror::Error;

/// Crate-wide errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("Provider request failed: {0}")]
    ProviderRequestFailed(String),

    #[error("Provider authentication failed: {0}")]
    ProviderAuthFailed(String),

    #[error("Provider rate limit exceeded: {0}")]
    ProviderRateLimit(String),

    #[error("Provider model not found: {0}")]
    ProviderModelNotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Pipeline cancelled by consumer")]
    Cancelled,

    #[error("Pipeline fault: {0}")]
    PipelineFault(String),
}

impl ApiError {
    /// Rate-limit errors are the only ones a backend retries.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, ApiError::ProviderRateLimit(_))
    }
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::PipelineFault(format!("Serialization failed: {}", err))
    }
}

/// Classification of a contained backend failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    RateLimited,
    Auth,
    Request,
    Timeout,
    Panicked,
}

/// A backend failure captured as data.
#[derive(Debug, Clone, Error, Serialize)]
#[error("backend '{backend}' failed ({kind:?}): {message}")]
pub struct BackendFailure {
    pub backend: String,
    pub kind: FailureKind,
    pub message: String,
}

impl BackendFailure {
    pub fn new(backend: impl Into<String>, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            kind,
            message: message.into(),
        }
    }

    /// Capture an `ApiError` raised while talking to a provider.
    pub fn from_api_error(backend: impl Into<String>, err: &ApiError) -> Self {
        let kind = match err {
            ApiError::ProviderRateLimit(_) => FailureKind::RateLimited,
            ApiError::ProviderAuthFailed(_) => FailureKind::Auth,
            ApiError::Timeout(_) => FailureKind::Timeout,
            _ => FailureKind::Request,
        };
        Self::new(backend, kind, err.to_string())
    }
}
