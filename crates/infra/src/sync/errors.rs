//! Sync-specific error types with retry metadata.

use punchbridge_domain::BridgeError;
use thiserror::Error;

/// Categories of sync errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncErrorCategory {
    /// Authentication errors (401, 403); not retryable without new
    /// credentials.
    Authentication,
    /// Rate limiting (429); retryable with backoff.
    RateLimit,
    /// Server errors (5xx); retryable.
    Server,
    /// Client errors (4xx except auth); non-retryable.
    Client,
    /// Network and connection errors; retryable.
    Network,
    /// Configuration errors; non-retryable.
    Config,
}

/// Sync operation errors.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Client error: {0}")]
    Client(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timeout after {0:?}")]
    Timeout(std::time::Duration),
}

impl SyncError {
    /// Classify a non-success HTTP status plus response body.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => Self::Auth(format!("status {status}: {body}")),
            429 => Self::RateLimit(format!("status {status}")),
            500..=599 => Self::Server(format!("status {status}: {body}")),
            _ => Self::Client(format!("status {status}: {body}")),
        }
    }

    /// Get the error category for this error.
    pub fn category(&self) -> SyncErrorCategory {
        match self {
            Self::Auth(_) => SyncErrorCategory::Authentication,
            Self::RateLimit(_) => SyncErrorCategory::RateLimit,
            Self::Server(_) => SyncErrorCategory::Server,
            Self::Client(_) => SyncErrorCategory::Client,
            Self::Network(_) | Self::Timeout(_) => SyncErrorCategory::Network,
            Self::Config(_) => SyncErrorCategory::Config,
        }
    }

    /// Check if an immediate retry of the same request can help.
    pub fn should_retry(&self) -> bool {
        matches!(
            self.category(),
            SyncErrorCategory::RateLimit | SyncErrorCategory::Server | SyncErrorCategory::Network
        )
    }
}

impl From<SyncError> for BridgeError {
    fn from(err: SyncError) -> Self {
        match err.category() {
            SyncErrorCategory::Authentication => BridgeError::Auth(err.to_string()),
            SyncErrorCategory::Config => BridgeError::Config(err.to_string()),
            _ => BridgeError::Network(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Network("request timed out".to_string());
        }
        Self::Network(err.to_string())
    }
}
