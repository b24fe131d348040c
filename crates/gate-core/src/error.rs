//! # Gate Error Types
//!
//! Typed error handling for the docgate download-gate engine.
//! All fallible operations return `Result<T, GateError>`.

use thiserror::Error;

/// Core error type for all gate operations
#[derive(Debug, Error)]
pub enum GateError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Token missing, expired, or exhausted. Carries no detail: every denial
    /// must be indistinguishable to the caller.
    #[error("Access denied")]
    AccessDenied,

    /// Payment provider API error
    #[error("Provider error [{provider}]: {message}")]
    ProviderError { provider: String, message: String },

    /// Network/HTTP error communicating with provider
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Webhook signature verification failed
    #[error("Webhook verification failed: {0}")]
    WebhookVerificationFailed(String),

    /// Webhook payload parsing error
    #[error("Webhook parse error: {0}")]
    WebhookParseError(String),

    /// Checkout session creation failed
    #[error("Checkout creation failed: {0}")]
    CheckoutCreationFailed(String),

    /// Master content missing or unreadable (operator misconfiguration)
    #[error("Content unavailable: {0}")]
    ContentUnavailable(String),

    /// Watermark stamping failed (malformed master, encode failure)
    #[error("Stamping failed: {0}")]
    Stamp(String),

    /// Grant store failure (lock poisoning, backend I/O)
    #[error("Grant store error: {0}")]
    Store(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GateError {
    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            GateError::Configuration(_) => 500,
            GateError::InvalidRequest(_) => 400,
            GateError::AccessDenied => 403,
            GateError::ProviderError { .. } => 502,
            GateError::NetworkError(_) => 503,
            GateError::WebhookVerificationFailed(_) => 400,
            GateError::WebhookParseError(_) => 400,
            GateError::CheckoutCreationFailed(_) => 500,
            GateError::ContentUnavailable(_) => 500,
            GateError::Stamp(_) => 500,
            GateError::Store(_) => 500,
            GateError::Serialization(_) => 500,
            GateError::Internal(_) => 500,
        }
    }

    /// True for errors the buyer caused (4xx), false for server-side faults
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

/// Result type alias for gate operations
pub type GateResult<T> = Result<T, GateError>;
