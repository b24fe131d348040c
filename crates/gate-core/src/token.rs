//! # Download Tokens
//!
//! Opaque bearer credentials for one purchase's download rights.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An unguessable download token (32 lowercase hex characters).
///
/// Tokens are generated fresh per completed purchase and are never derived
/// from the order id or buyer email.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DownloadToken(String);

impl DownloadToken {
    /// Generate a fresh token
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Wrap a token received from a caller (e.g. a URL path parameter).
    ///
    /// No validation happens here: an arbitrary string simply never matches
    /// a stored grant.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the token as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DownloadToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DownloadToken {
    fn from(s: &str) -> Self {
        Self::from_string(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_shape() {
        let token = DownloadToken::generate();
        assert_eq!(token.as_str().len(), 32);
        assert!(token.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!token.as_str().contains('-'));
    }

    #[test]
    fn test_tokens_are_unique() {
        let a = DownloadToken::generate();
        let b = DownloadToken::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_from_string_roundtrip() {
        let token = DownloadToken::from_string("abc123");
        assert_eq!(token.as_str(), "abc123");
        assert_eq!(token.to_string(), "abc123");
    }
}
