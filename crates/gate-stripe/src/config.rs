//! # Stripe Configuration
//!
//! Configuration management for the Stripe integration.
//! All secrets are loaded from environment variables.

use gate_core::GateError;
use std::env;

/// Stripe API configuration
#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// Secret API key (sk_test_... or sk_live_...)
    pub secret_key: String,

    /// Price ID of the document being sold (price_...)
    pub price_id: String,

    /// Webhook signing secret (whsec_...)
    pub webhook_secret: String,

    /// API base URL (for testing/mocking)
    pub api_base_url: String,

    /// API version
    pub api_version: String,
}

impl StripeConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `STRIPE_SECRET_KEY`
    /// - `STRIPE_PRICE_ID`
    /// - `STRIPE_WEBHOOK_SECRET`
    pub fn from_env() -> Result<Self, GateError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let secret_key = env::var("STRIPE_SECRET_KEY")
            .map_err(|_| GateError::Configuration("STRIPE_SECRET_KEY not set".to_string()))?;

        let price_id = env::var("STRIPE_PRICE_ID")
            .map_err(|_| GateError::Configuration("STRIPE_PRICE_ID not set".to_string()))?;

        let webhook_secret = env::var("STRIPE_WEBHOOK_SECRET")
            .map_err(|_| GateError::Configuration("STRIPE_WEBHOOK_SECRET not set".to_string()))?;

        // Validate key formats
        if !secret_key.starts_with("sk_test_") && !secret_key.starts_with("sk_live_") {
            return Err(GateError::Configuration(
                "STRIPE_SECRET_KEY must start with sk_test_ or sk_live_".to_string(),
            ));
        }

        if !price_id.starts_with("price_") {
            return Err(GateError::Configuration(
                "STRIPE_PRICE_ID must start with price_".to_string(),
            ));
        }

        if !webhook_secret.starts_with("whsec_") {
            return Err(GateError::Configuration(
                "STRIPE_WEBHOOK_SECRET must start with whsec_".to_string(),
            ));
        }

        Ok(Self {
            secret_key,
            price_id,
            webhook_secret,
            api_base_url: "https://api.stripe.com".to_string(),
            api_version: "2024-12-18.acacia".to_string(),
        })
    }

    /// Create config with explicit values (for testing)
    pub fn new(
        secret_key: impl Into<String>,
        price_id: impl Into<String>,
        webhook_secret: impl Into<String>,
    ) -> Self {
        Self {
            secret_key: secret_key.into(),
            price_id: price_id.into(),
            webhook_secret: webhook_secret.into(),
            api_base_url: "https://api.stripe.com".to_string(),
            api_version: "2024-12-18.acacia".to_string(),
        }
    }

    /// Check if using test keys
    pub fn is_test_mode(&self) -> bool {
        self.secret_key.starts_with("sk_test_")
    }

    /// Get authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.secret_key)
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}
