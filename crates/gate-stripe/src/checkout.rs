//! # Stripe Checkout Sessions
//!
//! Creates hosted Checkout Sessions for the single configured price and
//! verifies inbound webhook events. This is the only payment surface
//! docgate exposes.

use crate::config::StripeConfig;
use crate::webhook;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use gate_core::{CheckoutSession, GateError, GateResult, PaymentGateway, PurchaseEvent};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info, instrument};

/// Stripe payment gateway
///
/// Uses Stripe's hosted checkout page; card data never touches this server.
pub struct StripeGateway {
    config: StripeConfig,
    client: Client,
}

impl StripeGateway {
    /// Create a new Stripe gateway.
    ///
    /// Every provider call fails after a bounded wait rather than hanging.
    pub fn new(config: StripeConfig) -> GateResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| GateError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> GateResult<Self> {
        let config = StripeConfig::from_env()?;
        Self::new(config)
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self, success_url, cancel_url))]
    async fn create_checkout_session(
        &self,
        success_url: &str,
        cancel_url: &str,
    ) -> GateResult<CheckoutSession> {
        // One fixed product: a single line item referencing the configured
        // price, one-time payment mode.
        let form_params: Vec<(&str, String)> = vec![
            ("mode", "payment".to_string()),
            ("line_items[0][price]", self.config.price_id.clone()),
            ("line_items[0][quantity]", "1".to_string()),
            ("success_url", success_url.to_string()),
            ("cancel_url", cancel_url.to_string()),
            ("customer_creation", "if_required".to_string()),
        ];

        let url = format!("{}/v1/checkout/sessions", self.config.api_base_url);

        debug!("Creating Stripe checkout session for {}", self.config.price_id);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .form(&form_params)
            .send()
            .await
            .map_err(|e| GateError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GateError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            error!("Stripe API error: status={}, body={}", status, body);

            if let Ok(error_response) = serde_json::from_str::<StripeErrorResponse>(&body) {
                return Err(GateError::ProviderError {
                    provider: "stripe".to_string(),
                    message: error_response.error.message,
                });
            }

            return Err(GateError::ProviderError {
                provider: "stripe".to_string(),
                message: format!("HTTP {}: {}", status, body),
            });
        }

        let session: StripeCheckoutSessionResponse = serde_json::from_str(&body)
            .map_err(|e| GateError::Serialization(format!("Stripe response: {}", e)))?;

        info!("Created Stripe checkout session: id={}", session.id);

        let expires_at = session
            .expires_at
            .map(|ts| DateTime::from_timestamp(ts, 0).unwrap_or(Utc::now() + Duration::hours(24)));

        Ok(CheckoutSession {
            session_id: session.id,
            url: session.url,
            expires_at,
        })
    }

    #[instrument(skip(self, payload, signature))]
    async fn verify_webhook(&self, payload: &[u8], signature: &str) -> GateResult<PurchaseEvent> {
        webhook::verify_and_parse(&self.config.webhook_secret, payload, signature)
    }

    fn provider_name(&self) -> &'static str {
        "stripe"
    }
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeCheckoutSessionResponse {
    id: String,
    url: String,
    #[serde(default)]
    expires_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    message: String,
}
