//! # Payment Gateway Trait
//!
//! Seam between the HTTP layer and the external payment provider. The
//! provider is only ever asked two things: open a hosted checkout session,
//! and verify an inbound webhook. Both are modeled as explicit async calls
//! with a bounded timeout inside the implementation; neither retries.

use crate::error::GateResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A hosted checkout session created by the payment provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider's session ID
    pub session_id: String,

    /// URL to redirect the buyer to for payment
    pub url: String,

    /// When the session expires, if the provider reports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// What a verified webhook event means to the gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseEventKind {
    /// A checkout session finished with payment collected
    CheckoutCompleted {
        /// Provider's session id; doubles as the order id on the grant
        session_id: String,
        /// Buyer email if the provider captured one
        customer_email: Option<String>,
    },
    /// Any other event type; acknowledged but otherwise ignored
    Other(String),
}

/// A webhook event whose signature has been verified
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseEvent {
    /// Event ID from the provider
    pub event_id: String,

    /// What happened
    pub kind: PurchaseEventKind,

    /// Provider-reported event timestamp
    pub timestamp: DateTime<Utc>,
}

impl PurchaseEvent {
    /// True for events that should mint a download grant
    pub fn is_completed_checkout(&self) -> bool {
        matches!(self.kind, PurchaseEventKind::CheckoutCompleted { .. })
    }
}

/// Core trait for the payment provider integration.
///
/// Verification MUST run over the raw, unparsed body bytes. An
/// implementation that parses and re-serializes before verifying is wrong.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout session for the configured product.
    ///
    /// # Arguments
    /// * `success_url` - redirect after successful payment
    /// * `cancel_url` - redirect if the buyer cancels
    async fn create_checkout_session(
        &self,
        success_url: &str,
        cancel_url: &str,
    ) -> GateResult<CheckoutSession>;

    /// Verify a webhook signature and parse the event.
    ///
    /// # Arguments
    /// * `payload` - raw webhook body bytes, exactly as received
    /// * `signature` - signature header from the request
    async fn verify_webhook(&self, payload: &[u8], signature: &str) -> GateResult<PurchaseEvent>;

    /// Provider name, for logging
    fn provider_name(&self) -> &'static str;
}
