//! # gate-stripe
//!
//! Stripe payment gateway for docgate-rs.
//!
//! Implements the `gate_core::PaymentGateway` seam with two operations:
//!
//! 1. **Checkout** - create a hosted Checkout Session for the one configured
//!    price and hand back the redirect URL.
//! 2. **Webhook verification** - HMAC-SHA256 over the raw body bytes against
//!    the endpoint signing secret, then event parsing.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gate_stripe::StripeGateway;
//! use gate_core::PaymentGateway;
//!
//! let gateway = StripeGateway::from_env()?;
//!
//! let session = gateway
//!     .create_checkout_session(
//!         "https://example.com/success.html",
//!         "https://example.com/cancel.html",
//!     )
//!     .await?;
//!
//! // Redirect the buyer to session.url
//! ```

pub mod checkout;
pub mod config;
pub mod webhook;

// Re-exports
pub use checkout::StripeGateway;
pub use config::StripeConfig;
pub use webhook::{sign_payload, verify_and_parse};
