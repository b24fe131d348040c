//! # gate-core
//!
//! Core types and traits for the docgate-rs download-gate engine.
//!
//! This crate provides:
//! - `AccessGrant`, `GrantPolicy`, and `DownloadToken` for purchase entitlements
//! - `GrantStore` trait and `MemoryGrantStore` for the token lifecycle
//! - `PaymentGateway` trait for the hosted-checkout provider seam
//! - `GateError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use gate_core::{AccessGrant, DownloadToken, GrantPolicy, GrantStore, MemoryGrantStore};
//!
//! let store = MemoryGrantStore::new();
//! let token = DownloadToken::generate();
//!
//! // Mint on a verified completed checkout
//! let grant = AccessGrant::mint(Some("buyer@example.com".into()), "cs_123", &GrantPolicy::default());
//! store.put(token.clone(), grant)?;
//!
//! // Validate without spending, stamp the document, then consume
//! if let Some(grant) = store.validate(&token)? {
//!     // ... stamp with grant.email / grant.order_id ...
//!     store.consume(&token)?;
//! }
//! ```

pub mod error;
pub mod gateway;
pub mod grant;
pub mod store;
pub mod token;

// Re-exports for convenience
pub use error::{GateError, GateResult};
pub use gateway::{CheckoutSession, PaymentGateway, PurchaseEvent, PurchaseEventKind};
pub use grant::{AccessGrant, GrantPolicy, UNKNOWN_BUYER};
pub use store::{GrantStore, MemoryGrantStore};
pub use token::DownloadToken;
