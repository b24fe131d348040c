//! # gate-api
//!
//! HTTP API layer for docgate-rs.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - Checkout initiation and purchase webhook endpoints
//! - The token-gated, watermarked download endpoint
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | POST | `/create-checkout-session` | Create hosted checkout session |
//! | POST | `/webhook` | Payment provider webhook |
//! | GET | `/download/{token}` | Watermarked download |
//! | GET | `/healthz` | Liveness probe |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
