//! # Routes
//!
//! Axum router configuration for the download gate.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - POST `/create-checkout-session` - open a hosted checkout session
/// - POST `/webhook` - payment provider webhook (raw body, signed)
/// - GET  `/download/{token}` - token-gated watermarked download
/// - GET  `/healthz` - liveness probe
///
/// Everything else falls through to static storefront assets served from
/// the configured public directory.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let assets = ServeDir::new(&state.config.public_dir);

    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route(
            "/create-checkout-session",
            post(handlers::create_checkout_session),
        )
        // Raw-body route: the webhook handler consumes the bytes unparsed
        // for signature verification.
        .route("/webhook", post(handlers::webhook))
        .route("/download/{token}", get(handlers::download))
        .fallback_service(assets)
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}
