//! # docgate
//!
//! Sell one document, gate its downloads.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export STRIPE_SECRET_KEY=sk_test_...
//! export STRIPE_PRICE_ID=price_...
//! export STRIPE_WEBHOOK_SECRET=whsec_...
//!
//! # Run the server
//! docgate
//! ```

use gate_api::{routes, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Initialize application state
    let state = AppState::new()?;

    let addr = state.config.socket_addr();
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Payment provider: {}", state.gateway.provider_name());
    info!(
        "Grant policy: ttl={}h, downloads={}",
        state.config.policy.ttl_hours, state.config.policy.max_downloads
    );
    info!("Master content: {}", state.config.content_path.display());

    if !state.config.content_path.exists() {
        tracing::warn!(
            "Master content not found at {} - downloads will fail until it exists",
            state.config.content_path.display()
        );
    }

    // Create router
    let app = routes::create_router(state);

    // Start server
    info!("docgate starting on http://{}", addr);

    if !is_prod {
        info!("Checkout: POST http://{}/create-checkout-session", addr);
        info!("Webhook:  POST http://{}/webhook", addr);
        info!("Health:   GET  http://{}/healthz", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
