//! # Application State
//!
//! Shared state for the Axum application: the payment gateway, the grant
//! store, and configuration.

use gate_core::{GrantPolicy, GrantStore, MemoryGrantStore, PaymentGateway};
use gate_stripe::StripeGateway;
use std::path::PathBuf;
use std::sync::Arc;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Base URL used to build checkout redirect URLs
    pub base_url: String,
    /// Environment (development, staging, production)
    pub environment: String,
    /// TTL and quota for freshly minted grants
    pub policy: GrantPolicy,
    /// Master document path; never exposed to any external caller
    pub content_path: PathBuf,
    /// Static assets directory (storefront, success/cancel pages)
    pub public_dir: PathBuf,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let ttl_hours = std::env::var("TOKEN_TTL_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(24);
        let max_downloads = std::env::var("MAX_DOWNLOADS_PER_TOKEN")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1);

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            base_url: std::env::var("BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            policy: GrantPolicy::new(ttl_hours, max_downloads),
            content_path: std::env::var("CONTENT_PATH")
                .unwrap_or_else(|_| "content/Infinite_IQ_Master.pdf".to_string())
                .into(),
            public_dir: std::env::var("PUBLIC_DIR")
                .unwrap_or_else(|_| "public".to_string())
                .into(),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> std::net::SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("Invalid socket address")
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Redirect target after a successful payment
    pub fn success_url(&self) -> String {
        format!("{}/success.html", self.base_url)
    }

    /// Redirect target when the buyer cancels
    pub fn cancel_url(&self) -> String {
        format!("{}/cancel.html", self.base_url)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Payment provider seam
    pub gateway: Arc<dyn PaymentGateway>,
    /// Token -> grant store
    pub grants: Arc<dyn GrantStore>,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create an AppState wired to Stripe and an in-memory grant store
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();

        let gateway = StripeGateway::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize Stripe: {}", e))?;

        Ok(Self {
            gateway: Arc::new(gateway),
            grants: Arc::new(MemoryGrantStore::new()),
            config,
        })
    }

    /// Assemble from explicit parts (tests, alternative backends)
    pub fn with_parts(
        gateway: Arc<dyn PaymentGateway>,
        grants: Arc<dyn GrantStore>,
        config: AppConfig,
    ) -> Self {
        Self {
            gateway,
            grants,
            config,
        }
    }
}
