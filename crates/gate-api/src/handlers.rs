//! # Request Handlers
//!
//! Axum request handlers for the download gate: checkout initiation, the
//! purchase webhook, token-gated downloads, and the liveness probe.
//!
//! Denials never say why. A missing token, an expired grant, and an
//! exhausted quota all produce the same 403 body, so the endpoint cannot be
//! used as a token-enumeration oracle. Server-side faults (missing master,
//! stamping failure) are 500s with a separate generic body; detail goes to
//! the logs only.

use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use gate_core::{AccessGrant, DownloadToken, PurchaseEventKind};
use gate_stamp::{stamp_document, StampMeta};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

/// Single denial body for every access failure mode
pub const DENIAL_MESSAGE: &str = "Invalid or expired link.";

/// Single body for server-side download faults
pub const SERVER_ERROR_MESSAGE: &str = "Download unavailable.";

/// Fixed attachment name presented to the buyer
pub const DOWNLOAD_FILENAME: &str = "Infinite_IQ.pdf";

/// Create checkout response
#[derive(Debug, Serialize)]
pub struct CreateCheckoutResponse {
    /// Hosted checkout URL (redirect the buyer here)
    pub url: String,
}

fn denial() -> Response {
    (StatusCode::FORBIDDEN, DENIAL_MESSAGE).into_response()
}

fn server_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR_MESSAGE).into_response()
}

/// Liveness probe, no side effects
pub async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}

/// Create a hosted checkout session for the document
#[instrument(skip(state))]
pub async fn create_checkout_session(
    State(state): State<AppState>,
) -> Result<Json<CreateCheckoutResponse>, (StatusCode, Json<serde_json::Value>)> {
    let session = state
        .gateway
        .create_checkout_session(&state.config.success_url(), &state.config.cancel_url())
        .await
        .map_err(|e| {
            error!("Failed to create checkout session: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "Unable to create session" })),
            )
        })?;

    info!("Created checkout session: {}", session.session_id);

    Ok(Json(CreateCheckoutResponse { url: session.url }))
}

/// Handle the payment provider webhook: verify the signature over the raw
/// body, mint a grant on completed checkout, acknowledge everything else.
///
/// A duplicate delivery of the same completed event mints a second,
/// independent token; events are not deduplicated by order id.
#[instrument(skip(state, headers, body))]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            warn!("Webhook without stripe-signature header");
            StatusCode::BAD_REQUEST
        })?;

    // The body stays unparsed until the signature over these exact bytes
    // has been verified.
    let event = state
        .gateway
        .verify_webhook(&body, signature)
        .await
        .map_err(|e| {
            warn!("Webhook rejected: {}", e);
            StatusCode::BAD_REQUEST
        })?;

    match event.kind {
        PurchaseEventKind::CheckoutCompleted {
            session_id,
            customer_email,
        } => {
            let token = DownloadToken::generate();
            let grant = AccessGrant::mint(customer_email, session_id, &state.config.policy);

            info!(
                "Minted download token {} for {} (order {}, expires {})",
                token, grant.email, grant.order_id, grant.expire_at
            );

            // Delivery of the link to the buyer is out of band
            // (e.g. a follow-up email containing {BASE_URL}/download/{token}).
            state.grants.put(token, grant).map_err(|e| {
                error!("Failed to store grant: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            })?;
        }
        PurchaseEventKind::Other(ref kind) => {
            info!("Ignoring webhook event type: {}", kind);
        }
    }

    // Verified events are always acknowledged so the provider stops
    // redelivering them.
    Ok(Json(serde_json::json!({ "received": true })))
}

/// Stream a per-purchase watermarked copy of the master document.
///
/// Lookup -> liveness check -> load master -> stamp -> consume -> stream.
/// The quota is spent only after stamping succeeds, and consumption
/// re-checks the grant atomically, so neither a stamping failure nor a
/// concurrent request can burn or exceed the quota.
#[instrument(skip(state), fields(token = %token))]
pub async fn download(State(state): State<AppState>, Path(token): Path<String>) -> Response {
    let token = DownloadToken::from_string(token);

    let grant = match state.grants.validate(&token) {
        Ok(Some(grant)) => grant,
        Ok(None) => return denial(),
        Err(e) => {
            error!("Grant store failure: {}", e);
            return server_error();
        }
    };

    let master = match tokio::fs::read(&state.config.content_path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(
                "Master content missing at {}: {}",
                state.config.content_path.display(),
                e
            );
            return server_error();
        }
    };

    let meta = StampMeta::new(grant.email.clone(), grant.order_id.clone(), Utc::now());
    let stamped = match stamp_document(&master, &meta) {
        Ok(bytes) => bytes,
        Err(e) => {
            // Quota untouched: the grant is only consumed after a
            // successful stamp.
            error!("Stamping failed for order {}: {}", grant.order_id, e);
            return server_error();
        }
    };

    match state.grants.consume(&token) {
        Ok(Some(remaining)) => {
            info!(
                "Served download for order {} ({} use(s) left)",
                grant.order_id, remaining
            );
        }
        Ok(None) => {
            // The grant disappeared between validation and consumption
            // (concurrent exhaustion or expiry). Deny rather than overspend.
            warn!("Grant vanished before consumption");
            return denial();
        }
        Err(e) => {
            error!("Grant store failure: {}", e);
            return server_error();
        }
    }

    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", DOWNLOAD_FILENAME),
            ),
        ],
        stamped,
    )
        .into_response()
}
