//! # Stripe Webhook Verification
//!
//! Signature verification and event parsing for inbound Stripe webhooks.
//!
//! Verification runs over the raw body bytes exactly as received. The signed
//! payload is `"{timestamp}.{body}"`, HMAC-SHA256 under the endpoint's
//! signing secret, carried in the `stripe-signature` header as
//! `t=<ts>,v1=<hex>[,v1=<hex>...]`.

use chrono::{DateTime, Utc};
use gate_core::{GateError, GateResult, PurchaseEvent, PurchaseEventKind};
use serde::Deserialize;
use tracing::debug;

/// Webhook timestamps older or newer than this are rejected
const TIMESTAMP_TOLERANCE_SECS: i64 = 300;

/// Verify a webhook signature and parse the event payload.
///
/// Parsing happens only after the signature over the raw bytes checks out.
pub fn verify_and_parse(
    secret: &str,
    payload: &[u8],
    signature: &str,
) -> GateResult<PurchaseEvent> {
    let sig_parts = parse_signature_header(signature)?;

    let now = Utc::now().timestamp();
    if (now - sig_parts.timestamp).abs() > TIMESTAMP_TOLERANCE_SECS {
        return Err(GateError::WebhookVerificationFailed(
            "Timestamp outside tolerance".to_string(),
        ));
    }

    let signed_payload = format!(
        "{}.{}",
        sig_parts.timestamp,
        String::from_utf8_lossy(payload)
    );
    let expected_sig = compute_hmac_sha256(secret, &signed_payload);

    let valid = sig_parts
        .signatures
        .iter()
        .any(|sig| constant_time_compare(sig, &expected_sig));

    if !valid {
        return Err(GateError::WebhookVerificationFailed(
            "Signature mismatch".to_string(),
        ));
    }

    let event: StripeWebhookEvent = serde_json::from_slice(payload)
        .map_err(|e| GateError::WebhookParseError(format!("Failed to parse webhook: {}", e)))?;

    debug!("Verified Stripe webhook: type={}", event.event_type);

    let kind = match event.event_type.as_str() {
        "checkout.session.completed" => {
            let session_id = event
                .data
                .object
                .get("id")
                .and_then(|v| v.as_str())
                .map(String::from)
                .ok_or_else(|| {
                    GateError::WebhookParseError("Missing session id".to_string())
                })?;

            let customer_email = event
                .data
                .object
                .get("customer_details")
                .and_then(|cd| cd.get("email"))
                .and_then(|v| v.as_str())
                .map(String::from);

            PurchaseEventKind::CheckoutCompleted {
                session_id,
                customer_email,
            }
        }
        other => PurchaseEventKind::Other(other.to_string()),
    };

    Ok(PurchaseEvent {
        event_id: event.id,
        kind,
        timestamp: DateTime::from_timestamp(event.created, 0).unwrap_or_else(Utc::now),
    })
}

/// Build a `stripe-signature` header value for a payload.
///
/// Used by tests and local tooling; the server itself only verifies.
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
    format!(
        "t={},v1={}",
        timestamp,
        compute_hmac_sha256(secret, &signed_payload)
    )
}

#[derive(Debug, Deserialize)]
struct StripeWebhookEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    created: i64,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: serde_json::Map<String, serde_json::Value>,
}

struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<String>,
}

fn parse_signature_header(header: &str) -> GateResult<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let kv: Vec<&str> = part.split('=').collect();
        if kv.len() != 2 {
            continue;
        }
        match kv[0] {
            "t" => {
                timestamp = kv[1].parse().ok();
            }
            "v1" => {
                signatures.push(kv[1].to_string());
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        GateError::WebhookVerificationFailed("Missing timestamp in signature".to_string())
    })?;

    if signatures.is_empty() {
        return Err(GateError::WebhookVerificationFailed(
            "No v1 signature found".to_string(),
        ));
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

fn compute_hmac_sha256(secret: &str, message: &str) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(message.as_bytes());
    let result = mac.finalize();
    hex::encode(result.into_bytes())
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    fn completed_payload() -> Vec<u8> {
        serde_json::json!({
            "id": "evt_test_1",
            "type": "checkout.session.completed",
            "created": Utc::now().timestamp(),
            "data": {
                "object": {
                    "id": "cs_test_123",
                    "customer_details": { "email": "buyer@example.com" },
                    "payment_status": "paid"
                }
            }
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn test_verify_and_parse_completed_checkout() {
        let payload = completed_payload();
        let header = sign_payload(SECRET, Utc::now().timestamp(), &payload);

        let event = verify_and_parse(SECRET, &payload, &header).unwrap();

        assert_eq!(event.event_id, "evt_test_1");
        match event.kind {
            PurchaseEventKind::CheckoutCompleted {
                session_id,
                customer_email,
            } => {
                assert_eq!(session_id, "cs_test_123");
                assert_eq!(customer_email.as_deref(), Some("buyer@example.com"));
            }
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[test]
    fn test_missing_email_is_none() {
        let payload = serde_json::json!({
            "id": "evt_test_2",
            "type": "checkout.session.completed",
            "created": Utc::now().timestamp(),
            "data": { "object": { "id": "cs_test_456" } }
        })
        .to_string()
        .into_bytes();
        let header = sign_payload(SECRET, Utc::now().timestamp(), &payload);

        let event = verify_and_parse(SECRET, &payload, &header).unwrap();
        match event.kind {
            PurchaseEventKind::CheckoutCompleted { customer_email, .. } => {
                assert!(customer_email.is_none());
            }
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[test]
    fn test_other_event_types_pass_through() {
        let payload = serde_json::json!({
            "id": "evt_test_3",
            "type": "charge.refunded",
            "created": Utc::now().timestamp(),
            "data": { "object": { "id": "ch_1" } }
        })
        .to_string()
        .into_bytes();
        let header = sign_payload(SECRET, Utc::now().timestamp(), &payload);

        let event = verify_and_parse(SECRET, &payload, &header).unwrap();
        assert_eq!(
            event.kind,
            PurchaseEventKind::Other("charge.refunded".to_string())
        );
    }

    #[test]
    fn test_tampered_signature_is_rejected() {
        let payload = completed_payload();
        let mut header = sign_payload(SECRET, Utc::now().timestamp(), &payload);
        // Flip the last hex digit.
        let flipped = if header.ends_with('0') { '1' } else { '0' };
        header.pop();
        header.push(flipped);

        let err = verify_and_parse(SECRET, &payload, &header).unwrap_err();
        assert!(matches!(err, GateError::WebhookVerificationFailed(_)));
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let payload = completed_payload();
        let header = sign_payload(SECRET, Utc::now().timestamp(), &payload);

        let tampered = String::from_utf8(payload)
            .unwrap()
            .replace("buyer@example.com", "thief@example.com");

        let err = verify_and_parse(SECRET, tampered.as_bytes(), &header).unwrap_err();
        assert!(matches!(err, GateError::WebhookVerificationFailed(_)));
    }

    #[test]
    fn test_stale_timestamp_is_rejected() {
        let payload = completed_payload();
        let stale = Utc::now().timestamp() - TIMESTAMP_TOLERANCE_SECS - 10;
        let header = sign_payload(SECRET, stale, &payload);

        let err = verify_and_parse(SECRET, &payload, &header).unwrap_err();
        assert!(matches!(err, GateError::WebhookVerificationFailed(_)));
    }

    #[test]
    fn test_parse_signature_header() {
        let header = "t=1234567890,v1=abc123,v1=def456";
        let parsed = parse_signature_header(header).unwrap();

        assert_eq!(parsed.timestamp, 1234567890);
        assert_eq!(parsed.signatures.len(), 2);
        assert_eq!(parsed.signatures[0], "abc123");
    }

    #[test]
    fn test_signature_header_without_timestamp() {
        assert!(parse_signature_header("v1=abc123").is_err());
        assert!(parse_signature_header("t=notanum,v1=abc").is_err());
        assert!(parse_signature_header("t=123").is_err());
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc123", "abc123"));
        assert!(!constant_time_compare("abc123", "abc124"));
        assert!(!constant_time_compare("abc", "abcd"));
    }
}
