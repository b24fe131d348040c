//! # Access Grants
//!
//! The record of purchase entitlement minted for each completed checkout:
//! buyer identity for attribution, the provider's order id, an absolute
//! expiry instant, and a download quota.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Buyer identity used when the payment provider did not supply an email
pub const UNKNOWN_BUYER: &str = "unknown@user";

/// Minting policy for new grants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantPolicy {
    /// Time-to-live in hours for a freshly minted grant
    pub ttl_hours: i64,

    /// Downloads permitted per token
    pub max_downloads: u32,
}

impl GrantPolicy {
    pub fn new(ttl_hours: i64, max_downloads: u32) -> Self {
        Self {
            ttl_hours,
            max_downloads,
        }
    }

    /// Grant lifetime as a chrono duration
    pub fn ttl(&self) -> Duration {
        Duration::hours(self.ttl_hours)
    }
}

impl Default for GrantPolicy {
    fn default() -> Self {
        Self {
            ttl_hours: 24,
            max_downloads: 1,
        }
    }
}

/// A purchase entitlement, keyed in the store by a [`DownloadToken`]
///
/// [`DownloadToken`]: crate::token::DownloadToken
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrant {
    /// Buyer email, for watermark attribution
    pub email: String,

    /// Provider's session/order identifier, unique per completed purchase
    pub order_id: String,

    /// Invalid strictly at or after this instant
    pub expire_at: DateTime<Utc>,

    /// Downloads still permitted
    pub remaining: u32,
}

impl AccessGrant {
    /// Mint a fresh grant under the given policy.
    ///
    /// A missing buyer email falls back to [`UNKNOWN_BUYER`].
    pub fn mint(email: Option<String>, order_id: impl Into<String>, policy: &GrantPolicy) -> Self {
        Self {
            email: email.unwrap_or_else(|| UNKNOWN_BUYER.to_string()),
            order_id: order_id.into(),
            expire_at: Utc::now() + policy.ttl(),
            remaining: policy.max_downloads,
        }
    }

    /// True once the expiry instant has been reached
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expire_at
    }

    /// True once the download quota is used up
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Live grants have quota left and an expiry still in the future
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired(now) && !self.is_exhausted()
    }
}
