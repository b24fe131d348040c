//! # Grant Store
//!
//! Process-lifetime mapping from download token to access grant.
//!
//! The store is behind an object-safe trait so a persistent backend can
//! replace the in-memory map without touching handler logic. Expiry is lazy:
//! a dead grant is evicted when it is next observed, never by a background
//! sweep.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use crate::error::{GateError, GateResult};
use crate::grant::AccessGrant;
use crate::token::DownloadToken;

/// Storage abstraction for access grants.
///
/// `validate` and `consume` are the two halves of the download state machine.
/// Validation never spends quota, so a failure later in the request (a
/// stamping error, a missing master file) leaves the grant untouched.
/// Consumption re-checks the grant under the same lock that mutates it, so a
/// token can never be spent more times than its quota even under concurrent
/// requests.
pub trait GrantStore: Send + Sync {
    /// Insert or unconditionally overwrite a grant
    fn put(&self, token: DownloadToken, grant: AccessGrant) -> GateResult<()>;

    /// Fetch a grant without any liveness check or eviction
    fn get(&self, token: &DownloadToken) -> GateResult<Option<AccessGrant>>;

    /// Remove a grant
    fn delete(&self, token: &DownloadToken) -> GateResult<()>;

    /// Fetch a live grant, evicting it if it is expired or exhausted.
    ///
    /// Returns `None` for absent and dead grants alike.
    fn validate(&self, token: &DownloadToken) -> GateResult<Option<AccessGrant>>;

    /// Atomically spend one download from a live grant.
    ///
    /// Decrements the remaining quota and deletes the grant when it reaches
    /// zero. Returns the quota left after the decrement, or `None` if the
    /// grant was absent or dead (dead grants are evicted on the way out).
    fn consume(&self, token: &DownloadToken) -> GateResult<Option<u32>>;

    /// Number of grants currently stored, live or not
    fn len(&self) -> GateResult<usize>;
}

/// In-memory grant store
///
/// The read-check-mutate sequences in `validate` and `consume` each run under
/// a single write lock, which is the serialization the download quota
/// invariant requires.
pub struct MemoryGrantStore {
    grants: RwLock<HashMap<DownloadToken, AccessGrant>>,
}

impl MemoryGrantStore {
    pub fn new() -> Self {
        Self {
            grants: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryGrantStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned(_: impl std::fmt::Debug) -> GateError {
    GateError::Store("grant store lock poisoned".to_string())
}

impl GrantStore for MemoryGrantStore {
    fn put(&self, token: DownloadToken, grant: AccessGrant) -> GateResult<()> {
        let mut grants = self.grants.write().map_err(poisoned)?;
        grants.insert(token, grant);
        Ok(())
    }

    fn get(&self, token: &DownloadToken) -> GateResult<Option<AccessGrant>> {
        let grants = self.grants.read().map_err(poisoned)?;
        Ok(grants.get(token).cloned())
    }

    fn delete(&self, token: &DownloadToken) -> GateResult<()> {
        let mut grants = self.grants.write().map_err(poisoned)?;
        grants.remove(token);
        Ok(())
    }

    fn validate(&self, token: &DownloadToken) -> GateResult<Option<AccessGrant>> {
        let mut grants = self.grants.write().map_err(poisoned)?;

        let live = match grants.get(token) {
            Some(grant) => grant.is_live(Utc::now()),
            None => return Ok(None),
        };

        if !live {
            grants.remove(token);
            return Ok(None);
        }

        Ok(grants.get(token).cloned())
    }

    fn consume(&self, token: &DownloadToken) -> GateResult<Option<u32>> {
        let mut grants = self.grants.write().map_err(poisoned)?;

        let Some(grant) = grants.get_mut(token) else {
            return Ok(None);
        };

        if !grant.is_live(Utc::now()) {
            grants.remove(token);
            return Ok(None);
        }

        grant.remaining -= 1;
        let remaining = grant.remaining;

        if remaining == 0 {
            grants.remove(token);
        }

        Ok(Some(remaining))
    }

    fn len(&self) -> GateResult<usize> {
        let grants = self.grants.read().map_err(poisoned)?;
        Ok(grants.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grant::GrantPolicy;
    use chrono::Duration;

    fn grant(remaining: u32) -> AccessGrant {
        AccessGrant {
            email: "a@b.com".to_string(),
            order_id: "sess_1".to_string(),
            expire_at: Utc::now() + Duration::hours(1),
            remaining,
        }
    }

    #[test]
    fn test_put_get_delete() {
        let store = MemoryGrantStore::new();
        let token = DownloadToken::generate();

        store.put(token.clone(), grant(1)).unwrap();
        assert_eq!(store.len().unwrap(), 1);
        assert!(store.get(&token).unwrap().is_some());

        store.delete(&token).unwrap();
        assert!(store.get(&token).unwrap().is_none());
        assert_eq!(store.len().unwrap(), 0);
    }

    #[test]
    fn test_put_overwrites_unconditionally() {
        let store = MemoryGrantStore::new();
        let token = DownloadToken::generate();

        store.put(token.clone(), grant(1)).unwrap();
        store.put(token.clone(), grant(5)).unwrap();

        assert_eq!(store.get(&token).unwrap().unwrap().remaining, 5);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_validate_passes_live_grant_without_spending() {
        let store = MemoryGrantStore::new();
        let token = DownloadToken::generate();
        store.put(token.clone(), grant(2)).unwrap();

        let seen = store.validate(&token).unwrap().unwrap();
        assert_eq!(seen.remaining, 2);
        // Still present, untouched.
        assert_eq!(store.get(&token).unwrap().unwrap().remaining, 2);
    }

    #[test]
    fn test_validate_evicts_expired_grant() {
        let store = MemoryGrantStore::new();
        let token = DownloadToken::generate();
        let mut expired = grant(3);
        expired.expire_at = Utc::now() - Duration::seconds(1);
        store.put(token.clone(), expired).unwrap();

        assert!(store.validate(&token).unwrap().is_none());
        // Evicted regardless of remaining quota.
        assert!(store.get(&token).unwrap().is_none());
    }

    #[test]
    fn test_validate_evicts_exhausted_grant() {
        let store = MemoryGrantStore::new();
        let token = DownloadToken::generate();
        store.put(token.clone(), grant(0)).unwrap();

        assert!(store.validate(&token).unwrap().is_none());
        assert!(store.get(&token).unwrap().is_none());
    }

    #[test]
    fn test_consume_decrements_then_deletes_on_zero() {
        let store = MemoryGrantStore::new();
        let token = DownloadToken::generate();
        store.put(token.clone(), grant(2)).unwrap();

        assert_eq!(store.consume(&token).unwrap(), Some(1));
        assert_eq!(store.get(&token).unwrap().unwrap().remaining, 1);

        assert_eq!(store.consume(&token).unwrap(), Some(0));
        // Exhaustion evicts unconditionally.
        assert!(store.get(&token).unwrap().is_none());

        assert_eq!(store.consume(&token).unwrap(), None);
    }

    #[test]
    fn test_consume_rejects_expired_grant() {
        let store = MemoryGrantStore::new();
        let token = DownloadToken::generate();
        let mut expired = grant(1);
        expired.expire_at = Utc::now() - Duration::seconds(1);
        store.put(token.clone(), expired).unwrap();

        assert_eq!(store.consume(&token).unwrap(), None);
        assert!(store.get(&token).unwrap().is_none());
    }

    #[test]
    fn test_unknown_token_changes_nothing() {
        let store = MemoryGrantStore::new();
        store
            .put(DownloadToken::generate(), grant(1))
            .unwrap();

        let bogus = DownloadToken::from_string("bogus");
        assert!(store.validate(&bogus).unwrap().is_none());
        assert_eq!(store.consume(&bogus).unwrap(), None);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_concurrent_consume_never_exceeds_quota() {
        use std::sync::Arc;

        let store = Arc::new(MemoryGrantStore::new());
        let token = DownloadToken::generate();
        let policy = GrantPolicy::new(1, 4);
        store
            .put(
                token.clone(),
                AccessGrant::mint(Some("a@b.com".into()), "sess_1", &policy),
            )
            .unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                let token = token.clone();
                std::thread::spawn(move || store.consume(&token).unwrap().is_some())
            })
            .collect();

        let spent = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&consumed| consumed)
            .count();

        assert_eq!(spent, 4);
        assert!(store.get(&token).unwrap().is_none());
    }
}
