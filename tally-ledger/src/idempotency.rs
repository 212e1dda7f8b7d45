//! Idempotency key handling.
//!
//! A caller may attach a key to any movement request. Claiming a key
//! reserves it atomically: the first claimer executes the operation, and
//! any concurrent claim of the same key waits for the outcome instead of
//! executing a second time. Completed receipts are remembered with a
//! fingerprint of the request payload — retrying the same key with the
//! same payload replays the stored receipt without touching balances,
//! while reusing the key with a different payload is rejected as
//! `DuplicateRequest`. Completed entries expire after the configured TTL;
//! failed operations release their reservation so the key can be retried.

use crate::contract::Receipt;
use crate::error::LedgerError;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tally_domain::AccountId;
use tokio::sync::watch;
use tracing::debug;

/// Deterministic fingerprint of a movement request payload
///
/// Two requests fingerprint identically iff they describe the same movement:
/// same kind, same accounts in the same roles, same amount string, same
/// description.
pub fn request_fingerprint(
    kind: &str,
    accounts: &[AccountId],
    amount: &str,
    description: Option<&str>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_bytes());
    for account in accounts {
        hasher.update(b"|");
        hasher.update(account.as_bytes());
    }
    hasher.update(b"|");
    hasher.update(amount.as_bytes());
    hasher.update(b"|");
    hasher.update(description.unwrap_or("").as_bytes());
    format!("req_{}", hex::encode(hasher.finalize()))
}

struct CachedOutcome {
    fingerprint: String,
    receipt: Receipt,
    stored_at: Instant,
}

enum Slot {
    /// Key is reserved by an in-flight operation; the sender settles when
    /// the slot is replaced or removed
    Pending {
        fingerprint: String,
        settled: watch::Sender<bool>,
    },
    Completed(CachedOutcome),
}

/// In-memory idempotency cache with in-flight reservations and TTL expiry
pub(crate) struct IdempotencyCache {
    ttl: Duration,
    slots: RwLock<HashMap<String, Slot>>,
}

impl IdempotencyCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Claim a key before executing an operation
    ///
    /// Returns `Ok(Some(receipt))` with `replayed = true` when the key
    /// already completed with the same fingerprint, and `Ok(None)` when the
    /// caller now owns the reservation and must `complete` or `abort` it.
    /// A claim against an in-flight reservation with the same fingerprint
    /// waits for that operation to settle, then resolves like a fresh claim.
    ///
    /// # Errors
    /// `LedgerError::DuplicateRequest` when the key is bound (pending or
    /// completed) to a different payload.
    pub async fn claim(&self, key: &str, fingerprint: &str) -> Result<Option<Receipt>, LedgerError> {
        loop {
            let mut settled = {
                let mut slots = self.slots.write().unwrap();
                slots.retain(|_, slot| match slot {
                    Slot::Completed(cached) => cached.stored_at.elapsed() < self.ttl,
                    Slot::Pending { .. } => true,
                });

                match slots.get(key) {
                    None => {
                        let (tx, _) = watch::channel(false);
                        slots.insert(
                            key.to_string(),
                            Slot::Pending {
                                fingerprint: fingerprint.to_string(),
                                settled: tx,
                            },
                        );
                        return Ok(None);
                    }
                    Some(Slot::Completed(cached)) => {
                        if cached.fingerprint != fingerprint {
                            return Err(LedgerError::DuplicateRequest {
                                key: key.to_string(),
                            });
                        }
                        debug!(key = %key, "idempotent replay");
                        let mut receipt = cached.receipt.clone();
                        receipt.replayed = true;
                        return Ok(Some(receipt));
                    }
                    Some(Slot::Pending {
                        fingerprint: pending,
                        settled,
                    }) => {
                        if pending != fingerprint {
                            return Err(LedgerError::DuplicateRequest {
                                key: key.to_string(),
                            });
                        }
                        // Subscribed while holding the map lock, so the
                        // settle signal cannot be missed
                        settled.subscribe()
                    }
                }
            };

            let _ = settled.wait_for(|done| *done).await;
        }
    }

    /// Record the receipt of a completed keyed operation and wake waiters
    pub fn complete(&self, key: &str, fingerprint: &str, receipt: &Receipt) {
        let previous = self.slots.write().unwrap().insert(
            key.to_string(),
            Slot::Completed(CachedOutcome {
                fingerprint: fingerprint.to_string(),
                receipt: receipt.clone(),
                stored_at: Instant::now(),
            }),
        );
        if let Some(Slot::Pending { settled, .. }) = previous {
            let _ = settled.send(true);
        }
    }

    /// Release the reservation of a failed keyed operation
    ///
    /// Failures are never cached: the next claim of the key executes again.
    pub fn abort(&self, key: &str) {
        let previous = self.slots.write().unwrap().remove(key);
        if let Some(Slot::Pending { settled, .. }) = previous {
            let _ = settled.send(true);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use uuid::Uuid;

    fn receipt() -> Receipt {
        Receipt {
            transaction_id: Uuid::now_v7(),
            balances: Vec::new(),
            replayed: false,
        }
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let f1 = request_fingerprint("transfer", &[a, b], "10.00", None);
        let f2 = request_fingerprint("transfer", &[a, b], "10.00", None);
        assert_eq!(f1, f2);
        assert!(f1.starts_with("req_"));
    }

    #[test]
    fn test_fingerprint_sensitive_to_payload() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let base = request_fingerprint("transfer", &[a, b], "10.00", None);
        assert_ne!(base, request_fingerprint("transfer", &[b, a], "10.00", None));
        assert_ne!(base, request_fingerprint("transfer", &[a, b], "10.01", None));
        assert_ne!(base, request_fingerprint("deposit", &[a, b], "10.00", None));
        assert_ne!(
            base,
            request_fingerprint("transfer", &[a, b], "10.00", Some("rent"))
        );
    }

    #[tokio::test]
    async fn test_replay_returns_cached_receipt() {
        let cache = IdempotencyCache::new(Duration::from_secs(60));
        assert!(cache.claim("key-1", "fp-1").await.unwrap().is_none());

        let stored = receipt();
        cache.complete("key-1", "fp-1", &stored);

        let replayed = cache.claim("key-1", "fp-1").await.unwrap().unwrap();
        assert_eq!(replayed.transaction_id, stored.transaction_id);
        assert!(replayed.replayed);
    }

    #[tokio::test]
    async fn test_conflicting_payload_rejected() {
        let cache = IdempotencyCache::new(Duration::from_secs(60));
        cache.claim("key-1", "fp-1").await.unwrap();

        // Conflicts are rejected both while in flight and after completion
        let err = cache.claim("key-1", "fp-2").await.unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateRequest { .. }));

        cache.complete("key-1", "fp-1", &receipt());
        let err = cache.claim("key-1", "fp-2").await.unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateRequest { .. }));
    }

    #[tokio::test]
    async fn test_abort_releases_reservation() {
        let cache = IdempotencyCache::new(Duration::from_secs(60));
        assert!(cache.claim("key-1", "fp-1").await.unwrap().is_none());
        cache.abort("key-1");
        assert!(cache.claim("key-1", "fp-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_claim_waits_for_winner() {
        let cache = Arc::new(IdempotencyCache::new(Duration::from_secs(60)));
        assert!(cache.claim("key-1", "fp-1").await.unwrap().is_none());

        let waiter = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.claim("key-1", "fp-1").await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        let stored = receipt();
        cache.complete("key-1", "fp-1", &stored);

        let outcome = waiter.await.unwrap().unwrap().unwrap();
        assert!(outcome.replayed);
        assert_eq!(outcome.transaction_id, stored.transaction_id);
    }

    #[tokio::test]
    async fn test_waiter_claims_after_winner_aborts() {
        let cache = Arc::new(IdempotencyCache::new(Duration::from_secs(60)));
        assert!(cache.claim("key-1", "fp-1").await.unwrap().is_none());

        let waiter = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.claim("key-1", "fp-1").await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        cache.abort("key-1");

        // The waiter inherits the reservation and would execute itself
        let outcome = waiter.await.unwrap().unwrap();
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn test_expired_key_passes_through() {
        let cache = IdempotencyCache::new(Duration::from_millis(0));
        assert!(cache.claim("key-1", "fp-1").await.unwrap().is_none());
        cache.complete("key-1", "fp-1", &receipt());
        assert!(cache.claim("key-1", "fp-1").await.unwrap().is_none());
    }
}
