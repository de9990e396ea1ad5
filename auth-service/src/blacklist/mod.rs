//! # Access Token Blacklist
//!
//! Write-through denylist of revoked access-token ids. The durable store
//! is written first and is always authoritative; the moka cache in front of
//! it is an optimization for the per-request fast path, never a
//! correctness requirement. A cache miss falls back to the durable check.
//!
//! Every authenticated request must consult this blacklist before honoring
//! an otherwise-valid access token; it is the only way a still-unexpired
//! access token can be invalidated before its natural expiry.

use chrono::{DateTime, Duration, Utc};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tracing::{debug, info};

use shared::config::CacheConfig;
use shared::constants::BLACKLIST_FALLBACK_TTL_SECS;
use shared::error::AuthResult;
use shared::types::BlacklistEntry;

use crate::store::BlacklistStore;

/// Blacklist adapter: durable store behind a fast-path cache
pub struct TokenBlacklist {
    store: Arc<dyn BlacklistStore>,

    /// jti -> expiry of the blacklist entry
    cache: Cache<String, DateTime<Utc>>,

    enabled_cache: bool,
}

impl TokenBlacklist {
    pub fn new(store: Arc<dyn BlacklistStore>, config: &CacheConfig) -> Self {
        info!(
            cache_enabled = config.enabled,
            max_entries = config.max_entries,
            ttl_secs = config.ttl_secs,
            "Initializing token blacklist"
        );

        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(StdDuration::from_secs(config.ttl_secs))
            .build();

        Self {
            store,
            cache,
            enabled_cache: config.enabled,
        }
    }

    /// Blacklist a token id until the token's own expiry.
    ///
    /// If the remaining lifetime is already zero or negative, a fixed short
    /// TTL is substituted so the entry still lands in the audit trail.
    pub async fn revoke(
        &self,
        jti: &str,
        reason: &str,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<()> {
        let now = Utc::now();
        let effective_expiry = if expires_at > now {
            expires_at
        } else {
            now + Duration::seconds(BLACKLIST_FALLBACK_TTL_SECS as i64)
        };

        debug!(jti = %jti, reason = %reason, expires_at = %effective_expiry, "Revoking access token");

        // Durable store first; the cache only reflects what is persisted
        self.store
            .insert(BlacklistEntry::new(
                jti.to_string(),
                reason.to_string(),
                effective_expiry,
            ))
            .await?;

        if self.enabled_cache {
            self.cache.insert(jti.to_string(), effective_expiry).await;
        }
        Ok(())
    }

    /// Whether a token id is currently blacklisted
    pub async fn is_blacklisted(&self, jti: &str) -> AuthResult<bool> {
        if self.enabled_cache {
            if let Some(expires_at) = self.cache.get(jti).await {
                if expires_at > Utc::now() {
                    debug!(jti = %jti, "Blacklist cache hit");
                    return Ok(true);
                }
                // Entry outlived its token; drop it and fall through
                self.cache.invalidate(jti).await;
            }
        }

        self.store.contains(jti).await
    }

    /// Drop durable entries whose tokens have expired naturally.
    /// Housekeeping; an expired token is rejected by signature verification
    /// alone, so this never affects correctness.
    pub async fn purge_expired(&self) -> AuthResult<usize> {
        let dropped = self.store.purge_expired().await?;
        if dropped > 0 {
            info!(dropped, "Purged expired blacklist entries");
        }
        Ok(dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryBlacklistStore;

    fn blacklist(store: Arc<MemoryBlacklistStore>) -> TokenBlacklist {
        TokenBlacklist::new(store, &CacheConfig::default())
    }

    #[tokio::test]
    async fn test_revoke_then_contains() {
        let store = Arc::new(MemoryBlacklistStore::new());
        let blacklist = blacklist(store);

        let expires = Utc::now() + Duration::minutes(30);
        blacklist.revoke("jti-1", "Logout", expires).await.unwrap();

        assert!(blacklist.is_blacklisted("jti-1").await.unwrap());
        assert!(!blacklist.is_blacklisted("jti-2").await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_token_gets_fallback_ttl() {
        let store = Arc::new(MemoryBlacklistStore::new());
        let blacklist = blacklist(store.clone());

        // Token already past its own expiry
        blacklist
            .revoke("jti-old", "Logout", Utc::now() - Duration::minutes(1))
            .await
            .unwrap();

        // Still blacklisted for the fallback window
        assert!(blacklist.is_blacklisted("jti-old").await.unwrap());
        assert!(store.contains("jti-old").await.unwrap());
    }

    #[tokio::test]
    async fn test_cache_miss_falls_back_to_durable_store() {
        let store = Arc::new(MemoryBlacklistStore::new());

        // Entry written by another node: only in the durable store
        store
            .insert(BlacklistEntry::new(
                "jti-remote".into(),
                "Admin revoked access token".into(),
                Utc::now() + Duration::minutes(10),
            ))
            .await
            .unwrap();

        let blacklist = blacklist(store);
        assert!(blacklist.is_blacklisted("jti-remote").await.unwrap());
    }

    #[tokio::test]
    async fn test_disabled_cache_still_correct() {
        let store = Arc::new(MemoryBlacklistStore::new());
        let config = CacheConfig {
            enabled: false,
            ..Default::default()
        };
        let blacklist = TokenBlacklist::new(store, &config);

        blacklist
            .revoke("jti-nc", "Logout", Utc::now() + Duration::minutes(5))
            .await
            .unwrap();
        assert!(blacklist.is_blacklisted("jti-nc").await.unwrap());
    }
}
