//! # Rotation Engine
//!
//! The token lifecycle protocol shared by both principal kinds: login,
//! refresh, logout and administrative revocation. Kind is carried as data
//! on the credential record; there is one state machine, not one per kind.
//!
//! ## Refresh credential states
//!
//! `Active` -> `Rotated` (superseded near end-of-life), `Active` ->
//! `Revoked` (logout/admin), `Active` -> `Expired` (detected lazily on next
//! use). All three are terminal. Rotation only happens inside the
//! configured window before expiry, so active sessions keep their refresh
//! token and a leaked one is bounded to at most one rotation window.
//!
//! ## Failure semantics
//!
//! Every refresh-path failure collapses to `Unauthorized`; the caller can
//! never distinguish "never existed" from "revoked". Administrative revokes
//! are operator-facing and report `CredentialNotFound` on a miss.

use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared::config::JwtConfig;
use shared::constants::{REASON_ADMIN_REVOKED, REASON_LOGOUT};
use shared::error::{AuthError, AuthResult};
use shared::types::{PrincipalId, PrincipalKind, RefreshCredential, TokenPair};

use crate::blacklist::TokenBlacklist;
use crate::store::CredentialStore;
use crate::token::{sha256_hex, JwtCodec, TokenUse};

/// Issues, refreshes and revokes token pairs for both principal kinds
pub struct RotationEngine {
    codec: JwtCodec,
    credentials: Arc<dyn CredentialStore>,
    blacklist: Arc<TokenBlacklist>,
    rotation_window: Duration,
}

impl RotationEngine {
    pub fn new(
        config: &JwtConfig,
        credentials: Arc<dyn CredentialStore>,
        blacklist: Arc<TokenBlacklist>,
    ) -> Self {
        info!(
            access_ttl_secs = config.access_ttl_secs,
            refresh_ttl_secs = config.refresh_ttl_secs,
            rotation_window_secs = config.rotation_window_secs,
            "Initializing rotation engine"
        );
        Self {
            codec: JwtCodec::new(config),
            credentials,
            blacklist,
            rotation_window: Duration::seconds(config.rotation_window_secs as i64),
        }
    }

    /// The codec used for issuing; callers verifying bearer tokens at the
    /// API edge share it
    pub fn codec(&self) -> &JwtCodec {
        &self.codec
    }

    /// Issue a fresh access + refresh pair for an already-authenticated
    /// principal and persist the refresh credential.
    pub async fn login(
        &self,
        principal_id: PrincipalId,
        kind: PrincipalKind,
    ) -> AuthResult<TokenPair> {
        let access_jti = Uuid::new_v4().to_string();
        let refresh_jti = Uuid::new_v4().to_string();

        let access_token = self.codec.issue(principal_id, TokenUse::Access, &access_jti)?;
        let refresh_token = self
            .codec
            .issue(principal_id, TokenUse::Refresh, &refresh_jti)?;

        let refresh_claims = self.codec.verify(&refresh_token)?;
        let credential = RefreshCredential::new(
            principal_id,
            kind,
            refresh_jti,
            sha256_hex(&refresh_token),
            refresh_claims.expires_at(),
        );
        self.credentials.insert(credential).await?;

        let access_expires_at = self
            .codec
            .expiration(&access_token)
            .ok_or_else(|| AuthError::Internal("freshly issued token did not verify".into()))?;

        info!(principal_id = %principal_id, kind = %kind, "Issued token pair on login");

        Ok(TokenPair {
            access_token,
            refresh_token,
            access_expires_at,
        })
    }

    /// Exchange a refresh token for a new access token, rotating the
    /// refresh credential when it is near end-of-life.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenPair> {
        let hash = sha256_hex(refresh_token);
        let credential = self
            .credentials
            .find_active_by_hash(&hash)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        // Defense in depth; the lookup already filters revoked records
        if credential.revoked {
            return Err(AuthError::Unauthorized);
        }

        let now = Utc::now();

        // Lazy expiry detection: revoke and reject
        if credential.expires_at <= now {
            debug!(credential_id = %credential.id, "Refresh credential expired, revoking");
            self.credentials.revoke(&credential.id).await?;
            return Err(AuthError::Unauthorized);
        }

        // A stored hash match with a bad signature means the token bytes
        // were tampered with after issuance; burn the credential.
        if let Err(err) = self.codec.verify(refresh_token) {
            warn!(
                credential_id = %credential.id,
                error = %err,
                "Refresh token failed verification, revoking credential"
            );
            self.credentials.revoke(&credential.id).await?;
            return Err(AuthError::Unauthorized);
        }

        // A fresh access token is issued on every refresh
        let access_jti = Uuid::new_v4().to_string();
        let access_token =
            self.codec
                .issue(credential.principal_id, TokenUse::Access, &access_jti)?;
        let access_expires_at = self
            .codec
            .expiration(&access_token)
            .ok_or_else(|| AuthError::Internal("freshly issued token did not verify".into()))?;

        if credential.expires_at - now < self.rotation_window {
            // Near end-of-life: rotate. The conditional revoke is the
            // arbiter under concurrent refreshes; the loser is rejected.
            if !self.credentials.revoke(&credential.id).await? {
                debug!(credential_id = %credential.id, "Lost rotation race");
                return Err(AuthError::Unauthorized);
            }

            let new_jti = Uuid::new_v4().to_string();
            let new_refresh_token =
                self.codec
                    .issue(credential.principal_id, TokenUse::Refresh, &new_jti)?;
            let new_claims = self.codec.verify(&new_refresh_token)?;

            let mut new_credential = RefreshCredential::new(
                credential.principal_id,
                credential.kind,
                new_jti,
                sha256_hex(&new_refresh_token),
                new_claims.expires_at(),
            );
            new_credential.last_used_at = Some(now);
            self.credentials.insert(new_credential).await?;

            info!(
                principal_id = %credential.principal_id,
                kind = %credential.kind,
                "Rotated refresh credential"
            );

            Ok(TokenPair {
                access_token,
                refresh_token: new_refresh_token,
                access_expires_at,
            })
        } else {
            // Far from expiry: same refresh token, update last use
            self.credentials.touch_last_used(&credential.id, now).await?;

            Ok(TokenPair {
                access_token,
                refresh_token: refresh_token.to_string(),
                access_expires_at,
            })
        }
    }

    /// Blacklist the access token and revoke the refresh credential.
    ///
    /// Both halves are attempted even if one fails: a malformed access
    /// token does not stop the refresh credential from being revoked, since
    /// the refresh token is always trustworthy as a lookup key.
    pub async fn logout(&self, access_token: &str, refresh_token: &str) -> AuthResult<()> {
        let blacklist_result = match self.codec.verify(access_token) {
            Ok(claims) => {
                self.blacklist
                    .revoke(&claims.jti, REASON_LOGOUT, claims.expires_at())
                    .await
            }
            Err(err) => {
                debug!(error = %err, "Access token unusable at logout, skipping blacklist");
                Ok(())
            }
        };

        let revoke_result = self.revoke_refresh_internal(refresh_token).await;

        blacklist_result?;
        match revoke_result {
            // A missing credential at logout is not an error for the caller
            Ok(_) | Err(AuthError::CredentialNotFound) => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Administrative revoke of a refresh token. Misses are reported as
    /// `CredentialNotFound` since this path is operator-facing.
    pub async fn revoke_refresh(&self, refresh_token: &str) -> AuthResult<()> {
        self.revoke_refresh_internal(refresh_token).await?;
        info!("Refresh credential revoked administratively");
        Ok(())
    }

    /// Administrative revoke of an access token: verify, extract jti and
    /// expiry, blacklist.
    pub async fn revoke_access(&self, access_token: &str) -> AuthResult<()> {
        let claims = self.codec.verify(access_token)?;
        self.blacklist
            .revoke(&claims.jti, REASON_ADMIN_REVOKED, claims.expires_at())
            .await?;
        info!(jti = %claims.jti, "Access token revoked administratively");
        Ok(())
    }

    async fn revoke_refresh_internal(&self, refresh_token: &str) -> AuthResult<()> {
        let hash = sha256_hex(refresh_token);
        let credential = self
            .credentials
            .find_active_by_hash(&hash)
            .await?
            .ok_or(AuthError::CredentialNotFound)?;

        if !self.credentials.revoke(&credential.id).await? {
            return Err(AuthError::CredentialNotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryBlacklistStore, MemoryCredentialStore};
    use shared::config::CacheConfig;

    struct Fixture {
        engine: RotationEngine,
        credentials: Arc<MemoryCredentialStore>,
        blacklist: Arc<TokenBlacklist>,
    }

    fn fixture() -> Fixture {
        fixture_with(JwtConfig {
            secret: "rotation-test-secret".into(),
            ..Default::default()
        })
    }

    fn fixture_with(config: JwtConfig) -> Fixture {
        let credentials = Arc::new(MemoryCredentialStore::new());
        let blacklist = Arc::new(TokenBlacklist::new(
            Arc::new(MemoryBlacklistStore::new()),
            &CacheConfig::default(),
        ));
        let engine = RotationEngine::new(&config, credentials.clone(), blacklist.clone());
        Fixture {
            engine,
            credentials,
            blacklist,
        }
    }

    /// Plant a credential whose stored expiry differs from the token's own,
    /// to steer the rotation decision without waiting on the clock.
    async fn plant_credential(
        fx: &Fixture,
        principal: PrincipalId,
        hours_to_expiry: i64,
    ) -> (String, String) {
        let jti = Uuid::new_v4().to_string();
        let token = fx
            .engine
            .codec()
            .issue(principal, TokenUse::Refresh, &jti)
            .unwrap();
        let credential = RefreshCredential::new(
            principal,
            PrincipalKind::Operator,
            jti,
            sha256_hex(&token),
            Utc::now() + Duration::hours(hours_to_expiry),
        );
        let id = credential.id.clone();
        fx.credentials.insert(credential).await.unwrap();
        (token, id)
    }

    #[tokio::test]
    async fn test_login_issues_pair_and_persists_credential() {
        let fx = fixture();
        let pair = fx
            .engine
            .login(PrincipalId(42), PrincipalKind::Operator)
            .await
            .unwrap();

        assert!(fx.engine.codec().is_valid(&pair.access_token));
        assert!(fx.engine.codec().is_valid(&pair.refresh_token));
        assert_ne!(
            fx.engine.codec().jti(&pair.access_token),
            fx.engine.codec().jti(&pair.refresh_token)
        );
        assert!(pair.access_expires_at > Utc::now());

        let stored = fx
            .credentials
            .find_active_by_hash(&sha256_hex(&pair.refresh_token))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.principal_id, PrincipalId(42));
        assert_eq!(stored.kind, PrincipalKind::Operator);
        assert!(!stored.revoked);
    }

    #[tokio::test]
    async fn test_refresh_far_from_expiry_keeps_refresh_token() {
        let fx = fixture();
        let pair = fx
            .engine
            .login(PrincipalId(7), PrincipalKind::Device)
            .await
            .unwrap();

        let refreshed = fx.engine.refresh(&pair.refresh_token).await.unwrap();
        assert_eq!(refreshed.refresh_token, pair.refresh_token);
        assert_ne!(refreshed.access_token, pair.access_token);

        // Not rotated, not invalidated: the same token refreshes again
        let again = fx.engine.refresh(&pair.refresh_token).await.unwrap();
        assert_eq!(again.refresh_token, pair.refresh_token);
    }

    #[tokio::test]
    async fn test_refresh_near_expiry_rotates() {
        let fx = fixture();
        // 1h to expiry, well inside the 48h window
        let (old_token, old_id) = plant_credential(&fx, PrincipalId(9), 1).await;

        let pair = fx.engine.refresh(&old_token).await.unwrap();
        assert_ne!(pair.refresh_token, old_token);

        // Old credential is terminally rotated
        assert!(!fx.credentials.revoke(&old_id).await.unwrap());
        assert!(matches!(
            fx.engine.refresh(&old_token).await,
            Err(AuthError::Unauthorized)
        ));

        // The newly issued refresh token works
        assert!(fx.engine.refresh(&pair.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_unknown_token_unauthorized() {
        let fx = fixture();
        let stray = fx
            .engine
            .codec()
            .issue(PrincipalId(1), TokenUse::Refresh, "stray")
            .unwrap();
        assert!(matches!(
            fx.engine.refresh(&stray).await,
            Err(AuthError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_refresh_revoked_credential_unauthorized() {
        let fx = fixture();
        let pair = fx
            .engine
            .login(PrincipalId(5), PrincipalKind::Operator)
            .await
            .unwrap();

        fx.engine.revoke_refresh(&pair.refresh_token).await.unwrap();
        assert!(matches!(
            fx.engine.refresh(&pair.refresh_token).await,
            Err(AuthError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_refresh_expired_credential_revokes_it() {
        let fx = fixture();
        let (token, id) = plant_credential(&fx, PrincipalId(3), -1).await;

        assert!(matches!(
            fx.engine.refresh(&token).await,
            Err(AuthError::Unauthorized)
        ));
        // Expired -> terminal: the record was revoked in passing
        assert!(!fx.credentials.revoke(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_logout_blacklists_access_and_revokes_refresh() {
        let fx = fixture();
        let pair = fx
            .engine
            .login(PrincipalId(11), PrincipalKind::Operator)
            .await
            .unwrap();
        let access_jti = fx.engine.codec().jti(&pair.access_token).unwrap();

        fx.engine
            .logout(&pair.access_token, &pair.refresh_token)
            .await
            .unwrap();

        assert!(fx.blacklist.is_blacklisted(&access_jti).await.unwrap());
        assert!(matches!(
            fx.engine.refresh(&pair.refresh_token).await,
            Err(AuthError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_logout_with_malformed_access_still_revokes_refresh() {
        let fx = fixture();
        let pair = fx
            .engine
            .login(PrincipalId(13), PrincipalKind::Device)
            .await
            .unwrap();

        fx.engine
            .logout("garbage", &pair.refresh_token)
            .await
            .unwrap();

        assert!(matches!(
            fx.engine.refresh(&pair.refresh_token).await,
            Err(AuthError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_admin_revoke_refresh_miss_is_not_found() {
        let fx = fixture();
        let stray = fx
            .engine
            .codec()
            .issue(PrincipalId(1), TokenUse::Refresh, "stray")
            .unwrap();
        assert!(matches!(
            fx.engine.revoke_refresh(&stray).await,
            Err(AuthError::CredentialNotFound)
        ));
    }

    #[tokio::test]
    async fn test_admin_revoke_access_blacklists_jti() {
        let fx = fixture();
        let pair = fx
            .engine
            .login(PrincipalId(17), PrincipalKind::Operator)
            .await
            .unwrap();
        let jti = fx.engine.codec().jti(&pair.access_token).unwrap();

        fx.engine.revoke_access(&pair.access_token).await.unwrap();
        assert!(fx.blacklist.is_blacklisted(&jti).await.unwrap());

        // The refresh credential is untouched by an access-only revoke
        assert!(fx.engine.refresh(&pair.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_rotation_race_single_winner() {
        let fx = fixture();
        let (token, _) = plant_credential(&fx, PrincipalId(21), 1).await;

        // Sequential stand-in for two racing calls: the first rotation wins,
        // the second sees the conditional revoke fail and is rejected.
        let first = fx.engine.refresh(&token).await;
        let second = fx.engine.refresh(&token).await;
        assert!(first.is_ok());
        assert!(matches!(second, Err(AuthError::Unauthorized)));
    }
}
