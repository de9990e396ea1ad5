//! # Shared Data Types for the Auth Backend
//!
//! This module defines all shared data structures used across the
//! authentication service: principals, refresh credentials, blacklist
//! entries, id audit rows and the API request/response bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// PRINCIPALS
// =============================================================================

/// The two principal kinds sharing one token lifecycle protocol
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    /// Human operator, authenticates with phone + password
    Operator,
    /// Physical device, authenticates with uuid + signature hash
    Device,
}

impl PrincipalKind {
    /// Stable lowercase tag used in audit rows and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalKind::Operator => "operator",
            PrincipalKind::Device => "device",
        }
    }
}

impl std::fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snowflake-generated principal identifier.
///
/// 64-bit, time-ordered: 41-bit relative timestamp, 5-bit datacenter id,
/// 5-bit worker id, 12-bit sequence. Ids generated by the same process are
/// monotonically non-decreasing.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(transparent)]
pub struct PrincipalId(pub i64);

impl PrincipalId {
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PrincipalId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>().map(PrincipalId)
    }
}

impl From<i64> for PrincipalId {
    fn from(v: i64) -> Self {
        PrincipalId(v)
    }
}

// =============================================================================
// REFRESH CREDENTIALS
// =============================================================================

/// One outstanding refresh token for one principal.
///
/// The raw token string is never persisted; only its SHA-256 hex digest.
/// Revocation and expiry are soft states, records are never physically
/// deleted by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshCredential {
    /// Document id (UUID v4)
    pub id: String,

    /// Owning principal
    pub principal_id: PrincipalId,

    /// Principal kind this credential belongs to
    pub kind: PrincipalKind,

    /// The refresh token's jti
    pub token_id: String,

    /// SHA-256 hex digest of the refresh token string
    pub refresh_token_hash: String,

    /// When the credential was created
    pub created_at: DateTime<Utc>,

    /// Last successful use via the refresh endpoint
    pub last_used_at: Option<DateTime<Utc>>,

    /// Expiry copied from the refresh token's own expiry
    pub expires_at: DateTime<Utc>,

    /// Terminal once set; covers both rotation and explicit revocation
    pub revoked: bool,
}

impl RefreshCredential {
    /// Create a fresh `Active` credential
    pub fn new(
        principal_id: PrincipalId,
        kind: PrincipalKind,
        token_id: String,
        refresh_token_hash: String,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            principal_id,
            kind,
            token_id,
            refresh_token_hash,
            created_at: Utc::now(),
            last_used_at: None,
            expires_at,
            revoked: false,
        }
    }

    /// Derive the credential's lifecycle state at `now`
    pub fn state(&self, now: DateTime<Utc>) -> CredentialState {
        if self.revoked {
            CredentialState::Revoked
        } else if self.expires_at <= now {
            CredentialState::Expired
        } else {
            CredentialState::Active
        }
    }
}

/// Lifecycle state of a refresh credential.
///
/// `Active` is the only non-terminal state. A rotated credential is stored
/// as revoked; the distinction between `Rotated` and `Revoked` lives in the
/// audit trail, not in the record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CredentialState {
    Active,
    Revoked,
    Expired,
}

// =============================================================================
// BLACKLIST
// =============================================================================

/// One revoked access-token id.
///
/// Never mutated. Safe to physically drop once `expires_at` has passed,
/// since signature verification alone rejects the token from then on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlacklistEntry {
    /// The revoked token's jti
    pub jti: String,

    /// Why the token was revoked
    pub reason: String,

    /// When the entry was written
    pub created_at: DateTime<Utc>,

    /// Expiry copied from the original token
    pub expires_at: DateTime<Utc>,
}

impl BlacklistEntry {
    pub fn new(jti: String, reason: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            jti,
            reason,
            created_at: Utc::now(),
            expires_at,
        }
    }

    /// Whether the entry has outlived the token it shadows
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

// =============================================================================
// ID AUDIT
// =============================================================================

/// Audit row persisted for every generated principal id.
///
/// Plays no role in future id generation; exists purely for traceability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdRecord {
    /// The generated id
    pub id: i64,

    /// Principal kind the id was generated for
    pub kind: PrincipalKind,

    /// Label of the node that generated the id
    pub node: String,

    /// Generation time
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// TOKEN PAIR
// =============================================================================

/// Access + refresh pair returned by login and refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
}

// =============================================================================
// API REQUEST / RESPONSE BODIES
// =============================================================================

/// Operator login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorLoginRequest {
    pub phone: String,
    pub password: String,
}

/// Device login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceLoginRequest {
    pub uuid: String,
    pub signature_hash: String,
}

/// Operator registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterOperatorRequest {
    pub phone: String,
    pub password: String,
    pub name: Option<String>,
}

/// Device registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterDeviceRequest {
    pub uuid: String,
    pub signature_hash: String,
    pub model: Option<String>,
}

/// Refresh request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Logout request: both tokens from the same login event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutRequest {
    pub access_token: String,
    pub refresh_token: String,
}

/// Administrative revoke of a refresh token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevokeRefreshRequest {
    pub refresh_token: String,
}

/// Administrative revoke of an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevokeAccessRequest {
    pub access_token: String,
}

/// Registration response: the freshly minted principal id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub id: PrincipalId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_principal_id_roundtrip() {
        let id = PrincipalId(7_218_344_521_553_926_144);
        let s = id.to_string();
        assert_eq!(s.parse::<PrincipalId>().unwrap(), id);
    }

    #[test]
    fn test_credential_state() {
        let now = Utc::now();
        let mut cred = RefreshCredential::new(
            PrincipalId(42),
            PrincipalKind::Operator,
            "jti".into(),
            "hash".into(),
            now + Duration::days(30),
        );
        assert_eq!(cred.state(now), CredentialState::Active);

        cred.revoked = true;
        assert_eq!(cred.state(now), CredentialState::Revoked);

        // Revoked wins over expired
        cred.expires_at = now - Duration::hours(1);
        assert_eq!(cred.state(now), CredentialState::Revoked);

        cred.revoked = false;
        assert_eq!(cred.state(now), CredentialState::Expired);
    }

    #[test]
    fn test_blacklist_entry_expiry() {
        let now = Utc::now();
        let entry = BlacklistEntry::new("jti-1".into(), "Logout".into(), now + Duration::minutes(5));
        assert!(!entry.is_expired(now));
        assert!(entry.is_expired(now + Duration::minutes(6)));
    }
}
