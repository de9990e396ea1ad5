//! # Token Codec
//!
//! Issues and verifies the signed bearer tokens used by both principal
//! kinds. Tokens are compact JWTs signed with a single shared HS256 secret
//! and carry four claims: subject (stringified principal id), jti, iat and
//! exp. No issuer, audience or key-id claims; key rotation is explicitly
//! out of scope.
//!
//! Access and refresh tokens share the codec and differ only in lifetime.

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use shared::config::JwtConfig;
use shared::error::{AuthError, AuthResult};
use shared::types::PrincipalId;

/// Which lifetime a token is issued with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenUse {
    Access,
    Refresh,
}

/// The claims carried by every token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Stringified principal id
    pub sub: String,
    /// Unique token id
    pub jti: String,
    /// Issued-at, unix seconds
    pub iat: i64,
    /// Expires-at, unix seconds
    pub exp: i64,
}

impl TokenClaims {
    /// Parse the subject back into a principal id
    pub fn principal_id(&self) -> AuthResult<PrincipalId> {
        self.sub
            .parse()
            .map_err(|_| AuthError::MalformedToken(format!("non-numeric subject: {}", self.sub)))
    }

    /// Expiry as a UTC timestamp
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }
}

/// Symmetric JWT codec shared by the whole service
#[derive(Clone)]
pub struct JwtCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl_secs: u64,
    refresh_ttl_secs: u64,
}

impl JwtCodec {
    /// Build a codec from configuration. The secret must already have been
    /// validated as non-empty.
    pub fn new(config: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry checks are exact; a token is invalid the second it expires
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            access_ttl_secs: config.access_ttl_secs,
            refresh_ttl_secs: config.refresh_ttl_secs,
        }
    }

    /// Issue a signed token for a principal with the given jti
    pub fn issue(
        &self,
        principal_id: PrincipalId,
        token_use: TokenUse,
        jti: &str,
    ) -> AuthResult<String> {
        let now = Utc::now();
        let ttl = match token_use {
            TokenUse::Access => self.access_ttl_secs,
            TokenUse::Refresh => self.refresh_ttl_secs,
        };

        let claims = TokenClaims {
            sub: principal_id.to_string(),
            jti: jti.to_string(),
            iat: now.timestamp(),
            exp: now.timestamp() + ttl as i64,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("token signing failed: {}", e)))
    }

    /// Verify signature and expiry, returning the claims.
    ///
    /// Never trusts unverified claims: the signature is checked before
    /// anything is read out of the payload.
    pub fn verify(&self, token: &str) -> AuthResult<TokenClaims> {
        decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::MalformedToken(e.to_string()),
            })
    }

    /// Verification collapsed into a boolean
    pub fn is_valid(&self, token: &str) -> bool {
        self.verify(token).is_ok()
    }

    /// Extract the jti if the token verifies
    pub fn jti(&self, token: &str) -> Option<String> {
        self.verify(token).ok().map(|c| c.jti)
    }

    /// Extract the subject as a principal id if the token verifies
    pub fn subject(&self, token: &str) -> Option<PrincipalId> {
        self.verify(token).ok().and_then(|c| c.principal_id().ok())
    }

    /// Extract the expiry if the token verifies
    pub fn expiration(&self, token: &str) -> Option<DateTime<Utc>> {
        self.verify(token).ok().map(|c| c.expires_at())
    }
}

/// SHA-256 hex digest, used to key refresh credentials by token content
pub fn sha256_hex(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> JwtCodec {
        JwtCodec::new(&JwtConfig {
            secret: "unit-test-secret".into(),
            ..Default::default()
        })
    }

    #[test]
    fn test_issue_verify_roundtrip() {
        let codec = codec();
        let principal = PrincipalId(123_456_789);

        let token = codec.issue(principal, TokenUse::Access, "jti-abc").unwrap();
        let claims = codec.verify(&token).unwrap();

        assert_eq!(claims.principal_id().unwrap(), principal);
        assert_eq!(claims.jti, "jti-abc");
        assert!(claims.exp > claims.iat);
        assert!(codec.is_valid(&token));
    }

    #[test]
    fn test_refresh_lifetime_exceeds_access() {
        let codec = codec();
        let access = codec.issue(PrincipalId(1), TokenUse::Access, "a").unwrap();
        let refresh = codec.issue(PrincipalId(1), TokenUse::Refresh, "r").unwrap();

        let access_exp = codec.expiration(&access).unwrap();
        let refresh_exp = codec.expiration(&refresh).unwrap();
        assert!(refresh_exp > access_exp);
    }

    #[test]
    fn test_wrong_secret_is_invalid_signature() {
        let codec_a = codec();
        let codec_b = JwtCodec::new(&JwtConfig {
            secret: "a-different-secret".into(),
            ..Default::default()
        });

        let token = codec_a.issue(PrincipalId(1), TokenUse::Access, "j").unwrap();
        assert!(matches!(
            codec_b.verify(&token),
            Err(AuthError::InvalidSignature)
        ));
        assert!(!codec_b.is_valid(&token));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let codec = codec();
        assert!(matches!(
            codec.verify("not-a-jwt"),
            Err(AuthError::MalformedToken(_))
        ));
        assert!(codec.jti("not-a-jwt").is_none());
        assert!(codec.subject("not-a-jwt").is_none());
    }

    #[test]
    fn test_expired_token_rejected() {
        let codec = codec();

        // Hand-craft an already-expired token with the same secret
        let claims = TokenClaims {
            sub: "42".into(),
            jti: "expired-jti".into(),
            iat: Utc::now().timestamp() - 600,
            exp: Utc::now().timestamp() - 300,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"unit-test-secret"),
        )
        .unwrap();

        assert!(matches!(codec.verify(&token), Err(AuthError::TokenExpired)));
        assert!(!codec.is_valid(&token));
    }

    #[test]
    fn test_sha256_hex() {
        // Known vector for the empty string
        assert_eq!(
            sha256_hex(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_ne!(sha256_hex("token-a"), sha256_hex("token-b"));
    }
}
