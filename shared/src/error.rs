//! # Error Types for the Auth Backend
//!
//! This module defines all error types used throughout the system,
//! providing detailed error information for debugging and logging.
//!
//! Callers at the API edge collapse every token verification failure to a
//! single unauthorized signal; the detailed variants exist for logs and
//! tests, never for external responses.

use thiserror::Error;

/// Main error type for the entire system
#[derive(Error, Debug)]
pub enum AuthError {
    // =========================================================================
    // ID GENERATOR ERRORS
    // =========================================================================

    /// The wall clock moved backwards. Generating an id anyway could reuse
    /// a (timestamp, sequence) pair, so this is fatal for the call.
    #[error("Clock moved backwards. Refusing to generate id for {behind_ms}ms")]
    ClockRegression { behind_ms: i64 },

    /// A failure writing the id audit record. Non-fatal: the id itself is
    /// still valid and returned to the caller.
    #[error("Failed to write id audit record: {0}")]
    AuditWriteFailure(String),

    // =========================================================================
    // TOKEN ERRORS
    // =========================================================================

    /// Token signature did not verify against the shared secret
    #[error("Invalid token signature")]
    InvalidSignature,

    /// Token expiry has passed
    #[error("Token has expired")]
    TokenExpired,

    /// Token could not be parsed at all
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    // =========================================================================
    // CREDENTIAL / AUTHORIZATION ERRORS
    // =========================================================================

    /// Generic authentication failure. Deliberately carries no detail about
    /// which check failed.
    #[error("Unauthorized")]
    Unauthorized,

    /// Refresh credential not found or already revoked. Only surfaced on
    /// administrative revoke paths where diagnostic detail is useful.
    #[error("Refresh token not found or already revoked")]
    CredentialNotFound,

    /// Principal authenticated but holds no matching permission
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    // =========================================================================
    // STORAGE ERRORS
    // =========================================================================

    /// Failure in a credential, blacklist or audit store
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================

    /// Invalid configuration (bad datacenter/worker id, empty secret, ...)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Missing required environment variable
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    // =========================================================================
    // GENERIC ERRORS
    // =========================================================================

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using AuthError
pub type AuthResult<T> = Result<T, AuthError>;

// =============================================================================
// ERROR CONVERSIONS
// =============================================================================

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        AuthError::Serialization(err.to_string())
    }
}

// =============================================================================
// ERROR CATEGORIES (for metrics and logging)
// =============================================================================

impl AuthError {
    /// Get the error category for metrics/logging
    pub fn category(&self) -> &'static str {
        match self {
            AuthError::ClockRegression { .. } | AuthError::AuditWriteFailure(_) => "id_generator",

            AuthError::InvalidSignature
            | AuthError::TokenExpired
            | AuthError::MalformedToken(_) => "token",

            AuthError::Unauthorized
            | AuthError::CredentialNotFound
            | AuthError::PermissionDenied(_) => "auth",

            AuthError::Storage(_) | AuthError::Serialization(_) => "storage",

            AuthError::Configuration(_) | AuthError::MissingEnvVar(_) => "config",

            AuthError::Internal(_) => "internal",
        }
    }

    /// Whether the error must be reported to external callers as a bare
    /// unauthorized signal, with no detail about which check failed.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidSignature
                | AuthError::TokenExpired
                | AuthError::MalformedToken(_)
                | AuthError::Unauthorized
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category() {
        let err = AuthError::ClockRegression { behind_ms: 12 };
        assert_eq!(err.category(), "id_generator");

        let err = AuthError::InvalidSignature;
        assert_eq!(err.category(), "token");

        let err = AuthError::CredentialNotFound;
        assert_eq!(err.category(), "auth");
    }

    #[test]
    fn test_unauthorized_collapse() {
        assert!(AuthError::TokenExpired.is_unauthorized());
        assert!(AuthError::MalformedToken("junk".into()).is_unauthorized());
        assert!(AuthError::Unauthorized.is_unauthorized());

        // Admin-facing and operational errors keep their detail
        assert!(!AuthError::CredentialNotFound.is_unauthorized());
        assert!(!AuthError::Storage("down".into()).is_unauthorized());
    }
}
