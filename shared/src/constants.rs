//! # Constants for the Auth Backend
//!
//! This module contains all constants used throughout the system:
//! snowflake bit layout, token lifetimes, blacklist/cache tuning and
//! environment variable names.

// =============================================================================
// SNOWFLAKE ID LAYOUT
// =============================================================================

/// Custom epoch for snowflake timestamps: 2023-01-01T00:00:00Z in millis
pub const SNOWFLAKE_EPOCH_MS: i64 = 1_672_531_200_000;

/// Bits reserved for the datacenter id (values 0-31)
pub const DATACENTER_ID_BITS: i64 = 5;

/// Bits reserved for the worker id (values 0-31)
pub const WORKER_ID_BITS: i64 = 5;

/// Bits reserved for the per-millisecond sequence counter
pub const SEQUENCE_BITS: i64 = 12;

/// Maximum datacenter id (inclusive)
pub const MAX_DATACENTER_ID: i64 = !(-1_i64 << DATACENTER_ID_BITS);

/// Maximum worker id (inclusive)
pub const MAX_WORKER_ID: i64 = !(-1_i64 << WORKER_ID_BITS);

/// Mask applied to the sequence counter on increment
pub const SEQUENCE_MASK: i64 = !(-1_i64 << SEQUENCE_BITS);

/// Shift applied to the worker id when composing an id
pub const WORKER_ID_SHIFT: i64 = SEQUENCE_BITS;

/// Shift applied to the datacenter id when composing an id
pub const DATACENTER_ID_SHIFT: i64 = SEQUENCE_BITS + WORKER_ID_BITS;

/// Shift applied to the relative timestamp when composing an id
pub const TIMESTAMP_SHIFT: i64 = SEQUENCE_BITS + WORKER_ID_BITS + DATACENTER_ID_BITS;

// =============================================================================
// TOKEN LIFETIMES
// =============================================================================

/// Default access token lifetime (30 minutes)
pub const DEFAULT_ACCESS_TTL_SECS: u64 = 30 * 60;

/// Default refresh token lifetime (30 days)
pub const DEFAULT_REFRESH_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Default rotation window: a refresh credential closer than this to its
/// expiry is rotated on next use (48 hours)
pub const DEFAULT_ROTATION_WINDOW_SECS: u64 = 48 * 60 * 60;

/// Fallback TTL for blacklisting a token whose remaining lifetime is
/// already zero or negative (5 minutes)
pub const BLACKLIST_FALLBACK_TTL_SECS: u64 = 5 * 60;

// =============================================================================
// CACHE CONFIGURATION
// =============================================================================

/// Maximum number of blacklisted token ids kept in the fast-path cache
pub const CACHE_MAX_BLACKLIST_ENTRIES: u64 = 500_000;

/// Time-to-live for cached blacklist entries. Entries carry their own
/// expiry; this bounds how long the cache retains them regardless.
pub const CACHE_TTL_BLACKLIST_SECS: u64 = DEFAULT_ACCESS_TTL_SECS;

// =============================================================================
// API CONFIGURATION
// =============================================================================

/// Default auth service API port
pub const AUTH_SERVICE_PORT: u16 = 8080;

/// API version prefix
pub const API_VERSION: &str = "v1";

/// Maximum request body size (1 MB)
pub const MAX_REQUEST_BODY_SIZE: usize = 1024 * 1024;

// =============================================================================
// BLACKLIST REASONS
// =============================================================================

/// Reason recorded when a principal logs out
pub const REASON_LOGOUT: &str = "Logout";

/// Reason recorded when an administrator revokes an access token
pub const REASON_ADMIN_REVOKED: &str = "Admin revoked access token";

// =============================================================================
// ENVIRONMENT VARIABLE NAMES
// =============================================================================

/// Environment variable for the JWT signing secret (required)
pub const ENV_JWT_SECRET: &str = "AUTH_JWT_SECRET";

/// Environment variable for the access token lifetime, in seconds
pub const ENV_ACCESS_TTL: &str = "AUTH_ACCESS_TTL_SECS";

/// Environment variable for the refresh token lifetime, in seconds
pub const ENV_REFRESH_TTL: &str = "AUTH_REFRESH_TTL_SECS";

/// Environment variable for the rotation window, in seconds
pub const ENV_ROTATION_WINDOW: &str = "AUTH_ROTATION_WINDOW_SECS";

/// Environment variable for the snowflake datacenter id (0-31)
pub const ENV_SNOWFLAKE_DATACENTER: &str = "AUTH_SNOWFLAKE_DATACENTER";

/// Environment variable for the snowflake worker id (0-31)
pub const ENV_SNOWFLAKE_WORKER: &str = "AUTH_SNOWFLAKE_WORKER";

/// Environment variable for the node label recorded in id audit rows
pub const ENV_SNOWFLAKE_NODE: &str = "AUTH_SNOWFLAKE_NODE";

/// Environment variable for the HTTP bind host
pub const ENV_API_HOST: &str = "AUTH_API_HOST";

/// Environment variable for the HTTP bind port
pub const ENV_API_PORT: &str = "AUTH_API_PORT";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snowflake_layout() {
        // 41 bits of timestamp + 5 + 5 + 12 fills the non-sign bits of an i64
        assert_eq!(TIMESTAMP_SHIFT, 22);
        assert_eq!(DATACENTER_ID_SHIFT, 17);
        assert_eq!(WORKER_ID_SHIFT, 12);
        assert_eq!(MAX_DATACENTER_ID, 31);
        assert_eq!(MAX_WORKER_ID, 31);
        assert_eq!(SEQUENCE_MASK, 4095);
    }

    #[test]
    fn test_rotation_window_default() {
        assert_eq!(DEFAULT_ROTATION_WINDOW_SECS, 48 * 3600);
        assert!(DEFAULT_REFRESH_TTL_SECS > DEFAULT_ROTATION_WINDOW_SECS);
    }
}
