//! # Configuration for the Auth Backend
//!
//! This module handles configuration loading and validation.
//! All values are fixed at process start; there is no per-tenant keying
//! and no runtime rotation of the signing secret.

use crate::constants::*;
use crate::error::{AuthError, AuthResult};
use serde::{Deserialize, Serialize};
use std::env;

// =============================================================================
// SERVICE CONFIGURATION
// =============================================================================

/// Configuration for the auth service
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthServiceConfig {
    /// API server configuration
    pub api: ApiConfig,

    /// JWT signing and lifetime configuration
    pub jwt: JwtConfig,

    /// Snowflake id generator configuration
    pub snowflake: SnowflakeConfig,

    /// Blacklist cache configuration
    pub cache: CacheConfig,
}

impl AuthServiceConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AuthResult<Self> {
        let mut config = Self::default();

        if let Ok(secret) = env::var(ENV_JWT_SECRET) {
            config.jwt.secret = secret;
        }
        if let Ok(ttl) = env::var(ENV_ACCESS_TTL) {
            config.jwt.access_ttl_secs = parse_env(ENV_ACCESS_TTL, &ttl)?;
        }
        if let Ok(ttl) = env::var(ENV_REFRESH_TTL) {
            config.jwt.refresh_ttl_secs = parse_env(ENV_REFRESH_TTL, &ttl)?;
        }
        if let Ok(window) = env::var(ENV_ROTATION_WINDOW) {
            config.jwt.rotation_window_secs = parse_env(ENV_ROTATION_WINDOW, &window)?;
        }

        if let Ok(dc) = env::var(ENV_SNOWFLAKE_DATACENTER) {
            config.snowflake.datacenter_id = parse_env(ENV_SNOWFLAKE_DATACENTER, &dc)?;
        }
        if let Ok(worker) = env::var(ENV_SNOWFLAKE_WORKER) {
            config.snowflake.worker_id = parse_env(ENV_SNOWFLAKE_WORKER, &worker)?;
        }
        if let Ok(node) = env::var(ENV_SNOWFLAKE_NODE) {
            config.snowflake.node = node;
        }

        if let Ok(host) = env::var(ENV_API_HOST) {
            config.api.host = host;
        }
        if let Ok(port) = env::var(ENV_API_PORT) {
            config.api.port = parse_env(ENV_API_PORT, &port)?;
        }

        Ok(config)
    }

    /// Validate the configuration, failing fast on anything out of range
    pub fn validate(&self) -> AuthResult<()> {
        self.jwt.validate()?;
        self.snowflake.validate()?;
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> AuthResult<T> {
    value
        .parse()
        .map_err(|_| AuthError::Configuration(format!("invalid value for {}: {}", name, value)))
}

// =============================================================================
// JWT CONFIGURATION
// =============================================================================

/// JWT signing and lifetime configuration.
///
/// One symmetric secret for both token uses; access and refresh tokens
/// differ only in lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Shared HMAC secret. Never serialized.
    #[serde(skip_serializing, default)]
    pub secret: String,

    /// Access token lifetime in seconds
    pub access_ttl_secs: u64,

    /// Refresh token lifetime in seconds
    pub refresh_ttl_secs: u64,

    /// Rotation window in seconds: refresh credentials closer than this to
    /// expiry are rotated on next use
    pub rotation_window_secs: u64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            access_ttl_secs: DEFAULT_ACCESS_TTL_SECS,
            refresh_ttl_secs: DEFAULT_REFRESH_TTL_SECS,
            rotation_window_secs: DEFAULT_ROTATION_WINDOW_SECS,
        }
    }
}

impl JwtConfig {
    /// Validate lifetimes and the secret
    pub fn validate(&self) -> AuthResult<()> {
        if self.secret.is_empty() {
            return Err(AuthError::MissingEnvVar(ENV_JWT_SECRET.into()));
        }
        if self.access_ttl_secs == 0 || self.refresh_ttl_secs == 0 {
            return Err(AuthError::Configuration(
                "token lifetimes must be positive".into(),
            ));
        }
        if self.rotation_window_secs >= self.refresh_ttl_secs {
            return Err(AuthError::Configuration(
                "rotation window must be shorter than the refresh lifetime".into(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// SNOWFLAKE CONFIGURATION
// =============================================================================

/// Snowflake id generator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnowflakeConfig {
    /// Datacenter id, 0-31
    pub datacenter_id: i64,

    /// Worker id, 0-31
    pub worker_id: i64,

    /// Label recorded in id audit rows
    pub node: String,
}

impl Default for SnowflakeConfig {
    fn default() -> Self {
        Self {
            datacenter_id: 1,
            worker_id: 1,
            node: "unknown".into(),
        }
    }
}

impl SnowflakeConfig {
    /// Validate datacenter/worker ranges
    pub fn validate(&self) -> AuthResult<()> {
        if self.datacenter_id < 0 || self.datacenter_id > MAX_DATACENTER_ID {
            return Err(AuthError::Configuration(format!(
                "datacenter id {} out of range 0-{}",
                self.datacenter_id, MAX_DATACENTER_ID
            )));
        }
        if self.worker_id < 0 || self.worker_id > MAX_WORKER_ID {
            return Err(AuthError::Configuration(format!(
                "worker id {} out of range 0-{}",
                self.worker_id, MAX_WORKER_ID
            )));
        }
        Ok(())
    }
}

// =============================================================================
// API CONFIGURATION
// =============================================================================

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Enable CORS
    pub enable_cors: bool,

    /// Maximum request body size in bytes
    pub max_body_size: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: AUTH_SERVICE_PORT,
            enable_cors: true,
            max_body_size: MAX_REQUEST_BODY_SIZE,
        }
    }
}

impl ApiConfig {
    /// Get the bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// CACHE CONFIGURATION
// =============================================================================

/// Blacklist fast-path cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Enable the cache in front of the durable blacklist store
    pub enabled: bool,

    /// Maximum number of cached blacklist entries
    pub max_entries: u64,

    /// Cache-level TTL in seconds
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: CACHE_MAX_BLACKLIST_ENTRIES,
            ttl_secs: CACHE_TTL_BLACKLIST_SECS,
        }
    }
}
