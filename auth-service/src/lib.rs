//! # Auth Service for the Device & Operator Management Platform
//!
//! This service owns the token and identity lifecycle:
//! - Snowflake principal id generation with an audit trail
//! - JWT issuance and verification (single shared HS256 secret)
//! - Refresh credential rotation, logout and administrative revocation
//! - Access-token blacklisting with a fast-path cache
//! - Permission-string resolution for the authorization layer
//!
//! Entity CRUD, password hashing and persistent storage engines live in
//! external collaborators behind the traits in `store`, `directory` and
//! `permission`.

pub mod api;
pub mod blacklist;
pub mod directory;
pub mod permission;
pub mod rotation;
pub mod snowflake;
pub mod store;
pub mod token;

use std::sync::Arc;

use shared::config::AuthServiceConfig;

/// Application state shared across handlers
pub struct AppState {
    /// Configuration
    pub config: AuthServiceConfig,
    /// Snowflake id generator
    pub id_generator: Arc<snowflake::SnowflakeIdGenerator>,
    /// Token lifecycle protocol
    pub rotation: rotation::RotationEngine,
    /// Access-token blacklist
    pub blacklist: Arc<blacklist::TokenBlacklist>,
    /// Permission resolver consumed by the admin gate
    pub permissions: Arc<dyn permission::PermissionResolver>,
    /// Principal records and primary-credential checks
    pub directory: Arc<dyn directory::PrincipalDirectory>,
}
