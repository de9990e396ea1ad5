//! # Shared Module for the Device & Operator Auth Backend
//!
//! This crate provides common types, errors, configuration and constants
//! used across the authentication service: the token lifecycle protocol,
//! the snowflake ID generator and the permission encoding all build on the
//! definitions here.
//!
//! ## Principals
//!
//! The platform manages two principal kinds with independent identities and
//! credentials:
//!
//! | Kind | Authenticates with | Long-lived credential |
//! |----------|--------------------------|-----------------------|
//! | Operator | phone + password | refresh token |
//! | Device | uuid + signature hash | refresh token |
//!
//! Only refresh tokens are tracked server side (by SHA-256 hash). Access
//! tokens are stateless JWTs, invalidated before expiry only through the
//! blacklist.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

// Re-exports for convenience
pub use config::*;
pub use constants::*;
pub use error::*;
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
