//! # Auth Service
//!
//! Identity and token lifecycle backend for the device & operator
//! management platform.
//!
//! ## Running
//!
//! ```bash
//! # Set required environment variables
//! export AUTH_JWT_SECRET=change-me
//! export AUTH_SNOWFLAKE_DATACENTER=1
//! export AUTH_SNOWFLAKE_WORKER=1
//!
//! # Run the service
//! cargo run --release
//! ```
//!
//! ## API Endpoints
//!
//! - `GET /health` - Health check
//! - `POST /api/v1/operator/login` - Operator login
//! - `POST /api/v1/device/login` - Device login
//! - `POST /api/v1/token/refresh` - Refresh an access token
//! - `POST /api/v1/token/logout` - Logout
//! - `POST /api/v1/admin/token/revoke-refresh` - Admin revoke (refresh)
//! - `POST /api/v1/admin/token/revoke-access` - Admin revoke (access)

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use auth_service::{
    api,
    blacklist::TokenBlacklist,
    directory::MemoryDirectory,
    permission::MemoryPermissionResolver,
    rotation::RotationEngine,
    snowflake::SnowflakeIdGenerator,
    store::{MemoryAuditStore, MemoryBlacklistStore, MemoryCredentialStore},
    AppState,
};
use shared::config::AuthServiceConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .init();

    info!("Starting auth service");
    info!("Version: {}", shared::VERSION);

    // Load and validate configuration
    let config = AuthServiceConfig::from_env()?;
    config.validate()?;

    info!(
        datacenter_id = config.snowflake.datacenter_id,
        worker_id = config.snowflake.worker_id,
        node = %config.snowflake.node,
        "Configuration loaded"
    );

    // Stores. In-memory implementations; production adapters for a
    // document or relational store plug in behind the same traits.
    let audit_store = Arc::new(MemoryAuditStore::new());
    let credential_store = Arc::new(MemoryCredentialStore::new());
    let blacklist_store = Arc::new(MemoryBlacklistStore::new());

    info!("Initializing id generator...");
    let id_generator = Arc::new(SnowflakeIdGenerator::new(&config.snowflake, audit_store)?);

    info!("Initializing blacklist...");
    let blacklist = Arc::new(TokenBlacklist::new(blacklist_store, &config.cache));

    info!("Initializing rotation engine...");
    let rotation = RotationEngine::new(&config.jwt, credential_store, blacklist.clone());

    let state = Arc::new(AppState {
        config: config.clone(),
        id_generator,
        rotation,
        blacklist,
        permissions: Arc::new(MemoryPermissionResolver::new()),
        directory: Arc::new(MemoryDirectory::new()),
    });

    // Serve
    let bind_addr = config.api.bind_addr();
    let router = api::create_router(state);

    info!(addr = %bind_addr, "Auth service listening");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
