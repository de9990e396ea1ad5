//! # REST API for the Auth Service
//!
//! HTTP surface over the token lifecycle protocol.
//!
//! ## Endpoints
//!
//! - `GET  /health` - Health check
//! - `POST /api/v1/operator/register` - Register an operator
//! - `POST /api/v1/operator/login` - Operator login (phone + password)
//! - `POST /api/v1/device/register` - Register a device
//! - `POST /api/v1/device/login` - Device login (uuid + signature hash)
//! - `POST /api/v1/token/refresh` - Exchange a refresh token
//! - `POST /api/v1/token/logout` - Logout (blacklist + revoke)
//! - `POST /api/v1/admin/token/revoke-refresh` - Force-revoke a refresh token
//! - `POST /api/v1/admin/token/revoke-access` - Force-revoke an access token
//! - `POST /api/v1/admin/blacklist/purge` - Drop expired blacklist entries
//!
//! Admin routes require a bearer token that verifies, is not blacklisted,
//! and whose principal holds the `operator:manage` grant.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use shared::error::AuthError;
use shared::types::*;

use crate::AppState;

/// Grant required for the administrative token endpoints
const ADMIN_GRANT: &str = "operator:manage";

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let admin_routes = Router::new()
        .route("/api/v1/admin/token/revoke-refresh", post(revoke_refresh))
        .route("/api/v1/admin/token/revoke-access", post(revoke_access))
        .route("/api/v1/admin/blacklist/purge", post(purge_blacklist))
        .layer(middleware::from_fn_with_state(state.clone(), require_admin));

    let mut router = Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/operator/register", post(register_operator))
        .route("/api/v1/operator/login", post(login_operator))
        .route("/api/v1/device/register", post(register_device))
        .route("/api/v1/device/login", post(login_device))
        .route("/api/v1/token/refresh", post(refresh_token))
        .route("/api/v1/token/logout", post(logout))
        .merge(admin_routes);

    if state.config.api.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        router = router.layer(cors);
    }

    router.with_state(state)
}

// =============================================================================
// MIDDLEWARE
// =============================================================================

/// Admin gate: bearer token -> verify -> blacklist -> permission check.
///
/// An empty or missing permission set is a hard deny, never default-allow.
async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&request).ok_or(ApiError::Unauthorized)?;

    let claims = state
        .rotation
        .codec()
        .verify(&token)
        .map_err(|_| ApiError::Unauthorized)?;

    if state.blacklist.is_blacklisted(&claims.jti).await? {
        warn!(jti = %claims.jti, "Rejected blacklisted access token");
        return Err(ApiError::Unauthorized);
    }

    let principal_id = claims.principal_id().map_err(|_| ApiError::Unauthorized)?;
    let permissions = state
        .permissions
        .permissions_of(principal_id)
        .await?
        .unwrap_or_default();

    if !permissions.contains(ADMIN_GRANT) {
        return Err(ApiError::Forbidden(format!(
            "missing required grant: {}",
            ADMIN_GRANT
        )));
    }

    Ok(next.run(request).await)
}

fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

// =============================================================================
// HANDLERS
// =============================================================================

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": shared::VERSION,
    }))
}

/// Register an operator: mint a snowflake id, store the directory record
async fn register_operator(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterOperatorRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    info!("Operator registration request received");

    let id = state.id_generator.next_id(PrincipalKind::Operator).await?;
    state
        .directory
        .register_operator(id, &request.phone, &request.password)
        .await?;

    Ok(Json(RegisterResponse { id }))
}

/// Register a device: mint a snowflake id, store the directory record
async fn register_device(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterDeviceRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    info!("Device registration request received");

    let id = state.id_generator.next_id(PrincipalKind::Device).await?;
    state
        .directory
        .register_device(id, &request.uuid, &request.signature_hash)
        .await?;

    Ok(Json(RegisterResponse { id }))
}

/// Operator login: directory check, then a fresh token pair
async fn login_operator(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OperatorLoginRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let principal_id = state
        .directory
        .authenticate_operator(&request.phone, &request.password)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let pair = state
        .rotation
        .login(principal_id, PrincipalKind::Operator)
        .await?;
    Ok(Json(pair))
}

/// Device login: directory check, then a fresh token pair
async fn login_device(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DeviceLoginRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let principal_id = state
        .directory
        .authenticate_device(&request.uuid, &request.signature_hash)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let pair = state
        .rotation
        .login(principal_id, PrincipalKind::Device)
        .await?;
    Ok(Json(pair))
}

/// Exchange a refresh token for a new access token, rotating near expiry
async fn refresh_token(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let pair = state.rotation.refresh(&request.refresh_token).await?;
    Ok(Json(pair))
}

/// Logout: blacklist the access token and revoke the refresh credential
async fn logout(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LogoutRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .rotation
        .logout(&request.access_token, &request.refresh_token)
        .await?;
    Ok(Json(serde_json::json!({ "message": "Logged out successfully" })))
}

/// Administrative revoke of a refresh token
async fn revoke_refresh(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RevokeRefreshRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.rotation.revoke_refresh(&request.refresh_token).await?;
    Ok(Json(
        serde_json::json!({ "message": "Refresh token revoked successfully" }),
    ))
}

/// Administrative revoke of an access token
async fn revoke_access(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RevokeAccessRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.rotation.revoke_access(&request.access_token).await?;
    Ok(Json(
        serde_json::json!({ "message": "Access token revoked successfully" }),
    ))
}

/// Drop blacklist entries whose tokens have expired naturally
async fn purge_blacklist(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let dropped = state.blacklist.purge_expired().await?;
    Ok(Json(serde_json::json!({ "dropped": dropped })))
}

// =============================================================================
// ERROR HANDLING
// =============================================================================

/// API error type. Authentication failures collapse to a single
/// unauthorized response with no detail about which check failed.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    Forbidden(String),
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        if err.is_unauthorized() {
            return ApiError::Unauthorized;
        }
        match err {
            AuthError::CredentialNotFound => ApiError::NotFound(err.to_string()),
            AuthError::PermissionDenied(msg) => ApiError::Forbidden(msg),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => {
                error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".into(),
                )
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_errors_collapse_to_unauthorized() {
        for err in [
            AuthError::InvalidSignature,
            AuthError::TokenExpired,
            AuthError::MalformedToken("junk".into()),
            AuthError::Unauthorized,
        ] {
            assert!(matches!(ApiError::from(err), ApiError::Unauthorized));
        }
    }

    #[test]
    fn test_admin_miss_stays_distinguishable() {
        assert!(matches!(
            ApiError::from(AuthError::CredentialNotFound),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from(AuthError::Storage("down".into())),
            ApiError::Internal(_)
        ));
    }
}
