use axum::{
    extract::State,
    routing::{get, post},
    Extension, Router,
};

use crate::auth::service::{
    self, LoginRequest, RefreshRequest, RegisterRequest, TokenResponse,
};
use crate::auth::SessionClaims;
use crate::audit::AuditTag;
use crate::context::Identity;
use crate::error::ApiError;
use crate::extractors::{AuthUser, ClientInfo, Json};
use crate::models::operation_log::OperationType;
use crate::response::ApiResponse;

use super::AppState;

// ── Audit tags ──

const LOGIN_AUDIT: AuditTag =
    AuditTag::new("auth", OperationType::Login, "User login").without_params();
const REGISTER_AUDIT: AuditTag =
    AuditTag::new("auth", OperationType::Create, "User registration").without_params();
const LOGOUT_AUDIT: AuditTag = AuditTag::new("auth", OperationType::Logout, "User logout");

// ── Routes ──

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/validate", get(validate))
}

// ── Handlers ──

/// Authenticate with username and password.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token pair issued", body = ApiResponse<TokenResponse>),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub(crate) async fn login(
    State(state): State<AppState>,
    client: ClientInfo,
    Json(payload): Json<LoginRequest>,
) -> Result<ApiResponse<TokenResponse>, ApiError> {
    // Pre-authentication: the request identity is not yet established, so
    // the attempted username stands in as the audit actor. Attempts against
    // unknown usernames skip the operation log but always land in the login
    // history.
    let identity = Identity::new(payload.username.clone(), payload.username.clone());

    let response = state
        .audit
        .record(
            LOGIN_AUDIT,
            &identity,
            &client,
            "auth::service::login",
            None,
            service::login(&state.db, &state.codec, &state.config, &payload, &client),
        )
        .await?;

    Ok(ApiResponse::success(response))
}

/// Register a new account.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created and logged in", body = ApiResponse<TokenResponse>),
        (status = 400, description = "Business rule violated"),
        (status = 422, description = "Invalid input")
    ),
    tag = "auth"
)]
pub(crate) async fn register(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    client: ClientInfo,
    Json(payload): Json<RegisterRequest>,
) -> Result<ApiResponse<TokenResponse>, ApiError> {
    let response = state
        .audit
        .record(
            REGISTER_AUDIT,
            &identity,
            &client,
            "auth::service::register",
            None,
            service::register(&state.db, &state.codec, &state.config, &payload),
        )
        .await?;

    Ok(ApiResponse::success(response))
}

/// Exchange a refresh token for a new token pair.
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Token pair rotated", body = ApiResponse<TokenResponse>),
        (status = 401, description = "Token invalid, revoked or expired")
    ),
    tag = "auth"
)]
pub(crate) async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<ApiResponse<TokenResponse>, ApiError> {
    let response =
        service::refresh_session(&state.db, &state.codec, &state.config, &payload).await?;
    Ok(ApiResponse::success(response))
}

#[derive(Debug, serde::Deserialize, utoipa::ToSchema)]
struct LogoutRequest {
    refresh_token: Option<String>,
}

/// Revoke the presented refresh token. Idempotent.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    request_body = LogoutRequest,
    responses(
        (status = 200, description = "Logged out")
    ),
    tag = "auth"
)]
pub(crate) async fn logout(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    client: ClientInfo,
    Json(payload): Json<LogoutRequest>,
) -> Result<ApiResponse<()>, ApiError> {
    state
        .audit
        .record(
            LOGOUT_AUDIT,
            &identity,
            &client,
            "auth::service::logout",
            None,
            service::logout(&state.db, &identity, payload.refresh_token.as_deref()),
        )
        .await?;

    Ok(ApiResponse::success(()))
}

/// Verify the bearer token and return its claims.
#[utoipa::path(
    get,
    path = "/api/auth/validate",
    responses(
        (status = 200, description = "Token is valid", body = ApiResponse<SessionClaims>),
        (status = 401, description = "Token missing or invalid")
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub(crate) async fn validate(AuthUser(claims): AuthUser) -> ApiResponse<SessionClaims> {
    ApiResponse::success(claims)
}
