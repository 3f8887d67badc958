//! Authentication workflows: login, registration, refresh, logout.

use chrono::Duration;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{login_history, refresh, verify_password, TokenCodec};
use crate::config::Config;
use crate::error::ApiError;
use crate::extractors::client_info::ClientInfo;
use crate::models::user::{self, UserResponse, UserRole, UserStatus};
use crate::users;

/// Uniform rejection for bad credentials. Never reveals whether the
/// username exists.
const BAD_CREDENTIALS: &str = "Invalid username or password";

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    pub user: UserResponse,
}

/// Validate credentials and issue a token pair.
///
/// Every attempt lands in the login history: failures record why, and only
/// attempts against usernames that resolve to no account leave `user_id`
/// empty. The caller always sees the same rejection message regardless of
/// which check failed.
pub async fn login(
    db: &DatabaseConnection,
    codec: &TokenCodec,
    config: &Config,
    req: &LoginRequest,
    client: &ClientInfo,
) -> Result<TokenResponse, ApiError> {
    let Some(account) = users::find_by_username(db, &req.username).await? else {
        login_history::record_failure(db, None, &req.username, "unknown username", client).await;
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS.to_string()));
    };

    if !verify_password(&req.password, &account.password_hash)? {
        login_history::record_failure(
            db,
            Some(account.id.clone()),
            &req.username,
            "wrong password",
            client,
        )
        .await;
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS.to_string()));
    }

    if account.status != UserStatus::Active {
        login_history::record_failure(
            db,
            Some(account.id.clone()),
            &req.username,
            "account inactive",
            client,
        )
        .await;
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS.to_string()));
    }

    login_history::record_success(db, &account, client).await;
    users::touch_last_login(db, &account).await?;

    issue_token_pair(db, codec, config, account).await
}

/// Register a new account with the default USER role and log it straight
/// in.
pub async fn register(
    db: &DatabaseConnection,
    codec: &TokenCodec,
    config: &Config,
    req: &RegisterRequest,
) -> Result<TokenResponse, ApiError> {
    if req.password != req.confirm_password {
        return Err(ApiError::Business("Passwords do not match".to_string()));
    }
    if req.username.trim().is_empty() {
        return Err(ApiError::Validation("Username must not be empty".to_string()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    if users::username_taken(db, &req.username).await? {
        return Err(ApiError::Business("Username is already taken".to_string()));
    }
    if let Some(email) = req.email.as_deref() {
        if users::email_taken(db, email).await? {
            return Err(ApiError::Business("Email is already registered".to_string()));
        }
    }

    let created = users::create(
        db,
        users::NewUser {
            username: &req.username,
            password: &req.password,
            name: &req.name,
            email: req.email.as_deref(),
            phone: req.phone.as_deref(),
            role: UserRole::User,
        },
    )
    .await?;

    issue_token_pair(db, codec, config, created).await
}

/// Redeem a refresh token for a fresh token pair.
pub async fn refresh_session(
    db: &DatabaseConnection,
    codec: &TokenCodec,
    config: &Config,
    req: &RefreshRequest,
) -> Result<TokenResponse, ApiError> {
    let refresh_ttl = Duration::seconds(config.refresh_token_ttl_secs);
    let (account, new_refresh) = refresh::redeem(db, codec, refresh_ttl, &req.refresh_token).await?;

    let access_ttl = Duration::seconds(config.access_token_ttl_secs);
    let access_token = codec.issue_access_token(
        &account.id,
        &account.username,
        role_value(account.role),
        access_ttl,
    )?;

    Ok(TokenResponse {
        access_token,
        refresh_token: new_refresh,
        token_type: "Bearer".to_string(),
        expires_in: config.access_token_ttl_secs,
        user: account.into(),
    })
}

/// Log out: revoke every live refresh token of the resolved caller, plus
/// the presented token when the caller did not resolve. Always succeeds;
/// logout is idempotent and never reveals whether a token was live.
pub async fn logout(
    db: &DatabaseConnection,
    identity: &crate::context::Identity,
    refresh_token: Option<&str>,
) -> Result<(), ApiError> {
    if !identity.is_system() {
        if let Some(account) = users::resolve_actor(db, &identity.user_id).await? {
            refresh::revoke_all(db, &account.id).await?;
            return Ok(());
        }
    }
    if let Some(token) = refresh_token {
        refresh::revoke_one(db, token).await?;
    }
    Ok(())
}

async fn issue_token_pair(
    db: &DatabaseConnection,
    codec: &TokenCodec,
    config: &Config,
    account: user::Model,
) -> Result<TokenResponse, ApiError> {
    let access_ttl = Duration::seconds(config.access_token_ttl_secs);
    let refresh_ttl = Duration::seconds(config.refresh_token_ttl_secs);

    let access_token = codec.issue_access_token(
        &account.id,
        &account.username,
        role_value(account.role),
        access_ttl,
    )?;
    let refresh_token = refresh::issue(db, codec, &account, refresh_ttl).await?;

    Ok(TokenResponse {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: config.access_token_ttl_secs,
        user: account.into(),
    })
}

fn role_value(role: UserRole) -> &'static str {
    match role {
        UserRole::SuperAdmin => "SUPER_ADMIN",
        UserRole::Admin => "ADMIN",
        UserRole::Auditor => "AUDITOR",
        UserRole::User => "USER",
        UserRole::Guest => "GUEST",
    }
}
