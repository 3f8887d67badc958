use axum::{
    extract::{Path, Query, State},
    routing::{delete, get},
    Extension, Router,
};
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::audit::AuditTag;
use crate::auth::login_history::{self, LoginHistoryFilter};
use crate::context::Identity;
use crate::error::ApiError;
use crate::extractors::{AuthUser, ClientInfo, Pagination};
use crate::models::login_history::Model as LoginHistoryModel;
use crate::models::operation_log::OperationType;
use crate::response::{ApiResponse, PageResult};

use super::AppState;

// ── Audit tags ──

const PURGE_AUDIT: AuditTag = AuditTag::new(
    "login-history",
    OperationType::Delete,
    "Purge login history before cutoff",
);
const ERASE_USER_AUDIT: AuditTag = AuditTag::new(
    "login-history",
    OperationType::Delete,
    "Erase login history for user",
);

// ── Routes ──

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/user/{user_id}", get(list_for_user).delete(erase_for_user))
        .route("/user/{user_id}/recent", get(recent_for_user))
        .route("/user/{user_id}/last-success", get(last_success))
        .route("/user/{user_id}/summary", get(summary_for_user))
        .route("/retention", delete(purge_before))
}

// ── Request / Response types ──

#[derive(Debug, Deserialize, IntoParams)]
struct RecentQuery {
    /// Number of attempts to return, default 10
    limit: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams)]
struct RetentionQuery {
    /// Delete attempts recorded before this instant
    before: NaiveDateTime,
}

#[derive(Debug, Serialize, ToSchema)]
struct LoginSummary {
    total_attempts: u64,
    failures_last_24h: u64,
}

#[derive(Debug, Serialize, ToSchema)]
struct PurgeResult {
    deleted: u64,
}

// ── Handlers ──

/// Page through a user's login history, newest first.
#[utoipa::path(
    get,
    path = "/api/login-history/user/{user_id}",
    params(("user_id" = String, Path, description = "User id"), LoginHistoryFilter, Pagination),
    responses(
        (status = 200, description = "Login attempts", body = ApiResponse<PageResult<LoginHistoryModel>>),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = [])),
    tag = "login-history"
)]
pub(crate) async fn list_for_user(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(user_id): Path<String>,
    Query(filter): Query<LoginHistoryFilter>,
    page: Pagination,
) -> Result<ApiResponse<PageResult<LoginHistoryModel>>, ApiError> {
    let result =
        login_history::history_for_user(&state.db, &user_id, &filter, page.limit, page.offset)
            .await?;
    Ok(ApiResponse::success(result))
}

/// The user's most recent attempts regardless of outcome.
#[utoipa::path(
    get,
    path = "/api/login-history/user/{user_id}/recent",
    params(("user_id" = String, Path, description = "User id"), RecentQuery),
    responses(
        (status = 200, description = "Recent attempts", body = ApiResponse<Vec<LoginHistoryModel>>)
    ),
    security(("bearer_auth" = [])),
    tag = "login-history"
)]
pub(crate) async fn recent_for_user(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(user_id): Path<String>,
    Query(query): Query<RecentQuery>,
) -> Result<ApiResponse<Vec<LoginHistoryModel>>, ApiError> {
    let limit = query.limit.unwrap_or(10).min(100);
    let rows = login_history::recent_for_user(&state.db, &user_id, limit).await?;
    Ok(ApiResponse::success(rows))
}

/// The user's most recent successful login.
#[utoipa::path(
    get,
    path = "/api/login-history/user/{user_id}/last-success",
    params(("user_id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Last successful login", body = ApiResponse<LoginHistoryModel>),
        (status = 404, description = "User has never logged in")
    ),
    security(("bearer_auth" = [])),
    tag = "login-history"
)]
pub(crate) async fn last_success(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(user_id): Path<String>,
) -> Result<ApiResponse<LoginHistoryModel>, ApiError> {
    let row = login_history::last_success(&state.db, &user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("No successful login on record".to_string()))?;
    Ok(ApiResponse::success(row))
}

/// Attempt counts for a user, including recent failures.
#[utoipa::path(
    get,
    path = "/api/login-history/user/{user_id}/summary",
    params(("user_id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Attempt summary", body = ApiResponse<LoginSummary>)
    ),
    security(("bearer_auth" = [])),
    tag = "login-history"
)]
pub(crate) async fn summary_for_user(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(user_id): Path<String>,
) -> Result<ApiResponse<LoginSummary>, ApiError> {
    let total_attempts = login_history::count_for_user(&state.db, &user_id).await?;
    let since = Utc::now().naive_utc() - chrono::Duration::hours(24);
    let failures_last_24h =
        login_history::count_failures_since(&state.db, &user_id, since).await?;
    Ok(ApiResponse::success(LoginSummary {
        total_attempts,
        failures_last_24h,
    }))
}

/// Retention sweep: delete attempts recorded before the cutoff.
#[utoipa::path(
    delete,
    path = "/api/login-history/retention",
    params(RetentionQuery),
    responses(
        (status = 200, description = "Rows removed", body = ApiResponse<PurgeResult>)
    ),
    security(("bearer_auth" = [])),
    tag = "login-history"
)]
pub(crate) async fn purge_before(
    State(state): State<AppState>,
    _auth: AuthUser,
    Extension(identity): Extension<Identity>,
    client: ClientInfo,
    Query(query): Query<RetentionQuery>,
) -> Result<ApiResponse<PurgeResult>, ApiError> {
    let deleted = state
        .audit
        .record(
            PURGE_AUDIT,
            &identity,
            &client,
            "auth::login_history::delete_before",
            Some(serde_json::json!({ "before": query.before })),
            login_history::delete_before(&state.db, query.before),
        )
        .await?;
    Ok(ApiResponse::success(PurgeResult { deleted }))
}

/// Erase a user's entire login history.
#[utoipa::path(
    delete,
    path = "/api/login-history/user/{user_id}",
    params(("user_id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Rows removed", body = ApiResponse<PurgeResult>)
    ),
    security(("bearer_auth" = [])),
    tag = "login-history"
)]
pub(crate) async fn erase_for_user(
    State(state): State<AppState>,
    _auth: AuthUser,
    Extension(identity): Extension<Identity>,
    client: ClientInfo,
    Path(user_id): Path<String>,
) -> Result<ApiResponse<PurgeResult>, ApiError> {
    let deleted = state
        .audit
        .record(
            ERASE_USER_AUDIT,
            &identity,
            &client,
            "auth::login_history::delete_for_user",
            Some(serde_json::json!({ "user_id": user_id })),
            login_history::delete_for_user(&state.db, &user_id),
        )
        .await?;
    Ok(ApiResponse::success(PurgeResult { deleted }))
}
