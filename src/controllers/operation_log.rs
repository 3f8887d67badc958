use axum::{
    extract::{Path, Query, State},
    routing::{delete, get},
    Extension, Router,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::audit::query::{self, OperationLogFilter, OperationLogStats};
use crate::audit::AuditTag;
use crate::context::Identity;
use crate::error::ApiError;
use crate::extractors::{AuthUser, ClientInfo, Pagination};
use crate::models::operation_log::{Model as OperationLogModel, OperationType};
use crate::response::{ApiResponse, PageResult};

use super::AppState;

// ── Audit tags ──

const PURGE_AUDIT: AuditTag = AuditTag::new(
    "operation-log",
    OperationType::Delete,
    "Purge operation logs before cutoff",
);

// ── Routes ──

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/stats", get(stats))
        .route("/failures", get(recent_failures))
        .route("/user/{user_id}", get(list_for_user))
        .route("/retention", delete(purge_before))
        .route("/{id}", get(find_by_id))
}

// ── Request / Response types ──

#[derive(Debug, Deserialize, IntoParams)]
struct FailuresQuery {
    /// Number of failures to return, default 20
    limit: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams)]
struct RetentionQuery {
    /// Delete records created before this instant
    before: NaiveDateTime,
}

#[derive(Debug, Serialize, ToSchema)]
struct PurgeResult {
    deleted: u64,
}

// ── Handlers ──

/// Page through the audit trail, newest first.
#[utoipa::path(
    get,
    path = "/api/operation-logs",
    params(OperationLogFilter, Pagination),
    responses(
        (status = 200, description = "Audit records", body = ApiResponse<PageResult<OperationLogModel>>),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = [])),
    tag = "operation-log"
)]
pub(crate) async fn list(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(filter): Query<OperationLogFilter>,
    page: Pagination,
) -> Result<ApiResponse<PageResult<OperationLogModel>>, ApiError> {
    let result = query::list(&state.db, &filter, page.limit, page.offset).await?;
    Ok(ApiResponse::success(result))
}

/// A single audit record.
#[utoipa::path(
    get,
    path = "/api/operation-logs/{id}",
    params(("id" = String, Path, description = "Operation log id")),
    responses(
        (status = 200, description = "Audit record", body = ApiResponse<OperationLogModel>),
        (status = 404, description = "No such record")
    ),
    security(("bearer_auth" = [])),
    tag = "operation-log"
)]
pub(crate) async fn find_by_id(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> Result<ApiResponse<OperationLogModel>, ApiError> {
    let record = query::find_by_id(&state.db, &id).await?;
    Ok(ApiResponse::success(record))
}

/// Audit records for one actor.
#[utoipa::path(
    get,
    path = "/api/operation-logs/user/{user_id}",
    params(("user_id" = String, Path, description = "User id"), Pagination),
    responses(
        (status = 200, description = "Audit records", body = ApiResponse<PageResult<OperationLogModel>>)
    ),
    security(("bearer_auth" = [])),
    tag = "operation-log"
)]
pub(crate) async fn list_for_user(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(user_id): Path<String>,
    page: Pagination,
) -> Result<ApiResponse<PageResult<OperationLogModel>>, ApiError> {
    let result = query::logs_for_user(&state.db, &user_id, page.limit, page.offset).await?;
    Ok(ApiResponse::success(result))
}

/// The most recent failed operations.
#[utoipa::path(
    get,
    path = "/api/operation-logs/failures",
    params(FailuresQuery),
    responses(
        (status = 200, description = "Failed operations", body = ApiResponse<Vec<OperationLogModel>>)
    ),
    security(("bearer_auth" = [])),
    tag = "operation-log"
)]
pub(crate) async fn recent_failures(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(q): Query<FailuresQuery>,
) -> Result<ApiResponse<Vec<OperationLogModel>>, ApiError> {
    let limit = q.limit.unwrap_or(20).min(100);
    let rows = query::recent_failures(&state.db, limit).await?;
    Ok(ApiResponse::success(rows))
}

/// Aggregate statistics over the audit trail.
#[utoipa::path(
    get,
    path = "/api/operation-logs/stats",
    responses(
        (status = 200, description = "Audit statistics", body = ApiResponse<OperationLogStats>)
    ),
    security(("bearer_auth" = [])),
    tag = "operation-log"
)]
pub(crate) async fn stats(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<ApiResponse<OperationLogStats>, ApiError> {
    let stats = query::stats(&state.db).await?;
    Ok(ApiResponse::success(stats))
}

/// Retention sweep: delete audit records created before the cutoff.
#[utoipa::path(
    delete,
    path = "/api/operation-logs/retention",
    params(RetentionQuery),
    responses(
        (status = 200, description = "Rows removed", body = ApiResponse<PurgeResult>)
    ),
    security(("bearer_auth" = [])),
    tag = "operation-log"
)]
pub(crate) async fn purge_before(
    State(state): State<AppState>,
    _auth: AuthUser,
    Extension(identity): Extension<Identity>,
    client: ClientInfo,
    Query(q): Query<RetentionQuery>,
) -> Result<ApiResponse<PurgeResult>, ApiError> {
    let deleted = state
        .audit
        .record(
            PURGE_AUDIT,
            &identity,
            &client,
            "audit::query::delete_before",
            Some(serde_json::json!({ "before": q.before })),
            query::delete_before(&state.db, q.before),
        )
        .await?;
    Ok(ApiResponse::success(PurgeResult { deleted }))
}
