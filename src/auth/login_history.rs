//! Append-only log of authentication attempts.
//!
//! Every login attempt is recorded, successful or not, including attempts
//! against usernames that do not exist. Recording is best-effort: a storage
//! failure here is logged and swallowed so it can never change the outcome
//! of the login itself.

use chrono::{NaiveDateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extractors::client_info::ClientInfo;
use crate::models::login_history::{self, LoginStatus};
use crate::models::user;
use crate::response::PageResult;

/// Record a successful login. Never fails the caller.
pub async fn record_success(db: &DatabaseConnection, user: &user::Model, client: &ClientInfo) {
    let attempt = build_attempt(
        Some(user.id.clone()),
        user.username.clone(),
        LoginStatus::Success,
        None,
        client,
    );
    if let Err(e) = attempt.insert(db).await {
        tracing::error!(error = %e, username = %user.username, "failed to record login success");
    }
}

/// Record a failed login attempt. `user_id` is `None` only when the
/// presented username resolved to no account. Never fails the caller.
pub async fn record_failure(
    db: &DatabaseConnection,
    user_id: Option<String>,
    username: &str,
    reason: &str,
    client: &ClientInfo,
) {
    let attempt = build_attempt(
        user_id,
        username.to_string(),
        LoginStatus::Failure,
        Some(reason.to_string()),
        client,
    );
    if let Err(e) = attempt.insert(db).await {
        tracing::error!(error = %e, username = %username, "failed to record login failure");
    }
}

fn build_attempt(
    user_id: Option<String>,
    username: String,
    status: LoginStatus,
    fail_reason: Option<String>,
    client: &ClientInfo,
) -> login_history::ActiveModel {
    let now = Utc::now().naive_utc();
    login_history::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        user_id: Set(user_id),
        username: Set(username),
        login_time: Set(now),
        ip_address: Set(client.ip.clone()),
        user_agent: Set(client.user_agent.clone()),
        location: Set(client.location.clone()),
        status: Set(status),
        fail_reason: Set(fail_reason),
        created_at: Set(now),
    }
}

/// Query filter for login history listings.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct LoginHistoryFilter {
    /// Restrict to SUCCESS or FAILURE rows
    pub status: Option<LoginStatus>,
    /// Inclusive lower bound on login time
    pub start: Option<NaiveDateTime>,
    /// Inclusive upper bound on login time
    pub end: Option<NaiveDateTime>,
}

/// Page through a user's login history, newest first.
pub async fn history_for_user(
    db: &DatabaseConnection,
    user_id: &str,
    filter: &LoginHistoryFilter,
    limit: u64,
    offset: u64,
) -> Result<PageResult<login_history::Model>, ApiError> {
    let mut query = login_history::Entity::find()
        .filter(login_history::Column::UserId.eq(user_id));

    if let Some(status) = filter.status {
        query = query.filter(login_history::Column::Status.eq(status));
    }
    if let Some(start) = filter.start {
        query = query.filter(login_history::Column::LoginTime.gte(start));
    }
    if let Some(end) = filter.end {
        query = query.filter(login_history::Column::LoginTime.lte(end));
    }

    let total = query.clone().count(db).await?;
    let items = query
        .order_by_desc(login_history::Column::LoginTime)
        .limit(limit)
        .offset(offset)
        .all(db)
        .await?;

    Ok(PageResult::new(items, total, limit, offset))
}

/// The user's most recent attempts regardless of outcome.
pub async fn recent_for_user(
    db: &DatabaseConnection,
    user_id: &str,
    limit: u64,
) -> Result<Vec<login_history::Model>, ApiError> {
    let rows = login_history::Entity::find()
        .filter(login_history::Column::UserId.eq(user_id))
        .order_by_desc(login_history::Column::LoginTime)
        .limit(limit)
        .all(db)
        .await?;
    Ok(rows)
}

/// The user's most recent successful login, if any.
pub async fn last_success(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Option<login_history::Model>, ApiError> {
    let row = login_history::Entity::find()
        .filter(login_history::Column::UserId.eq(user_id))
        .filter(login_history::Column::Status.eq(LoginStatus::Success))
        .order_by_desc(login_history::Column::LoginTime)
        .one(db)
        .await?;
    Ok(row)
}

pub async fn count_for_user(db: &DatabaseConnection, user_id: &str) -> Result<u64, ApiError> {
    let count = login_history::Entity::find()
        .filter(login_history::Column::UserId.eq(user_id))
        .count(db)
        .await?;
    Ok(count)
}

/// Failed attempts for a user since the given instant. Feeds lockout and
/// anomaly review.
pub async fn count_failures_since(
    db: &DatabaseConnection,
    user_id: &str,
    since: NaiveDateTime,
) -> Result<u64, ApiError> {
    let count = login_history::Entity::find()
        .filter(login_history::Column::UserId.eq(user_id))
        .filter(login_history::Column::Status.eq(LoginStatus::Failure))
        .filter(login_history::Column::LoginTime.gte(since))
        .count(db)
        .await?;
    Ok(count)
}

/// Retention sweep: delete attempts older than the cutoff. Returns rows
/// removed.
pub async fn delete_before(
    db: &DatabaseConnection,
    cutoff: NaiveDateTime,
) -> Result<u64, ApiError> {
    let result = login_history::Entity::delete_many()
        .filter(login_history::Column::LoginTime.lt(cutoff))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Erase a user's entire attempt history. Returns rows removed.
pub async fn delete_for_user(db: &DatabaseConnection, user_id: &str) -> Result<u64, ApiError> {
    let result = login_history::Entity::delete_many()
        .filter(login_history::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}
