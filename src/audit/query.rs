use chrono::NaiveDateTime;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::ApiError;
use crate::models::operation_log::{self, OperationStatus, OperationType};
use crate::response::PageResult;

/// Query filter for audit listings.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct OperationLogFilter {
    pub module: Option<String>,
    pub operation_type: Option<OperationType>,
    pub status: Option<OperationStatus>,
    pub username: Option<String>,
    /// Inclusive lower bound on creation time
    pub start: Option<NaiveDateTime>,
    /// Inclusive upper bound on creation time
    pub end: Option<NaiveDateTime>,
}

fn apply_filter(
    mut query: sea_orm::Select<operation_log::Entity>,
    filter: &OperationLogFilter,
) -> sea_orm::Select<operation_log::Entity> {
    if let Some(module) = &filter.module {
        query = query.filter(operation_log::Column::Module.eq(module));
    }
    if let Some(operation_type) = filter.operation_type {
        query = query.filter(operation_log::Column::OperationType.eq(operation_type));
    }
    if let Some(status) = filter.status {
        query = query.filter(operation_log::Column::Status.eq(status));
    }
    if let Some(username) = &filter.username {
        query = query.filter(operation_log::Column::Username.eq(username));
    }
    if let Some(start) = filter.start {
        query = query.filter(operation_log::Column::CreatedAt.gte(start));
    }
    if let Some(end) = filter.end {
        query = query.filter(operation_log::Column::CreatedAt.lte(end));
    }
    query
}

/// Page through audit records, newest first.
pub async fn list(
    db: &DatabaseConnection,
    filter: &OperationLogFilter,
    limit: u64,
    offset: u64,
) -> Result<PageResult<operation_log::Model>, ApiError> {
    let query = apply_filter(operation_log::Entity::find(), filter);

    let total = query.clone().count(db).await?;
    let items = query
        .order_by_desc(operation_log::Column::CreatedAt)
        .limit(limit)
        .offset(offset)
        .all(db)
        .await?;

    Ok(PageResult::new(items, total, limit, offset))
}

pub async fn find_by_id(
    db: &DatabaseConnection,
    id: &str,
) -> Result<operation_log::Model, ApiError> {
    operation_log::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Operation log {} not found", id)))
}

/// Audit records for one actor, newest first.
pub async fn logs_for_user(
    db: &DatabaseConnection,
    user_id: &str,
    limit: u64,
    offset: u64,
) -> Result<PageResult<operation_log::Model>, ApiError> {
    let query = operation_log::Entity::find()
        .filter(operation_log::Column::UserId.eq(user_id));

    let total = query.clone().count(db).await?;
    let items = query
        .order_by_desc(operation_log::Column::CreatedAt)
        .limit(limit)
        .offset(offset)
        .all(db)
        .await?;

    Ok(PageResult::new(items, total, limit, offset))
}

/// Recent failed operations, for incident review.
pub async fn recent_failures(
    db: &DatabaseConnection,
    limit: u64,
) -> Result<Vec<operation_log::Model>, ApiError> {
    let rows = operation_log::Entity::find()
        .filter(operation_log::Column::Status.eq(OperationStatus::Failure))
        .order_by_desc(operation_log::Column::CreatedAt)
        .limit(limit)
        .all(db)
        .await?;
    Ok(rows)
}

/// Aggregate view of the audit trail.
#[derive(Debug, Serialize, ToSchema)]
pub struct OperationLogStats {
    pub total: u64,
    pub success_count: u64,
    pub failure_count: u64,
    /// Fraction of operations that succeeded, 0.0 when the trail is empty
    pub success_rate: f64,
    /// Mean wrapped-call duration in milliseconds, 0.0 when empty
    pub avg_cost_ms: f64,
    /// Slowest wrapped call in milliseconds, 0 when empty
    pub max_cost_ms: i64,
}

pub async fn stats(db: &DatabaseConnection) -> Result<OperationLogStats, ApiError> {
    let total = operation_log::Entity::find().count(db).await?;
    let success_count = operation_log::Entity::find()
        .filter(operation_log::Column::Status.eq(OperationStatus::Success))
        .count(db)
        .await?;
    // Counted independently rather than derived from `total`; rows landing
    // between the two counts must not underflow.
    let failure_count = operation_log::Entity::find()
        .filter(operation_log::Column::Status.eq(OperationStatus::Failure))
        .count(db)
        .await?;

    let success_rate = if total > 0 {
        success_count as f64 / total as f64
    } else {
        0.0
    };

    let slowest = operation_log::Entity::find()
        .order_by_desc(operation_log::Column::CostTimeMs)
        .one(db)
        .await?;
    let max_cost_ms = slowest.map(|row| row.cost_time_ms).unwrap_or(0);

    let avg_cost_ms = if total > 0 {
        let all_costs: Vec<i64> = operation_log::Entity::find()
            .select_only()
            .column(operation_log::Column::CostTimeMs)
            .into_tuple()
            .all(db)
            .await?;
        all_costs.iter().sum::<i64>() as f64 / total as f64
    } else {
        0.0
    };

    Ok(OperationLogStats {
        total,
        success_count,
        failure_count,
        success_rate,
        avg_cost_ms,
        max_cost_ms,
    })
}

/// Retention sweep: delete audit records older than the cutoff. Returns
/// rows removed.
pub async fn delete_before(
    db: &DatabaseConnection,
    cutoff: NaiveDateTime,
) -> Result<u64, ApiError> {
    let result = operation_log::Entity::delete_many()
        .filter(operation_log::Column::CreatedAt.lt(cutoff))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}
