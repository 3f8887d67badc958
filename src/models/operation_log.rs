use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Immutable audit record of a single intercepted business operation.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "operation_logs")]
pub struct Model {
    /// UUID primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Actor user id as carried by the request identity
    pub user_id: String,

    /// Canonical username resolved from the user store, never the raw header
    pub username: String,

    /// Module tag, e.g. "auth", "login-history"
    pub module: String,

    pub operation_type: OperationType,

    /// Human description of the operation
    pub operation: String,

    /// Target method, e.g. "auth::service::login"
    pub method: Option<String>,

    /// Serialized arguments or response, capped at 2000 chars
    pub params: Option<String>,

    pub ip_address: Option<String>,

    pub location: Option<String>,

    pub status: OperationStatus,

    /// Error summary, capped at 500 chars; populated only on FAILURE
    pub error_msg: Option<String>,

    /// Wall-clock duration of the wrapped call in milliseconds
    pub cost_time_ms: i64,

    pub created_at: NaiveDateTime,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    #[sea_orm(string_value = "CREATE")]
    Create,
    #[sea_orm(string_value = "UPDATE")]
    Update,
    #[sea_orm(string_value = "DELETE")]
    Delete,
    #[sea_orm(string_value = "QUERY")]
    Query,
    #[sea_orm(string_value = "EXPORT")]
    Export,
    #[sea_orm(string_value = "IMPORT")]
    Import,
    #[sea_orm(string_value = "LOGIN")]
    Login,
    #[sea_orm(string_value = "LOGOUT")]
    Logout,
    #[sea_orm(string_value = "AUDIT")]
    Audit,
    #[sea_orm(string_value = "OTHER")]
    Other,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    #[sea_orm(string_value = "SUCCESS")]
    Success,
    #[sea_orm(string_value = "FAILURE")]
    Failure,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
