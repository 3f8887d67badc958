use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Append-only record of one authentication attempt.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "login_history")]
pub struct Model {
    /// UUID primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// None when the attempted username did not resolve to an account
    pub user_id: Option<String>,

    /// Username as presented, stored even for unknown accounts
    pub username: String,

    pub login_time: NaiveDateTime,

    pub ip_address: Option<String>,

    pub user_agent: Option<String>,

    /// Coarse geolocation label derived from the IP
    pub location: Option<String>,

    pub status: LoginStatus,

    /// Populated only on FAILURE
    pub fail_reason: Option<String>,

    pub created_at: NaiveDateTime,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoginStatus {
    #[sea_orm(string_value = "SUCCESS")]
    Success,
    #[sea_orm(string_value = "FAILURE")]
    Failure,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
