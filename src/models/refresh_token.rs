use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Refresh token ledger entry.
///
/// The ledger, not the token's embedded expiry claim, is the authority on
/// whether a refresh token may still be redeemed. Rows are revoked, never
/// deleted, so a superseded token stays visible to compliance review.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "refresh_tokens")]
pub struct Model {
    /// UUID primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// SHA-256 hash of the signed token string; the raw token is never stored
    #[sea_orm(unique)]
    pub token_hash: String,

    /// The user who owns this refresh token
    pub user_id: String,

    /// When the token expires (ledger-authoritative)
    pub expires_at: NaiveDateTime,

    /// Set on logout, on rotation, or by administrative bulk revoke
    pub revoked: bool,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        self.expires_at < now
    }
}
