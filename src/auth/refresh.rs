//! Refresh token ledger: issue, redeem (rotate), revoke.
//!
//! The ledger is the single authority on whether a refresh token may still
//! be redeemed. A token that verifies cryptographically but whose ledger row
//! is revoked or expired is dead. Redemption runs inside a transaction and
//! flips the row with a conditional update, so two concurrent redemptions of
//! the same token resolve to exactly one winner.

use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait, Value,
};
use uuid::Uuid;

use crate::auth::{hash_token, TokenCodec};
use crate::error::ApiError;
use crate::models::{refresh_token, user};
use crate::users;

/// Issue a fresh refresh token for a user and record it in the ledger.
///
/// Returns the raw signed token; only its SHA-256 hash is stored.
pub async fn issue<C: ConnectionTrait>(
    db: &C,
    codec: &TokenCodec,
    user: &user::Model,
    ttl: Duration,
) -> Result<String, ApiError> {
    let token = codec.issue_refresh_token(&user.id, &user.username, ttl)?;
    let now = Utc::now().naive_utc();

    let entry = refresh_token::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        token_hash: Set(hash_token(&token)),
        user_id: Set(user.id.clone()),
        expires_at: Set(now + ttl),
        revoked: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
    };
    entry.insert(db).await?;

    Ok(token)
}

/// Redeem a refresh token: revoke it and issue a successor in one atomic
/// step.
///
/// Fails with `Unauthorized` when the token does not verify, is unknown to
/// the ledger, is revoked, is past its ledger expiry, or its owner is gone
/// or inactive. On success returns the owning user and the new raw token.
pub async fn redeem(
    db: &DatabaseConnection,
    codec: &TokenCodec,
    ttl: Duration,
    raw_token: &str,
) -> Result<(user::Model, String), ApiError> {
    let claims = codec.verify(raw_token)?;

    let owner = users::find_by_id(db, &claims.user_id)
        .await?
        .filter(|u| u.status == user::UserStatus::Active)
        .ok_or_else(|| ApiError::Unauthorized("Account is not available".to_string()))?;

    let txn = db.begin().await?;

    let entry = refresh_token::Entity::find()
        .filter(refresh_token::Column::TokenHash.eq(hash_token(raw_token)))
        .one(&txn)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Refresh token not recognized".to_string()))?;

    if entry.is_expired(Utc::now().naive_utc()) {
        return Err(ApiError::Unauthorized("Refresh token expired".to_string()));
    }

    // Conditional revoke is the linearization point: of N concurrent
    // redemptions of the same token, exactly one update matches a row that
    // is still live.
    let revoked = refresh_token::Entity::update_many()
        .col_expr(refresh_token::Column::Revoked, Value::Bool(Some(true)).into())
        .col_expr(
            refresh_token::Column::UpdatedAt,
            Value::ChronoDateTime(Some(Box::new(Utc::now().naive_utc()))).into(),
        )
        .filter(refresh_token::Column::TokenHash.eq(&entry.token_hash))
        .filter(refresh_token::Column::Revoked.eq(false))
        .exec(&txn)
        .await?;

    if revoked.rows_affected == 0 {
        return Err(ApiError::Unauthorized(
            "Refresh token already used or revoked".to_string(),
        ));
    }

    let successor = issue(&txn, codec, &owner, ttl).await?;
    txn.commit().await?;

    Ok((owner, successor))
}

/// Revoke a single refresh token by its raw value. Unknown tokens are a
/// no-op so logout never leaks whether a token existed.
pub async fn revoke_one(db: &DatabaseConnection, raw_token: &str) -> Result<(), ApiError> {
    refresh_token::Entity::update_many()
        .col_expr(refresh_token::Column::Revoked, Value::Bool(Some(true)).into())
        .col_expr(
            refresh_token::Column::UpdatedAt,
            Value::ChronoDateTime(Some(Box::new(Utc::now().naive_utc()))).into(),
        )
        .filter(refresh_token::Column::TokenHash.eq(hash_token(raw_token)))
        .filter(refresh_token::Column::Revoked.eq(false))
        .exec(db)
        .await?;
    Ok(())
}

/// Revoke every live refresh token belonging to a user. Used for forced
/// logout and account lockdown. Returns the number of tokens revoked.
pub async fn revoke_all(db: &DatabaseConnection, user_id: &str) -> Result<u64, ApiError> {
    let result = refresh_token::Entity::update_many()
        .col_expr(refresh_token::Column::Revoked, Value::Bool(Some(true)).into())
        .col_expr(
            refresh_token::Column::UpdatedAt,
            Value::ChronoDateTime(Some(Box::new(Utc::now().naive_utc()))).into(),
        )
        .filter(refresh_token::Column::UserId.eq(user_id))
        .filter(refresh_token::Column::Revoked.eq(false))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}
