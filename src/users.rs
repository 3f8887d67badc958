//! User store queries shared by authentication and audit actor resolution.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::auth::hash_password;
use crate::error::ApiError;
use crate::models::user::{self, UserRole, UserStatus};

/// Find a non-deleted user by id.
pub async fn find_by_id(
    db: &DatabaseConnection,
    id: &str,
) -> Result<Option<user::Model>, ApiError> {
    let found = user::Entity::find_by_id(id)
        .filter(user::Column::Deleted.eq(false))
        .one(db)
        .await?;
    Ok(found)
}

/// Find a non-deleted user by username.
pub async fn find_by_username(
    db: &DatabaseConnection,
    username: &str,
) -> Result<Option<user::Model>, ApiError> {
    let found = user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .filter(user::Column::Deleted.eq(false))
        .one(db)
        .await?;
    Ok(found)
}

/// Resolve an identity value to a user account.
///
/// The value is tried as a UUID primary key first, then as a username. Used
/// by the audit recorder, which accepts identities from both token claims
/// (user id) and development headers (either form).
pub async fn resolve_actor(
    db: &DatabaseConnection,
    value: &str,
) -> Result<Option<user::Model>, ApiError> {
    if Uuid::parse_str(value).is_ok() {
        if let Some(found) = find_by_id(db, value).await? {
            return Ok(Some(found));
        }
    }
    find_by_username(db, value).await
}

pub async fn username_taken(db: &DatabaseConnection, username: &str) -> Result<bool, ApiError> {
    Ok(find_by_username(db, username).await?.is_some())
}

pub async fn email_taken(db: &DatabaseConnection, email: &str) -> Result<bool, ApiError> {
    let found = user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .filter(user::Column::Deleted.eq(false))
        .one(db)
        .await?;
    Ok(found.is_some())
}

pub struct NewUser<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub name: &'a str,
    pub email: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub role: UserRole,
}

/// Insert a new active user with a hashed password.
pub async fn create(db: &DatabaseConnection, new: NewUser<'_>) -> Result<user::Model, ApiError> {
    let now = Utc::now().naive_utc();
    let model = user::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        username: Set(new.username.to_string()),
        password_hash: Set(hash_password(new.password)?),
        name: Set(new.name.to_string()),
        email: Set(new.email.map(|e| e.to_string())),
        phone: Set(new.phone.map(|p| p.to_string())),
        role: Set(new.role),
        status: Set(UserStatus::Active),
        last_login: Set(None),
        deleted: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let created = model.insert(db).await?;
    Ok(created)
}

/// Stamp the user's last successful login time.
pub async fn touch_last_login(db: &DatabaseConnection, user: &user::Model) -> Result<(), ApiError> {
    let now = Utc::now().naive_utc();
    let mut active: user::ActiveModel = user.clone().into();
    active.last_login = Set(Some(now));
    active.updated_at = Set(now);
    active.update(db).await?;
    Ok(())
}
