#![allow(dead_code)]

use std::time::Duration;

use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};
use sea_orm_migration::MigratorTrait;

use public_health_api::config::Config;
use public_health_api::extractors::ClientInfo;
use public_health_api::migrations::Migrator;
use public_health_api::models::operation_log;
use public_health_api::models::user::{self, UserRole};
use public_health_api::users::{self, NewUser};

/// Config pointing at an in-memory SQLite database.
pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test-secret-key-for-testing".to_string(),
        jwt_issuer: "public-health-api-test".to_string(),
        access_token_ttl_secs: 900,
        refresh_token_ttl_secs: 3600,
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        environment: "test".to_string(),
        audit_queue_capacity: 64,
    }
}

/// Fresh migrated in-memory database.
pub async fn setup_db() -> DatabaseConnection {
    let config = test_config();
    let db = public_health_api::db::connect(&config)
        .await
        .expect("failed to open in-memory database");
    Migrator::up(&db, None).await.expect("migrations failed");
    db
}

pub async fn create_test_user(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
) -> user::Model {
    users::create(
        db,
        NewUser {
            username,
            password,
            name: "Test User",
            email: Some("test@example.com"),
            phone: None,
            role: UserRole::User,
        },
    )
    .await
    .expect("failed to create test user")
}

pub fn test_client() -> ClientInfo {
    ClientInfo {
        ip: Some("127.0.0.1".to_string()),
        user_agent: Some("integration-test".to_string()),
        location: Some("intranet".to_string()),
    }
}

/// Wait for the async audit writer to land `expected` rows, polling up to
/// two seconds.
pub async fn wait_for_operation_logs(db: &DatabaseConnection, expected: u64) -> u64 {
    for _ in 0..40 {
        let count = operation_log::Entity::find()
            .count(db)
            .await
            .expect("count failed");
        if count >= expected {
            return count;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    operation_log::Entity::find()
        .count(db)
        .await
        .expect("count failed")
}
