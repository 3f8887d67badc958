mod common;

use sea_orm::EntityTrait;

use public_health_api::audit::{AuditRecorder, AuditSink, AuditTag};
use public_health_api::context::Identity;
use public_health_api::error::ApiError;
use public_health_api::models::operation_log::{self, OperationStatus, OperationType};

use common::{create_test_user, setup_db, test_client, wait_for_operation_logs};

const TEST_TAG: AuditTag = AuditTag::new("testing", OperationType::Other, "Test operation");

#[tokio::test]
async fn test_successful_operation_is_recorded() {
    let db = setup_db().await;
    let account = create_test_user(&db, "alice", "password123").await;
    let recorder = AuditRecorder::new(db.clone(), AuditSink::start(db.clone(), 64));
    let identity = Identity::new(account.id.clone(), account.username.clone());

    let result = recorder
        .record(
            TEST_TAG,
            &identity,
            &test_client(),
            "testing::noop",
            Some(serde_json::json!({ "key": "value" })),
            async { Ok::<_, ApiError>(42) },
        )
        .await
        .expect("operation failed");
    assert_eq!(result, 42);

    assert_eq!(wait_for_operation_logs(&db, 1).await, 1);
    let row = operation_log::Entity::find()
        .one(&db)
        .await
        .expect("query failed")
        .expect("no audit row");
    assert_eq!(row.user_id, account.id);
    assert_eq!(row.username, "alice");
    assert_eq!(row.module, "testing");
    assert_eq!(row.operation_type, OperationType::Other);
    assert_eq!(row.status, OperationStatus::Success);
    assert_eq!(row.method.as_deref(), Some("testing::noop"));
    assert_eq!(row.params.as_deref(), Some(r#"{"key":"value"}"#));
    assert_eq!(row.error_msg, None);
    assert!(row.cost_time_ms >= 0);
}

#[tokio::test]
async fn test_failed_operation_reraises_and_records_failure() {
    let db = setup_db().await;
    let account = create_test_user(&db, "alice", "password123").await;
    let recorder = AuditRecorder::new(db.clone(), AuditSink::start(db.clone(), 64));
    let identity = Identity::new(account.id.clone(), account.username.clone());

    let result: Result<i32, ApiError> = recorder
        .record(
            TEST_TAG,
            &identity,
            &test_client(),
            "testing::boom",
            None,
            async { Err(ApiError::Business("quota exceeded".to_string())) },
        )
        .await;

    // The business error passes through unchanged
    match result {
        Err(ApiError::Business(msg)) => assert_eq!(msg, "quota exceeded"),
        other => panic!("expected Business error, got {:?}", other.map(|_| ())),
    }

    assert_eq!(wait_for_operation_logs(&db, 1).await, 1);
    let row = operation_log::Entity::find()
        .one(&db)
        .await
        .expect("query failed")
        .expect("no audit row");
    assert_eq!(row.status, OperationStatus::Failure);
    assert_eq!(row.error_msg.as_deref(), Some("quota exceeded"));
}

#[tokio::test]
async fn test_long_params_are_truncated() {
    let db = setup_db().await;
    let account = create_test_user(&db, "alice", "password123").await;
    let recorder = AuditRecorder::new(db.clone(), AuditSink::start(db.clone(), 64));
    let identity = Identity::new(account.id.clone(), account.username.clone());

    let big = "x".repeat(3000);
    recorder
        .record(
            TEST_TAG,
            &identity,
            &test_client(),
            "testing::big",
            Some(serde_json::json!({ "blob": big })),
            async { Ok::<_, ApiError>(()) },
        )
        .await
        .expect("operation failed");

    assert_eq!(wait_for_operation_logs(&db, 1).await, 1);
    let row = operation_log::Entity::find()
        .one(&db)
        .await
        .expect("query failed")
        .expect("no audit row");
    let params = row.params.expect("params missing");
    assert_eq!(params.chars().count(), 2003);
    assert!(params.ends_with("..."));
}

#[tokio::test]
async fn test_long_error_is_truncated() {
    let db = setup_db().await;
    let account = create_test_user(&db, "alice", "password123").await;
    let recorder = AuditRecorder::new(db.clone(), AuditSink::start(db.clone(), 64));
    let identity = Identity::new(account.id.clone(), account.username.clone());

    let long_reason = "e".repeat(800);
    let _: Result<(), ApiError> = recorder
        .record(
            TEST_TAG,
            &identity,
            &test_client(),
            "testing::long_error",
            None,
            async { Err(ApiError::Business(long_reason)) },
        )
        .await;

    assert_eq!(wait_for_operation_logs(&db, 1).await, 1);
    let row = operation_log::Entity::find()
        .one(&db)
        .await
        .expect("query failed")
        .expect("no audit row");
    let error_msg = row.error_msg.expect("error_msg missing");
    assert_eq!(error_msg.chars().count(), 503);
    assert!(error_msg.ends_with("..."));
}

#[tokio::test]
async fn test_without_params_suppresses_capture() {
    let db = setup_db().await;
    let account = create_test_user(&db, "alice", "password123").await;
    let recorder = AuditRecorder::new(db.clone(), AuditSink::start(db.clone(), 64));
    let identity = Identity::new(account.id.clone(), account.username.clone());

    const QUIET: AuditTag =
        AuditTag::new("testing", OperationType::Login, "Credential operation").without_params();

    recorder
        .record(
            QUIET,
            &identity,
            &test_client(),
            "testing::quiet",
            Some(serde_json::json!({ "password": "hunter2" })),
            async { Ok::<_, ApiError>(()) },
        )
        .await
        .expect("operation failed");

    assert_eq!(wait_for_operation_logs(&db, 1).await, 1);
    let row = operation_log::Entity::find()
        .one(&db)
        .await
        .expect("query failed")
        .expect("no audit row");
    assert_eq!(row.params, None);
}

#[tokio::test]
async fn test_response_capture_replaces_params() {
    let db = setup_db().await;
    let account = create_test_user(&db, "alice", "password123").await;
    let recorder = AuditRecorder::new(db.clone(), AuditSink::start(db.clone(), 64));
    let identity = Identity::new(account.id.clone(), account.username.clone());

    const ECHO: AuditTag =
        AuditTag::new("testing", OperationType::Query, "Echo operation").with_response();

    recorder
        .record(
            ECHO,
            &identity,
            &test_client(),
            "testing::echo",
            Some(serde_json::json!({ "request": true })),
            async { Ok::<_, ApiError>(serde_json::json!({ "answer": 7 })) },
        )
        .await
        .expect("operation failed");

    assert_eq!(wait_for_operation_logs(&db, 1).await, 1);
    let row = operation_log::Entity::find()
        .one(&db)
        .await
        .expect("query failed")
        .expect("no audit row");
    assert_eq!(row.params.as_deref(), Some(r#"{"answer":7}"#));
}

#[tokio::test]
async fn test_unresolved_actor_skips_audit_but_not_the_operation() {
    let db = setup_db().await;
    let recorder = AuditRecorder::new(db.clone(), AuditSink::start(db.clone(), 64));
    let identity = Identity::system();

    let result = recorder
        .record(
            TEST_TAG,
            &identity,
            &test_client(),
            "testing::anonymous",
            None,
            async { Ok::<_, ApiError>("done") },
        )
        .await
        .expect("operation failed");
    assert_eq!(result, "done");

    // Give the writer a moment; nothing should land
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    use sea_orm::PaginatorTrait;
    let count = operation_log::Entity::find()
        .count(&db)
        .await
        .expect("count failed");
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_actor_resolves_by_username_too() {
    let db = setup_db().await;
    let account = create_test_user(&db, "alice", "password123").await;
    let recorder = AuditRecorder::new(db.clone(), AuditSink::start(db.clone(), 64));
    // Identity carries the username where an id would normally go
    let identity = Identity::new("alice", "alice");

    recorder
        .record(
            TEST_TAG,
            &identity,
            &test_client(),
            "testing::by_username",
            None,
            async { Ok::<_, ApiError>(()) },
        )
        .await
        .expect("operation failed");

    assert_eq!(wait_for_operation_logs(&db, 1).await, 1);
    let row = operation_log::Entity::find()
        .one(&db)
        .await
        .expect("query failed")
        .expect("no audit row");
    // Canonical id and username from the user store
    assert_eq!(row.user_id, account.id);
    assert_eq!(row.username, "alice");
}
