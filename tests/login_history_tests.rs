mod common;

use chrono::{Duration, Utc};

use public_health_api::auth::login_history::{self, LoginHistoryFilter};
use public_health_api::auth::service::{self, LoginRequest};
use public_health_api::auth::TokenCodec;
use public_health_api::models::login_history::LoginStatus;

use common::{create_test_user, setup_db, test_client, test_config};

fn codec() -> TokenCodec {
    TokenCodec::new("test-secret-key-for-testing", "public-health-api-test")
}

#[tokio::test]
async fn test_unknown_username_records_failure_without_user_id() {
    let db = setup_db().await;
    let client = test_client();

    let result = service::login(
        &db,
        &codec(),
        &test_config(),
        &LoginRequest {
            username: "ghost".to_string(),
            password: "whatever".to_string(),
        },
        &client,
    )
    .await;
    assert!(result.is_err());

    // The attempt is on record even though no account matches
    let page = login_history::history_for_user(&db, "ghost", &LoginHistoryFilter::default(), 10, 0)
        .await
        .expect("query failed");
    assert_eq!(page.total, 0, "no rows should be attributed to a user id");

    // Direct check through the entity: username kept, user_id empty
    use public_health_api::models::login_history::Entity;
    use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
    let rows = Entity::find()
        .filter(public_health_api::models::login_history::Column::Username.eq("ghost"))
        .all(&db)
        .await
        .expect("query failed");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].user_id, None);
    assert_eq!(rows[0].status, LoginStatus::Failure);
    assert_eq!(rows[0].fail_reason.as_deref(), Some("unknown username"));
}

#[tokio::test]
async fn test_wrong_password_records_failure_with_user_id() {
    let db = setup_db().await;
    let account = create_test_user(&db, "alice", "password123").await;
    let client = test_client();

    let result = service::login(
        &db,
        &codec(),
        &test_config(),
        &LoginRequest {
            username: "alice".to_string(),
            password: "not-the-password".to_string(),
        },
        &client,
    )
    .await;
    assert!(result.is_err());

    let page = login_history::history_for_user(
        &db,
        &account.id,
        &LoginHistoryFilter::default(),
        10,
        0,
    )
    .await
    .expect("query failed");
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].status, LoginStatus::Failure);
    assert_eq!(page.items[0].user_id.as_deref(), Some(account.id.as_str()));
}

#[tokio::test]
async fn test_successful_login_records_success_and_issues_tokens() {
    let db = setup_db().await;
    let account = create_test_user(&db, "alice", "password123").await;
    let client = test_client();

    let tokens = service::login(
        &db,
        &codec(),
        &test_config(),
        &LoginRequest {
            username: "alice".to_string(),
            password: "password123".to_string(),
        },
        &client,
    )
    .await
    .expect("login failed");

    assert!(!tokens.access_token.is_empty());
    assert!(!tokens.refresh_token.is_empty());
    assert_eq!(tokens.token_type, "Bearer");
    assert_eq!(tokens.user.username, "alice");

    let last = login_history::last_success(&db, &account.id)
        .await
        .expect("query failed")
        .expect("no success row");
    assert_eq!(last.username, "alice");
    assert_eq!(last.ip_address.as_deref(), Some("127.0.0.1"));

    // last_login stamped on the account
    let refreshed = public_health_api::users::find_by_id(&db, &account.id)
        .await
        .expect("query failed")
        .expect("user missing");
    assert!(refreshed.last_login.is_some());
}

#[tokio::test]
async fn test_status_filter_and_counts() {
    let db = setup_db().await;
    let account = create_test_user(&db, "alice", "password123").await;
    let client = test_client();

    login_history::record_success(&db, &account, &client).await;
    login_history::record_failure(
        &db,
        Some(account.id.clone()),
        "alice",
        "wrong password",
        &client,
    )
    .await;
    login_history::record_failure(
        &db,
        Some(account.id.clone()),
        "alice",
        "wrong password",
        &client,
    )
    .await;

    assert_eq!(
        login_history::count_for_user(&db, &account.id)
            .await
            .expect("count failed"),
        3
    );

    let failures = login_history::history_for_user(
        &db,
        &account.id,
        &LoginHistoryFilter {
            status: Some(LoginStatus::Failure),
            ..Default::default()
        },
        10,
        0,
    )
    .await
    .expect("query failed");
    assert_eq!(failures.total, 2);

    let since = Utc::now().naive_utc() - Duration::hours(1);
    assert_eq!(
        login_history::count_failures_since(&db, &account.id, since)
            .await
            .expect("count failed"),
        2
    );
}

#[tokio::test]
async fn test_recent_is_newest_first_and_bounded() {
    let db = setup_db().await;
    let account = create_test_user(&db, "alice", "password123").await;
    let client = test_client();

    for _ in 0..5 {
        login_history::record_success(&db, &account, &client).await;
    }

    let recent = login_history::recent_for_user(&db, &account.id, 3)
        .await
        .expect("query failed");
    assert_eq!(recent.len(), 3);
    for pair in recent.windows(2) {
        assert!(pair[0].login_time >= pair[1].login_time);
    }
}

#[tokio::test]
async fn test_retention_and_per_user_erasure() {
    let db = setup_db().await;
    let alice = create_test_user(&db, "alice", "password123").await;
    let bob = create_test_user(&db, "bob", "password123").await;
    let client = test_client();

    login_history::record_success(&db, &alice, &client).await;
    login_history::record_success(&db, &bob, &client).await;

    // Cutoff in the past removes nothing
    let removed = login_history::delete_before(
        &db,
        Utc::now().naive_utc() - Duration::days(30),
    )
    .await
    .expect("delete failed");
    assert_eq!(removed, 0);

    // Erase one user, the other survives
    let removed = login_history::delete_for_user(&db, &alice.id)
        .await
        .expect("delete failed");
    assert_eq!(removed, 1);
    assert_eq!(
        login_history::count_for_user(&db, &bob.id)
            .await
            .expect("count failed"),
        1
    );

    // Future cutoff sweeps the rest
    let removed = login_history::delete_before(
        &db,
        Utc::now().naive_utc() + Duration::days(1),
    )
    .await
    .expect("delete failed");
    assert_eq!(removed, 1);
}
