mod common;

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Request, StatusCode};
use sea_orm::{EntityTrait, PaginatorTrait, QueryOrder};
use tower::ServiceExt;

use public_health_api::models::{login_history, operation_log};
use public_health_api::App;

use common::{test_config, wait_for_operation_logs};

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("failed to read body");
    serde_json::from_slice(&bytes).expect("body is not JSON")
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("failed to build request")
}

#[tokio::test]
async fn test_health_and_welcome() {
    let app = App::with_config(test_config()).await.expect("app failed");
    let router = app.router();

    let res = router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .expect("request failed");
    assert_eq!(res.status(), StatusCode::OK);

    let res = router
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .expect("request failed");
    let body = body_json(res).await;
    assert_eq!(body["service"], "public-health-api");
}

#[tokio::test]
async fn test_register_login_validate_refresh_logout_flow() {
    let app = App::with_config(test_config()).await.expect("app failed");
    let router = app.router();

    // Register
    let res = router
        .clone()
        .oneshot(post_json(
            "/api/auth/register",
            serde_json::json!({
                "username": "alice",
                "password": "password123",
                "confirm_password": "password123",
                "name": "Alice",
                "email": "alice@example.com"
            }),
        ))
        .await
        .expect("request failed");
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user"]["username"], "alice");
    assert!(body["data"]["access_token"].as_str().is_some());

    // Login
    let res = router
        .clone()
        .oneshot(post_json(
            "/api/auth/login",
            serde_json::json!({ "username": "alice", "password": "password123" }),
        ))
        .await
        .expect("request failed");
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    let access_token = body["data"]["access_token"]
        .as_str()
        .expect("no access token")
        .to_string();
    let refresh_token = body["data"]["refresh_token"]
        .as_str()
        .expect("no refresh token")
        .to_string();
    assert_eq!(body["data"]["token_type"], "Bearer");

    // Validate the access token
    let res = router
        .clone()
        .oneshot(
            Request::get("/api/auth/validate")
                .header(header::AUTHORIZATION, format!("Bearer {}", access_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request failed");
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["data"]["username"], "alice");

    // Refresh rotates the pair
    let res = router
        .clone()
        .oneshot(post_json(
            "/api/auth/refresh",
            serde_json::json!({ "refresh_token": refresh_token }),
        ))
        .await
        .expect("request failed");
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    let rotated = body["data"]["refresh_token"]
        .as_str()
        .expect("no rotated token")
        .to_string();
    assert_ne!(rotated, refresh_token);

    // The original refresh token is dead
    let res = router
        .clone()
        .oneshot(post_json(
            "/api/auth/refresh",
            serde_json::json!({ "refresh_token": refresh_token }),
        ))
        .await
        .expect("request failed");
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Logout revokes the rotated token; a second logout is still 200
    for _ in 0..2 {
        let res = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/logout")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::AUTHORIZATION, format!("Bearer {}", access_token))
                    .body(Body::from(
                        serde_json::json!({ "refresh_token": rotated }).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .expect("request failed");
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = router
        .clone()
        .oneshot(post_json(
            "/api/auth/refresh",
            serde_json::json!({ "refresh_token": rotated }),
        ))
        .await
        .expect("request failed");
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bad_credentials_are_uniform() {
    let app = App::with_config(test_config()).await.expect("app failed");
    let router = app.router();

    router
        .clone()
        .oneshot(post_json(
            "/api/auth/register",
            serde_json::json!({
                "username": "alice",
                "password": "password123",
                "confirm_password": "password123",
                "name": "Alice"
            }),
        ))
        .await
        .expect("request failed");

    // Unknown username and wrong password produce the same message
    let res = router
        .clone()
        .oneshot(post_json(
            "/api/auth/login",
            serde_json::json!({ "username": "ghost", "password": "whatever" }),
        ))
        .await
        .expect("request failed");
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let unknown_user = body_json(res).await;

    let res = router
        .clone()
        .oneshot(post_json(
            "/api/auth/login",
            serde_json::json!({ "username": "alice", "password": "wrong" }),
        ))
        .await
        .expect("request failed");
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let wrong_password = body_json(res).await;

    assert_eq!(
        unknown_user["error"]["message"],
        wrong_password["error"]["message"]
    );
}

#[tokio::test]
async fn test_direct_connection_records_the_peer_address() {
    let app = App::with_config(test_config()).await.expect("app failed");
    let router = app.router();

    router
        .clone()
        .oneshot(post_json(
            "/api/auth/register",
            serde_json::json!({
                "username": "alice",
                "password": "password123",
                "confirm_password": "password123",
                "name": "Alice"
            }),
        ))
        .await
        .expect("request failed");

    // No proxy header; only the socket peer is known
    let res = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .extension(ConnectInfo(SocketAddr::from(([203, 0, 113, 9], 54321))))
                .body(Body::from(
                    serde_json::json!({ "username": "alice", "password": "wrong" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .expect("request failed");
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let attempt = login_history::Entity::find()
        .order_by_desc(login_history::Column::CreatedAt)
        .one(&app.db)
        .await
        .expect("query failed")
        .expect("no login history row");
    assert_eq!(attempt.ip_address.as_deref(), Some("203.0.113.9"));
    assert_eq!(attempt.location.as_deref(), Some("extranet"));

    // A proxy header still wins over the peer address
    let res = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .header("x-forwarded-for", "198.51.100.4")
                .extension(ConnectInfo(SocketAddr::from(([10, 0, 0, 2], 54321))))
                .body(Body::from(
                    serde_json::json!({ "username": "alice", "password": "wrong" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .expect("request failed");
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let attempt = login_history::Entity::find()
        .order_by_desc(login_history::Column::CreatedAt)
        .one(&app.db)
        .await
        .expect("query failed")
        .expect("no login history row");
    assert_eq!(attempt.ip_address.as_deref(), Some("198.51.100.4"));
}

#[tokio::test]
async fn test_fallback_headers_resolve_the_audit_actor() {
    let app = App::with_config(test_config()).await.expect("app failed");
    let router = app.router();

    let res = router
        .clone()
        .oneshot(post_json(
            "/api/auth/register",
            serde_json::json!({
                "username": "alice",
                "password": "password123",
                "confirm_password": "password123",
                "name": "Alice"
            }),
        ))
        .await
        .expect("request failed");
    let body = body_json(res).await;
    let user_id = body["data"]["user"]["id"]
        .as_str()
        .expect("no user id")
        .to_string();

    // No bearer token; only the development identity header
    let res = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/logout")
                .header(header::CONTENT_TYPE, "application/json")
                .header("x-user-id", &user_id)
                .body(Body::from(serde_json::json!({}).to_string()))
                .unwrap(),
        )
        .await
        .expect("request failed");
    assert_eq!(res.status(), StatusCode::OK);

    assert_eq!(wait_for_operation_logs(&app.db, 1).await, 1);
    let entry = operation_log::Entity::find()
        .one(&app.db)
        .await
        .expect("query failed")
        .expect("no audit row");
    assert_eq!(entry.user_id, user_id);
    // Canonical username, re-resolved from the store
    assert_eq!(entry.username, "alice");
    assert_eq!(entry.module, "auth");
}

#[tokio::test]
async fn test_sentinel_identity_skips_the_audit_trail() {
    let app = App::with_config(test_config()).await.expect("app failed");
    let router = app.router();

    // No bearer token and no fallback headers: the request runs as `system`
    let res = router
        .oneshot(post_json("/api/auth/logout", serde_json::json!({})))
        .await
        .expect("request failed");
    assert_eq!(res.status(), StatusCode::OK);

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    let count = operation_log::Entity::find()
        .count(&app.db)
        .await
        .expect("count failed");
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_audit_endpoints_require_authentication() {
    let app = App::with_config(test_config()).await.expect("app failed");
    let router = app.router();

    let res = router
        .clone()
        .oneshot(
            Request::get("/api/operation-logs")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request failed");
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = router
        .oneshot(
            Request::get("/api/login-history/user/some-id")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request failed");
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_business_rules() {
    let app = App::with_config(test_config()).await.expect("app failed");
    let router = app.router();

    // Password mismatch
    let res = router
        .clone()
        .oneshot(post_json(
            "/api/auth/register",
            serde_json::json!({
                "username": "alice",
                "password": "password123",
                "confirm_password": "different",
                "name": "Alice"
            }),
        ))
        .await
        .expect("request failed");
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = body_json(res).await;
    assert_eq!(body["error"]["code"], "BUSINESS_RULE");

    // Duplicate username
    let payload = serde_json::json!({
        "username": "alice",
        "password": "password123",
        "confirm_password": "password123",
        "name": "Alice"
    });
    let res = router
        .clone()
        .oneshot(post_json("/api/auth/register", payload.clone()))
        .await
        .expect("request failed");
    assert_eq!(res.status(), StatusCode::OK);

    let res = router
        .oneshot(post_json("/api/auth/register", payload))
        .await
        .expect("request failed");
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
