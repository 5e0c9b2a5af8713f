//! HTTP surface checks that never reach the database.

mod helpers;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::Utc;
use helpers::*;
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use subrent_backend::auth::{issue_token, Claims};
use uuid::Uuid;

fn token(platform_admin: bool, exp_offset: i64) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: Uuid::new_v4(),
        company_id: Uuid::new_v4(),
        account_type: "user".to_string(),
        role: "admin".to_string(),
        platform_admin,
        iat: now,
        exp: now + exp_offset,
    };
    issue_token(&claims, &test_config().auth.jwt_secret).unwrap()
}

fn signed_header(payload: &str, timestamp: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes()).unwrap();
    mac.update(format!("{}.{}", timestamp, payload).as_bytes());
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

fn webhook(payload: &str, signature: Option<String>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/api/webhooks/stripe")
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header("stripe-signature", signature);
    }
    builder.body(Body::from(payload.to_string())).unwrap()
}

#[tokio::test]
async fn test_api_requires_bearer_token() {
    let app = TestApp::without_database();

    let (status, body) = app.call(Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], json!(false));

    let (status, _) = app.get("/api/rental-jobs", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let app = TestApp::without_database();
    let (status, _) = app.get("/api/supply-jobs", &token(false, -3600)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_require_platform_admin() {
    let app = TestApp::without_database();

    let (status, body) = app.get("/admin/companies", &token(false, 3600)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], json!("Forbidden: Platform administrators only"));

    let (status, _) = app.call(Method::GET, "/admin/rental-jobs", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_status_filter_is_a_bad_request() {
    let app = TestApp::without_database();
    let (status, body) = app
        .get("/admin/rental-jobs?status=shipped", &token(true, 3600))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("shipped"));
}

#[tokio::test]
async fn test_huge_page_number_does_not_crash_the_handler() {
    let app = TestApp::without_database();
    let uri = format!("/admin/companies?page={}&per_page={}", i64::MAX, i64::MAX);
    let (status, body) = app.get(&uri, &token(true, 3600)).await;
    // Reaches the (unreachable) database instead of overflowing the offset
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], json!("Internal server error"));
}

#[tokio::test]
async fn test_user_routes_check_the_company_before_serving() {
    let app = TestApp::without_database();
    let (status, body) = app.get("/api/rental-jobs", &token(false, 3600)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn test_webhook_rejects_missing_and_bad_signatures() {
    let app = TestApp::without_database();
    let payload = r#"{"id":"evt_1","type":"customer.created","data":{"object":{}}}"#;

    let (status, _) = app.send(webhook(payload, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let forged = format!("t={},v1={}", Utc::now().timestamp(), "00".repeat(32));
    let (status, _) = app.send(webhook(payload, Some(forged))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let stale = signed_header(payload, Utc::now().timestamp() - 3600);
    let (status, _) = app.send(webhook(payload, Some(stale))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let ancient = format!("t={},v1=00", i64::MIN);
    let (status, body) = app.send(webhook(payload, Some(ancient))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("tolerance"));
}

#[tokio::test]
async fn test_webhook_acknowledges_unhandled_events() {
    let app = TestApp::without_database();
    let payload = r#"{"id":"evt_2","type":"customer.created","data":{"object":{}}}"#;

    let header = signed_header(payload, Utc::now().timestamp());
    let (status, body) = app.send(webhook(payload, Some(header))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["outcome"], json!("ignored"));
    assert_eq!(body["data"]["id"], json!("customer.created"));
}

#[tokio::test]
async fn test_health_reports_unreachable_database() {
    let app = TestApp::without_database();
    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["data"]["database"], json!("down"));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = TestApp::without_database();
    let (status, _) = app.call(Method::GET, "/api/nowhere", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
