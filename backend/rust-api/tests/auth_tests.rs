use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use mongodb::bson::oid::ObjectId;
use serde_json::json;
use tower::ServiceExt;

mod common;

use common::{body_json, create_test_app, jwt, send, student_token};
use learnhub_api::middlewares::auth::TokenType;

#[tokio::test]
async fn malformed_bearer_token_is_rejected() {
    let app = create_test_app().await;

    let response = send(&app, "GET", "/api/v1/courses", Some("not-a-jwt"), None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn non_bearer_authorization_is_rejected() {
    let app = create_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/courses")
                .header(header::AUTHORIZATION, "Token abcdef")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_token_cannot_authenticate_requests() {
    let app = create_test_app().await;
    let pair = jwt().issue_pair(&ObjectId::new(), true).unwrap();

    let response = send(&app, "GET", "/api/v1/staff", Some(&pair.refresh), None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_signed_with_other_secret_is_rejected() {
    let app = create_test_app().await;
    let foreign = learnhub_api::middlewares::auth::JwtService::new("someone-else")
        .issue(&ObjectId::new(), true, TokenType::Access)
        .unwrap();

    let response = send(&app, "GET", "/api/v1/staff", Some(&foreign), None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_exchanges_refresh_token_for_access_token() {
    let app = create_test_app().await;
    let user_id = ObjectId::new();
    let pair = jwt().issue_pair(&user_id, false).unwrap();

    let response = send(
        &app,
        "POST",
        "/api/v1/token/refresh",
        None,
        Some(json!({ "refresh": pair.refresh })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let access = body["access"].as_str().expect("access token in body");
    let claims = jwt().validate_typed(access, TokenType::Access).unwrap();
    assert_eq!(claims.sub, user_id.to_hex());
}

#[tokio::test]
async fn refresh_rejects_access_token() {
    let app = create_test_app().await;
    let pair = jwt().issue_pair(&ObjectId::new(), false).unwrap();

    let response = send(
        &app,
        "POST",
        "/api/v1/token/refresh",
        None,
        Some(json!({ "refresh": pair.access })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn verify_accepts_valid_tokens_and_rejects_garbage() {
    let app = create_test_app().await;

    let ok = send(
        &app,
        "POST",
        "/api/v1/token/verify",
        None,
        Some(json!({ "token": student_token() })),
    )
    .await;
    assert_eq!(ok.status(), StatusCode::OK);
    assert_eq!(body_json(ok).await, json!({}));

    let bad = send(
        &app,
        "POST",
        "/api/v1/token/verify",
        None,
        Some(json!({ "token": "garbage" })),
    )
    .await;
    assert_eq!(bad.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_with_invalid_email_is_a_validation_error() {
    let app = create_test_app().await;

    let response = send(
        &app,
        "POST",
        "/api/v1/token",
        None,
        Some(json!({ "email": "not-an-email", "password": "" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["errors"]["email"].is_array());
    assert!(body["errors"]["password"].is_array());
}
