use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use mongodb::bson::oid::ObjectId;
use serde_json::json;
use tower::ServiceExt;

mod common;

use common::{body_json, create_test_app, send, student_token};

fn registration(password: &str, confirm: &str) -> serde_json::Value {
    json!({
        "email": "reader@example.com",
        "username": "reader",
        "password": password,
        "confirm_password": confirm,
        "firstname": "Sara",
        "lastname": "Reader",
        "phone_number": "+989121234567"
    })
}

#[tokio::test]
async fn malformed_json_body_is_a_json_400() {
    let app = create_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/users")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["status"], 400);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Failed to parse JSON request body"));
}

#[tokio::test]
async fn registration_requires_matching_passwords() {
    let app = create_test_app().await;

    let response = send(
        &app,
        "POST",
        "/api/v1/users",
        None,
        Some(registration("long-enough-1", "long-enough-2")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["errors"]["confirm_password"][0], "Passwords do not match.");
}

#[tokio::test]
async fn registration_rejects_numeric_and_short_passwords() {
    let app = create_test_app().await;

    for password in ["12345678901", "short1"] {
        let response = send(
            &app,
            "POST",
            "/api/v1/users",
            None,
            Some(registration(password, password)),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", password);
        let body = body_json(response).await;
        assert!(body["errors"]["password"].is_array(), "{}", password);
    }
}

#[tokio::test]
async fn registration_reports_every_invalid_field() {
    let app = create_test_app().await;

    let response = send(
        &app,
        "POST",
        "/api/v1/users",
        None,
        Some(json!({
            "email": "nope",
            "username": "",
            "password": "long-enough-1",
            "confirm_password": "long-enough-1",
            "firstname": "Sara",
            "lastname": "Reader",
            "phone_number": "12"
        })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    for field in ["email", "username", "phone_number"] {
        assert!(body["errors"][field].is_array(), "{}", field);
    }
}

#[tokio::test]
async fn staff_creation_reports_nested_user_fields() {
    let app = create_test_app().await;
    let token = common::staff_token();

    let response = send(
        &app,
        "POST",
        "/api/v1/staff",
        Some(&token),
        Some(json!({
            "user": {
                "email": "broken",
                "username": "helper",
                "password": "long-enough-1",
                "confirm_password": "long-enough-1",
                "firstname": "Help",
                "lastname": "Desk",
                "phone_number": "+989121234567"
            },
            "role_type": "support"
        })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["errors"]["user.email"].is_array());
}

#[tokio::test]
async fn progress_above_hundred_is_rejected() {
    let app = create_test_app().await;
    let token = student_token();
    let uri = format!("/api/v1/user-courses/{}/update-progress", ObjectId::new().to_hex());

    let response = send(&app, "POST", &uri, Some(&token), Some(json!({ "progress": 101 }))).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(
        body["errors"]["progress"][0],
        "Progress must be between 0 and 100"
    );
}

#[tokio::test]
async fn unknown_streak_length_is_rejected() {
    let app = create_test_app().await;
    let token = student_token();

    let response = send(
        &app,
        "POST",
        "/api/v1/streaks",
        Some(&token),
        Some(json!({ "type": 5 })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reorder_requires_at_least_one_slide() {
    let app = create_test_app().await;
    let token = student_token();
    let uri = format!("/api/v1/lessons/{}/reorder-slides", ObjectId::new().to_hex());

    let response = send(
        &app,
        "POST",
        &uri,
        Some(&token),
        Some(json!({ "slide_orders": [] })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["errors"]["slide_orders"].is_array());
}
