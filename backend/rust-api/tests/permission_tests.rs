use axum::http::StatusCode;
use mongodb::bson::oid::ObjectId;
use serde_json::json;

mod common;

use common::{body_json, create_test_app, send, student_token};

fn some_id() -> String {
    ObjectId::new().to_hex()
}

#[tokio::test]
async fn anonymous_caller_cannot_publish_course() {
    let app = create_test_app().await;

    let uri = format!("/api/v1/courses/{}/publish", some_id());
    let response = send(&app, "POST", &uri, None, None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn anonymous_caller_cannot_list_enrolments() {
    let app = create_test_app().await;

    for uri in ["/api/v1/user-courses", "/api/v1/streaks", "/api/v1/user-responses", "/api/v1/users"] {
        let response = send(&app, "GET", uri, None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
    }
}

#[tokio::test]
async fn anonymous_caller_cannot_become_author() {
    let app = create_test_app().await;

    let response = send(
        &app,
        "POST",
        "/api/v1/authors/become-author",
        None,
        Some(json!({ "bio": "I teach" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn student_cannot_create_category() {
    let app = create_test_app().await;
    let token = student_token();

    let response = send(
        &app,
        "POST",
        "/api/v1/categories",
        Some(&token),
        Some(json!({ "title": "Grammar" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(
        body["message"],
        "You do not have permission to perform this action"
    );
}

#[tokio::test]
async fn student_cannot_create_author_profile_for_others() {
    let app = create_test_app().await;
    let token = student_token();

    let response = send(
        &app,
        "POST",
        "/api/v1/authors",
        Some(&token),
        Some(json!({ "user": some_id() })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn student_cannot_delete_staff_only_resources() {
    let app = create_test_app().await;
    let token = student_token();

    for collection in ["editors", "questions", "choices", "staff", "categories", "authors"] {
        let uri = format!("/api/v1/{}/{}", collection, some_id());
        let response = send(&app, "DELETE", &uri, Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{}", uri);
    }
}

#[tokio::test]
async fn student_cannot_list_staff() {
    let app = create_test_app().await;
    let token = student_token();

    let response = send(&app, "GET", "/api/v1/staff", Some(&token), None).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn student_cannot_touch_another_users_account() {
    let app = create_test_app().await;
    let token = student_token();
    let uri = format!("/api/v1/users/{}/change-password", some_id());

    let response = send(
        &app,
        "POST",
        &uri,
        Some(&token),
        Some(json!({
            "old_password": "whatever1",
            "new_password": "brand-new-pass",
            "confirm_password": "brand-new-pass"
        })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn malformed_path_id_reads_as_missing() {
    let app = create_test_app().await;

    let response = send(&app, "GET", "/api/v1/courses/not-an-id", None, None).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Course not found");
}
