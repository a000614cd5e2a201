use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use base64::{engine::general_purpose, Engine as _};
use serial_test::serial;
use tower::ServiceExt;

mod common;

use common::{body_json, create_test_app, send};

fn basic(credentials: &str) -> String {
    format!("Basic {}", general_purpose::STANDARD.encode(credentials))
}

async fn scrape(app: &axum::Router, authorization: Option<String>) -> StatusCode {
    let mut builder = Request::builder().uri("/metrics");
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
        .status()
}

#[tokio::test]
#[serial]
async fn metrics_require_basic_auth() {
    std::env::set_var("METRICS_AUTH", "scraper:s3cret");
    let app = create_test_app().await;

    assert_eq!(scrape(&app, None).await, StatusCode::UNAUTHORIZED);
    assert_eq!(
        scrape(&app, Some(basic("scraper:wrong"))).await,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        scrape(&app, Some(basic("scraper:s3cret"))).await,
        StatusCode::OK
    );
}

#[tokio::test]
#[serial]
async fn metrics_count_api_requests() {
    std::env::set_var("METRICS_AUTH", "scraper:s3cret");
    let app = create_test_app().await;

    send(&app, "GET", "/api/v1/courses/not-an-id", None, None).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .header(header::AUTHORIZATION, basic("scraper:s3cret"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    assert!(text.contains("http_requests_total"));
    assert!(text.contains("path=\"/api/v1/courses/not-an-id\""));
}

#[tokio::test]
async fn health_reports_degraded_without_backends() {
    let app = create_test_app().await;

    let response = send(&app, "GET", "/health", None, None).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["service"], "learnhub-api");
    assert_eq!(body["dependencies"]["redis"]["status"], "unhealthy");
}

#[tokio::test]
async fn responses_carry_trace_id() {
    let app = create_test_app().await;

    let response = send(&app, "GET", "/api/v1/courses/not-an-id", None, None).await;

    assert!(response.headers().contains_key("x-trace-id"));
}
