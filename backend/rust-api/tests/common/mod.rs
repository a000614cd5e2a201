#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, Response},
    Router,
};
use learnhub_api::{
    config::Config,
    create_router,
    middlewares::auth::{JwtService, TokenType},
    services::AppState,
};
use mongodb::bson::oid::ObjectId;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const TEST_JWT_SECRET: &str = "integration-test-secret";

pub fn test_config() -> Config {
    Config {
        // nothing listens here; requests in these tests resolve before any round trip
        mongo_uri: "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200&connectTimeoutMS=200"
            .to_string(),
        mongo_database: "learnhub_test".to_string(),
        redis_uri: "redis://127.0.0.1:1/0".to_string(),
        jwt_secret: TEST_JWT_SECRET.to_string(),
        access_token_ttl_seconds: 3600,
        refresh_token_ttl_seconds: 86400,
        bind_addr: "127.0.0.1:0".to_string(),
        superuser_seed_file: None,
    }
}

pub async fn create_test_app() -> Router {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let config = test_config();

    let mongo_client = mongodb::Client::with_uri_str(&config.mongo_uri)
        .await
        .expect("Failed to create test MongoDB client");
    let redis_client =
        redis::Client::open(config.redis_uri.clone()).expect("Failed to create test Redis client");

    create_router(Arc::new(AppState::new(config, mongo_client, redis_client)))
}

pub fn jwt() -> JwtService {
    JwtService::new(TEST_JWT_SECRET)
}

pub fn access_token(user_id: &ObjectId, is_staff: bool) -> String {
    jwt()
        .issue(user_id, is_staff, TokenType::Access)
        .expect("Failed to issue access token")
}

pub fn student_token() -> String {
    access_token(&ObjectId::new(), false)
}

pub fn staff_token() -> String {
    access_token(&ObjectId::new(), true)
}

/// Sends one request through the router; `body` is sent as JSON when present.
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}
