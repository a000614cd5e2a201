use axum::{extract::State, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use super::{ApiError, ApiResult};
use crate::{
    extractors::AppJson,
    models::user::LoginRequest,
    services::{auth_service::AuthService, AppState},
};

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct AccessResponse {
    pub access: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub token: String,
}

/// POST /api/v1/token and /api/v1/users/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let pair = AuthService::new(&state).login(req).await?;
    Ok(Json(pair))
}

/// POST /api/v1/token/refresh
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<RefreshRequest>,
) -> ApiResult<impl IntoResponse> {
    let access = AuthService::new(&state).refresh(&req.refresh).map_err(|e| {
        tracing::warn!("Token refresh rejected: {}", e);
        ApiError::Unauthorized("Token is invalid or expired".to_string())
    })?;

    Ok(Json(AccessResponse { access }))
}

/// POST /api/v1/token/verify
pub async fn verify_token(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<VerifyRequest>,
) -> ApiResult<impl IntoResponse> {
    AuthService::new(&state).verify(&req.token).map_err(|e| {
        tracing::debug!("Token verification failed: {}", e);
        ApiError::Unauthorized("Token is invalid or expired".to_string())
    })?;

    Ok(Json(json!({})))
}
