use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;
use validator::Validate;

use super::ApiResult;
use crate::{
    context::RequestContext,
    extractors::AppJson,
    models::user::{
        check_new_password, ChangePasswordRequest, RegisterRequest, StatusResponse,
        UpdateUserRequest,
    },
    services::{parse_path_id, query::ListParams, user_service::UserService, AppState},
};

/// POST /api/v1/users - public registration
pub async fn register(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;
    check_new_password(&req.password, &req.confirm_password)?;

    tracing::info!("Registering new user: {}", req.email);
    let profile = UserService::new(state.mongo.clone()).register(req).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Query(params): Query<ListParams>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_user()?;
    let users = UserService::new(state.mongo.clone())
        .list(&ctx, &params)
        .await?;
    Ok(Json(users))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let user_id = parse_path_id("User", &id)?;
    let user = UserService::new(state.mongo.clone())
        .get(&ctx, user_id)
        .await?;
    Ok(Json(user))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    let user_id = parse_path_id("User", &id)?;
    ctx.ensure_owner_or_staff(&user_id)?;
    req.validate()?;

    let user = UserService::new(state.mongo.clone())
        .update(&ctx, user_id, req)
        .await?;
    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let user_id = parse_path_id("User", &id)?;
    UserService::new(state.mongo.clone())
        .delete(&ctx, user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/users/{id}/change-password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    AppJson(req): AppJson<ChangePasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    let user_id = parse_path_id("User", &id)?;
    ctx.ensure_owner_or_staff(&user_id)?;
    req.validate()?;

    UserService::new(state.mongo.clone())
        .change_password(&ctx, user_id, req)
        .await?;
    Ok(Json(StatusResponse {
        status: "password set",
    }))
}

/// POST /api/v1/users/{id}/confirm-email
pub async fn confirm_email(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let user_id = parse_path_id("User", &id)?;
    UserService::new(state.mongo.clone())
        .confirm_email(&ctx, user_id)
        .await?;
    Ok(Json(StatusResponse {
        status: "email confirmed",
    }))
}
