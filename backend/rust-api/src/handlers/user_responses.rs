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
    models::user_response::{CreateUserResponseRequest, UpdateUserResponseRequest},
    services::{
        parse_path_id, query::ListParams, user_response_service::UserResponseService, AppState,
    },
};

pub async fn list_user_responses(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Query(params): Query<ListParams>,
) -> ApiResult<impl IntoResponse> {
    let responses = UserResponseService::new(state.mongo.clone())
        .list(&ctx, &params)
        .await?;
    Ok(Json(responses))
}

pub async fn get_user_response(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_user()?;
    let response_id = parse_path_id("User response", &id)?;
    let response = UserResponseService::new(state.mongo.clone())
        .get(&ctx, response_id)
        .await?;
    Ok(Json(response))
}

pub async fn create_user_response(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    AppJson(req): AppJson<CreateUserResponseRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_user()?;
    req.validate()?;

    let response = UserResponseService::new(state.mongo.clone())
        .create(&ctx, req)
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn update_user_response(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateUserResponseRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_user()?;
    let response_id = parse_path_id("User response", &id)?;
    req.validate()?;

    let response = UserResponseService::new(state.mongo.clone())
        .update(&ctx, response_id, req)
        .await?;
    Ok(Json(response))
}

pub async fn delete_user_response(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_user()?;
    let response_id = parse_path_id("User response", &id)?;
    UserResponseService::new(state.mongo.clone())
        .delete(&ctx, response_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
