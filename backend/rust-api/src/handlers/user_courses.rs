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
    models::user_course::{
        CreateUserCourseRequest, UpdateProgressRequest, UpdateUserCourseRequest,
    },
    services::{parse_path_id, query::ListParams, user_course_service::UserCourseService, AppState},
};

pub async fn list_user_courses(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Query(params): Query<ListParams>,
) -> ApiResult<impl IntoResponse> {
    let user_courses = UserCourseService::new(state.mongo.clone())
        .list(&ctx, &params)
        .await?;
    Ok(Json(user_courses))
}

pub async fn get_user_course(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_user()?;
    let user_course_id = parse_path_id("User course", &id)?;
    let user_course = UserCourseService::new(state.mongo.clone())
        .get(&ctx, user_course_id)
        .await?;
    Ok(Json(user_course))
}

pub async fn create_user_course(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    AppJson(req): AppJson<CreateUserCourseRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_user()?;
    req.validate()?;

    let user_course = UserCourseService::new(state.mongo.clone())
        .create(&ctx, req)
        .await?;
    Ok((StatusCode::CREATED, Json(user_course)))
}

pub async fn update_user_course(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateUserCourseRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_user()?;
    let user_course_id = parse_path_id("User course", &id)?;
    req.validate()?;

    let user_course = UserCourseService::new(state.mongo.clone())
        .update(&ctx, user_course_id, req)
        .await?;
    Ok(Json(user_course))
}

pub async fn delete_user_course(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_user()?;
    let user_course_id = parse_path_id("User course", &id)?;
    UserCourseService::new(state.mongo.clone())
        .delete(&ctx, user_course_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/user-courses/{id}/update-progress
pub async fn update_progress(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateProgressRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_user()?;
    let user_course_id = parse_path_id("User course", &id)?;
    req.validate()?;

    let user_course = UserCourseService::new(state.mongo.clone())
        .update_progress(&ctx, user_course_id, req)
        .await?;
    Ok(Json(user_course))
}
