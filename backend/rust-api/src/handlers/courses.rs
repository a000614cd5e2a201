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
    models::{
        category::CategoryIdsRequest,
        course::{CreateCourseRequest, UpdateCourseRequest},
    },
    services::{course_service::CourseService, parse_path_id, query::ListParams, AppState},
};

pub async fn list_courses(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Query(params): Query<ListParams>,
) -> ApiResult<impl IntoResponse> {
    let courses = CourseService::new(state.mongo.clone())
        .list(&ctx, &params)
        .await?;
    Ok(Json(courses))
}

pub async fn get_course(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let course_id = parse_path_id("Course", &id)?;
    let course = CourseService::new(state.mongo.clone())
        .get(&ctx, course_id)
        .await?;
    Ok(Json(course))
}

pub async fn create_course(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    AppJson(req): AppJson<CreateCourseRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_user()?;
    req.validate()?;

    let course = CourseService::new(state.mongo.clone())
        .create(&ctx, req)
        .await?;
    Ok((StatusCode::CREATED, Json(course)))
}

pub async fn update_course(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateCourseRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_user()?;
    let course_id = parse_path_id("Course", &id)?;
    req.validate()?;

    let course = CourseService::new(state.mongo.clone())
        .update(&ctx, course_id, req)
        .await?;
    Ok(Json(course))
}

pub async fn delete_course(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_user()?;
    let course_id = parse_path_id("Course", &id)?;
    CourseService::new(state.mongo.clone())
        .delete(&ctx, course_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/courses/{id}/publish
pub async fn publish_course(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_user()?;
    let course_id = parse_path_id("Course", &id)?;
    let response = CourseService::new(state.mongo.clone())
        .set_published(&ctx, course_id, true)
        .await?;
    Ok(Json(response))
}

/// POST /api/v1/courses/{id}/unpublish
pub async fn unpublish_course(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_user()?;
    let course_id = parse_path_id("Course", &id)?;
    let response = CourseService::new(state.mongo.clone())
        .set_published(&ctx, course_id, false)
        .await?;
    Ok(Json(response))
}

/// POST /api/v1/courses/{id}/add-categories
pub async fn add_categories(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    AppJson(req): AppJson<CategoryIdsRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_user()?;
    let course_id = parse_path_id("Course", &id)?;
    let response = CourseService::new(state.mongo.clone())
        .add_categories(&ctx, course_id, req)
        .await?;
    Ok(Json(response))
}

/// POST /api/v1/courses/{id}/remove-categories
pub async fn remove_categories(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    AppJson(req): AppJson<CategoryIdsRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_user()?;
    let course_id = parse_path_id("Course", &id)?;
    let response = CourseService::new(state.mongo.clone())
        .remove_categories(&ctx, course_id, req)
        .await?;
    Ok(Json(response))
}

/// GET /api/v1/courses/{id}/statistics
pub async fn course_statistics(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let course_id = parse_path_id("Course", &id)?;
    let statistics = CourseService::new(state.mongo.clone())
        .statistics(&ctx, course_id)
        .await?;
    Ok(Json(statistics))
}

/// GET /api/v1/courses/{id}/chapters
pub async fn course_chapters(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let course_id = parse_path_id("Course", &id)?;
    let chapters = CourseService::new(state.mongo.clone())
        .chapters(&ctx, course_id)
        .await?;
    Ok(Json(chapters))
}
