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
    models::lesson::{CreateLessonRequest, ReorderSlidesRequest, UpdateLessonRequest},
    services::{lesson_service::LessonService, parse_path_id, query::ListParams, AppState},
};

pub async fn list_lessons(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<impl IntoResponse> {
    let lessons = LessonService::new(state.mongo.clone()).list(&params).await?;
    Ok(Json(lessons))
}

pub async fn get_lesson(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let lesson_id = parse_path_id("Lesson", &id)?;
    let lesson = LessonService::new(state.mongo.clone())
        .get(&ctx, lesson_id)
        .await?;
    Ok(Json(lesson))
}

pub async fn create_lesson(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    AppJson(req): AppJson<CreateLessonRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_user()?;
    req.validate()?;

    let lesson = LessonService::new(state.mongo.clone())
        .create(&ctx, req)
        .await?;
    Ok((StatusCode::CREATED, Json(lesson)))
}

pub async fn update_lesson(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateLessonRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_user()?;
    let lesson_id = parse_path_id("Lesson", &id)?;
    req.validate()?;

    let lesson = LessonService::new(state.mongo.clone())
        .update(&ctx, lesson_id, req)
        .await?;
    Ok(Json(lesson))
}

pub async fn delete_lesson(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_user()?;
    let lesson_id = parse_path_id("Lesson", &id)?;
    LessonService::new(state.mongo.clone())
        .delete(&ctx, lesson_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/lessons/{id}/reorder-slides
pub async fn reorder_slides(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    AppJson(req): AppJson<ReorderSlidesRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_user()?;
    let lesson_id = parse_path_id("Lesson", &id)?;
    req.validate()?;

    let slides = LessonService::new(state.mongo.clone())
        .reorder_slides(&ctx, lesson_id, req)
        .await?;
    Ok(Json(slides))
}
