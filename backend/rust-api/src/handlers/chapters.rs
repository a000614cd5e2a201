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
    models::chapter::{CreateChapterRequest, UpdateChapterRequest},
    services::{chapter_service::ChapterService, parse_path_id, query::ListParams, AppState},
};

pub async fn list_chapters(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<impl IntoResponse> {
    let chapters = ChapterService::new(state.mongo.clone())
        .list(&params)
        .await?;
    Ok(Json(chapters))
}

pub async fn get_chapter(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let chapter_id = parse_path_id("Chapter", &id)?;
    let chapter = ChapterService::new(state.mongo.clone())
        .get(&ctx, chapter_id)
        .await?;
    Ok(Json(chapter))
}

pub async fn create_chapter(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    AppJson(req): AppJson<CreateChapterRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_user()?;
    req.validate()?;

    let chapter = ChapterService::new(state.mongo.clone())
        .create(&ctx, req)
        .await?;
    Ok((StatusCode::CREATED, Json(chapter)))
}

pub async fn update_chapter(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateChapterRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_user()?;
    let chapter_id = parse_path_id("Chapter", &id)?;
    req.validate()?;

    let chapter = ChapterService::new(state.mongo.clone())
        .update(&ctx, chapter_id, req)
        .await?;
    Ok(Json(chapter))
}

pub async fn delete_chapter(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_user()?;
    let chapter_id = parse_path_id("Chapter", &id)?;
    ChapterService::new(state.mongo.clone())
        .delete(&ctx, chapter_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/chapters/{id}/lessons
pub async fn chapter_lessons(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let chapter_id = parse_path_id("Chapter", &id)?;
    let lessons = ChapterService::new(state.mongo.clone())
        .lessons(&ctx, chapter_id)
        .await?;
    Ok(Json(lessons))
}
