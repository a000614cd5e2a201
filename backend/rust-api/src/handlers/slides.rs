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
    models::slide::{CreateSlideRequest, UpdateSlideRequest},
    services::{parse_path_id, query::ListParams, slide_service::SlideService, AppState},
};

pub async fn list_slides(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<impl IntoResponse> {
    let slides = SlideService::new(state.mongo.clone()).list(&params).await?;
    Ok(Json(slides))
}

pub async fn get_slide(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let slide_id = parse_path_id("Slide", &id)?;
    let slide = SlideService::new(state.mongo.clone())
        .get(&ctx, slide_id)
        .await?;
    Ok(Json(slide))
}

pub async fn create_slide(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    AppJson(req): AppJson<CreateSlideRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_user()?;
    req.validate()?;

    let slide = SlideService::new(state.mongo.clone())
        .create(&ctx, req)
        .await?;
    Ok((StatusCode::CREATED, Json(slide)))
}

pub async fn update_slide(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateSlideRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_user()?;
    let slide_id = parse_path_id("Slide", &id)?;
    req.validate()?;

    let slide = SlideService::new(state.mongo.clone())
        .update(&ctx, slide_id, req)
        .await?;
    Ok(Json(slide))
}

pub async fn delete_slide(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_user()?;
    let slide_id = parse_path_id("Slide", &id)?;
    SlideService::new(state.mongo.clone())
        .delete(&ctx, slide_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/slides/{id}/toggle-activity
pub async fn toggle_activity(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_user()?;
    let slide_id = parse_path_id("Slide", &id)?;
    let response = SlideService::new(state.mongo.clone())
        .toggle_activity(&ctx, slide_id)
        .await?;
    Ok(Json(response))
}

/// POST /api/v1/slides/{id}/increment-comments
pub async fn increment_comments(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_user()?;
    let slide_id = parse_path_id("Slide", &id)?;
    let response = SlideService::new(state.mongo.clone())
        .increment_comments(&ctx, slide_id)
        .await?;
    Ok(Json(response))
}
