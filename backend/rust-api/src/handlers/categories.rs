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
    models::category::{CreateCategoryRequest, UpdateCategoryRequest},
    services::{category_service::CategoryService, parse_path_id, query::ListParams, AppState},
};

pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<impl IntoResponse> {
    let categories = CategoryService::new(state.mongo.clone())
        .list(&params)
        .await?;
    Ok(Json(categories))
}

pub async fn get_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let category_id = parse_path_id("Category", &id)?;
    let category = CategoryService::new(state.mongo.clone())
        .get(category_id)
        .await?;
    Ok(Json(category))
}

pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    AppJson(req): AppJson<CreateCategoryRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_staff()?;
    req.validate()?;

    let category = CategoryService::new(state.mongo.clone())
        .create(&ctx, req)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateCategoryRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_staff()?;
    let category_id = parse_path_id("Category", &id)?;
    req.validate()?;

    let category = CategoryService::new(state.mongo.clone())
        .update(&ctx, category_id, req)
        .await?;
    Ok(Json(category))
}

pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_staff()?;
    let category_id = parse_path_id("Category", &id)?;
    CategoryService::new(state.mongo.clone())
        .delete(&ctx, category_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/categories/{id}/courses
pub async fn category_courses(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<ListParams>,
) -> ApiResult<impl IntoResponse> {
    let category_id = parse_path_id("Category", &id)?;
    let courses = CategoryService::new(state.mongo.clone())
        .courses(category_id, &params)
        .await?;
    Ok(Json(courses))
}
