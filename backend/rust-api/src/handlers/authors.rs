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
    models::author::{
        AuthorCourseRequest, BecomeAuthorRequest, CreateAuthorRequest, UpdateAuthorRequest,
    },
    services::{author_service::AuthorService, parse_path_id, query::ListParams, AppState},
};

pub async fn list_authors(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<impl IntoResponse> {
    let authors = AuthorService::new(state.mongo.clone()).list(&params).await?;
    Ok(Json(authors))
}

pub async fn get_author(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let author_id = parse_path_id("Author", &id)?;
    let author = AuthorService::new(state.mongo.clone()).get(author_id).await?;
    Ok(Json(author))
}

pub async fn create_author(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    AppJson(req): AppJson<CreateAuthorRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_staff()?;
    req.validate()?;

    let author = AuthorService::new(state.mongo.clone())
        .create(&ctx, req)
        .await?;
    Ok((StatusCode::CREATED, Json(author)))
}

/// POST /api/v1/authors/become-author
pub async fn become_author(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    body: Option<AppJson<BecomeAuthorRequest>>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_user()?;
    let req = body.map(|AppJson(req)| req).unwrap_or_default();
    req.validate()?;

    let author = AuthorService::new(state.mongo.clone())
        .become_author(&ctx, req)
        .await?;
    Ok((StatusCode::CREATED, Json(author)))
}

pub async fn update_author(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateAuthorRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_staff()?;
    let author_id = parse_path_id("Author", &id)?;
    req.validate()?;

    let author = AuthorService::new(state.mongo.clone())
        .update(&ctx, author_id, req)
        .await?;
    Ok(Json(author))
}

pub async fn delete_author(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_staff()?;
    let author_id = parse_path_id("Author", &id)?;
    AuthorService::new(state.mongo.clone())
        .delete(&ctx, author_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/authors/{id}/courses
pub async fn author_courses(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let author_id = parse_path_id("Author", &id)?;
    let courses = AuthorService::new(state.mongo.clone())
        .courses(author_id)
        .await?;
    Ok(Json(courses))
}

/// POST /api/v1/authors/{id}/add-to-course
pub async fn add_to_course(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    AppJson(req): AppJson<AuthorCourseRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_staff()?;
    let author_id = parse_path_id("Author", &id)?;
    let author = AuthorService::new(state.mongo.clone())
        .add_to_course(&ctx, author_id, req)
        .await?;
    Ok(Json(author))
}

/// POST /api/v1/authors/{id}/remove-from-course
pub async fn remove_from_course(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    AppJson(req): AppJson<AuthorCourseRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_staff()?;
    let author_id = parse_path_id("Author", &id)?;
    let author = AuthorService::new(state.mongo.clone())
        .remove_from_course(&ctx, author_id, req)
        .await?;
    Ok(Json(author))
}
