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
    models::editor::{CreateEditorRequest, UpdateEditorRequest},
    services::{editor_service::EditorService, parse_path_id, query::ListParams, AppState},
};

pub async fn list_editors(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<impl IntoResponse> {
    let editors = EditorService::new(state.mongo.clone()).list(&params).await?;
    Ok(Json(editors))
}

pub async fn get_editor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let editor_id = parse_path_id("Editor", &id)?;
    let editor = EditorService::new(state.mongo.clone()).get(editor_id).await?;
    Ok(Json(editor))
}

pub async fn create_editor(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    AppJson(req): AppJson<CreateEditorRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_staff()?;
    req.validate()?;

    let editor = EditorService::new(state.mongo.clone())
        .create(&ctx, req)
        .await?;
    Ok((StatusCode::CREATED, Json(editor)))
}

pub async fn update_editor(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateEditorRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_staff()?;
    let editor_id = parse_path_id("Editor", &id)?;
    req.validate()?;

    let editor = EditorService::new(state.mongo.clone())
        .update(&ctx, editor_id, req)
        .await?;
    Ok(Json(editor))
}

pub async fn delete_editor(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_staff()?;
    let editor_id = parse_path_id("Editor", &id)?;
    EditorService::new(state.mongo.clone())
        .delete(&ctx, editor_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
