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
    models::choice::{CreateChoiceRequest, UpdateChoiceRequest},
    services::{choice_service::ChoiceService, parse_path_id, query::ListParams, AppState},
};

pub async fn list_choices(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<impl IntoResponse> {
    let choices = ChoiceService::new(state.mongo.clone()).list(&params).await?;
    Ok(Json(choices))
}

pub async fn get_choice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let choice_id = parse_path_id("Choice", &id)?;
    let choice = ChoiceService::new(state.mongo.clone()).get(choice_id).await?;
    Ok(Json(choice))
}

pub async fn create_choice(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    AppJson(req): AppJson<CreateChoiceRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_staff()?;
    req.validate()?;

    let choice = ChoiceService::new(state.mongo.clone())
        .create(&ctx, req)
        .await?;
    Ok((StatusCode::CREATED, Json(choice)))
}

pub async fn update_choice(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateChoiceRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_staff()?;
    let choice_id = parse_path_id("Choice", &id)?;
    req.validate()?;

    let choice = ChoiceService::new(state.mongo.clone())
        .update(&ctx, choice_id, req)
        .await?;
    Ok(Json(choice))
}

pub async fn delete_choice(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_staff()?;
    let choice_id = parse_path_id("Choice", &id)?;
    ChoiceService::new(state.mongo.clone())
        .delete(&ctx, choice_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
