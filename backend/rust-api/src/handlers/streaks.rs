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
    models::streak::{
        CreateStreakRequest, RecordInteractionRequest, RecordOwnInteractionRequest,
        UpdateStreakRequest,
    },
    services::{parse_path_id, query::ListParams, streak_service::StreakService, AppState},
};

pub async fn list_streaks(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Query(params): Query<ListParams>,
) -> ApiResult<impl IntoResponse> {
    let streaks = StreakService::new(state.mongo.clone())
        .list(&ctx, &params)
        .await?;
    Ok(Json(streaks))
}

pub async fn get_streak(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_user()?;
    let streak_id = parse_path_id("Streak", &id)?;
    let streak = StreakService::new(state.mongo.clone())
        .get(&ctx, streak_id)
        .await?;
    Ok(Json(streak))
}

pub async fn create_streak(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    AppJson(req): AppJson<CreateStreakRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_user()?;
    req.validate()?;

    let streak = StreakService::new(state.mongo.clone())
        .create(&ctx, req)
        .await?;
    Ok((StatusCode::CREATED, Json(streak)))
}

pub async fn update_streak(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateStreakRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_user()?;
    let streak_id = parse_path_id("Streak", &id)?;
    req.validate()?;

    let streak = StreakService::new(state.mongo.clone())
        .update(&ctx, streak_id, req)
        .await?;
    Ok(Json(streak))
}

pub async fn delete_streak(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_user()?;
    let streak_id = parse_path_id("Streak", &id)?;
    StreakService::new(state.mongo.clone())
        .delete(&ctx, streak_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/streaks/{id}/record-interaction
pub async fn record_interaction(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    body: Option<AppJson<RecordInteractionRequest>>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_user()?;
    let streak_id = parse_path_id("Streak", &id)?;
    let req = body.map(|AppJson(req)| req).unwrap_or_default();

    let streak = StreakService::new(state.mongo.clone())
        .record_interaction(&ctx, streak_id, req)
        .await?;
    Ok(Json(streak))
}

/// POST /api/v1/streaks/record-interaction
pub async fn record_own_interaction(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    AppJson(req): AppJson<RecordOwnInteractionRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_user()?;
    let streak = StreakService::new(state.mongo.clone())
        .record_own_interaction(&ctx, req)
        .await?;
    Ok(Json(streak))
}
