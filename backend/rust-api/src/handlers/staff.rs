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
        staff::{CreateStaffRequest, UpdateStaffRequest},
        user::check_new_password,
    },
    services::{parse_path_id, query::ListParams, staff_service::StaffService, AppState},
};

pub async fn list_staff(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Query(params): Query<ListParams>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_staff()?;
    let staff = StaffService::new(state.mongo.clone())
        .list(&ctx, &params)
        .await?;
    Ok(Json(staff))
}

pub async fn get_staff(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_staff()?;
    let staff_id = parse_path_id("Staff", &id)?;
    let staff = StaffService::new(state.mongo.clone())
        .get(&ctx, staff_id)
        .await?;
    Ok(Json(staff))
}

pub async fn create_staff(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    AppJson(req): AppJson<CreateStaffRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_staff()?;
    req.validate()?;
    check_new_password(&req.user.password, &req.user.confirm_password)?;

    let staff = StaffService::new(state.mongo.clone())
        .create(&ctx, req)
        .await?;
    Ok((StatusCode::CREATED, Json(staff)))
}

pub async fn update_staff(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateStaffRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_staff()?;
    let staff_id = parse_path_id("Staff", &id)?;
    req.validate()?;

    let staff = StaffService::new(state.mongo.clone())
        .update(&ctx, staff_id, req)
        .await?;
    Ok(Json(staff))
}

pub async fn delete_staff(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_staff()?;
    let staff_id = parse_path_id("Staff", &id)?;
    StaffService::new(state.mongo.clone())
        .delete(&ctx, staff_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
