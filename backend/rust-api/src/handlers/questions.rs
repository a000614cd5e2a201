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
        choice::CreateChoiceRequest,
        question::{CreateQuestionRequest, UpdateQuestionRequest},
    },
    services::{parse_path_id, query::ListParams, question_service::QuestionService, AppState},
};

pub async fn list_questions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<impl IntoResponse> {
    let questions = QuestionService::new(state.mongo.clone())
        .list(&params)
        .await?;
    Ok(Json(questions))
}

pub async fn get_question(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let question_id = parse_path_id("Question", &id)?;
    let question = QuestionService::new(state.mongo.clone())
        .get(question_id)
        .await?;
    Ok(Json(question))
}

pub async fn create_question(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    AppJson(req): AppJson<CreateQuestionRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_staff()?;
    req.validate()?;

    let question = QuestionService::new(state.mongo.clone())
        .create(&ctx, req)
        .await?;
    Ok((StatusCode::CREATED, Json(question)))
}

pub async fn update_question(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateQuestionRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_staff()?;
    let question_id = parse_path_id("Question", &id)?;
    req.validate()?;

    let question = QuestionService::new(state.mongo.clone())
        .update(&ctx, question_id, req)
        .await?;
    Ok(Json(question))
}

pub async fn delete_question(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_staff()?;
    let question_id = parse_path_id("Question", &id)?;
    QuestionService::new(state.mongo.clone())
        .delete(&ctx, question_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/questions/{id}/add-choice
pub async fn add_choice(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    AppJson(req): AppJson<CreateChoiceRequest>,
) -> ApiResult<impl IntoResponse> {
    ctx.require_staff()?;
    let question_id = parse_path_id("Question", &id)?;
    req.validate()?;

    let choice = QuestionService::new(state.mongo.clone())
        .add_choice(&ctx, question_id, req)
        .await?;
    Ok((StatusCode::CREATED, Json(choice)))
}
