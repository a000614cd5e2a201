use anyhow::Context;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::Database;

use super::error::{ServiceError, ServiceResult};
use super::query::{self, fetch_page, ListParams, Paginated};
use super::{parse_object_id, parse_object_ids};
use crate::context::RequestContext;
use crate::metrics;
use crate::models::choice::Choice;
use crate::models::question::Question;
use crate::models::user_response::{
    grade, CreateUserResponseRequest, UpdateUserResponseRequest, UserResponse,
    UserResponseResponse,
};

pub struct UserResponseService {
    mongo: Database,
}

impl UserResponseService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    fn responses(&self) -> mongodb::Collection<UserResponse> {
        self.mongo.collection::<UserResponse>("user_responses")
    }

    async fn load(&self, ctx: &RequestContext, id: ObjectId) -> ServiceResult<UserResponse> {
        ctx.require_user()?;
        let response = self
            .responses()
            .find_one(doc! { "_id": id })
            .await
            .context("Failed to query user response")?
            .ok_or(ServiceError::NotFound("User response"))?;

        if !ctx.is_owner_or_staff(&response.user_id) {
            return Err(ServiceError::NotFound("User response"));
        }
        Ok(response)
    }

    /// Grades the answer against the question and its stored choices.
    async fn check_answer(
        &self,
        question_id: ObjectId,
        text_answer: &[String],
        choice_answer: &[String],
    ) -> ServiceResult<(Vec<ObjectId>, bool)> {
        let question = self
            .mongo
            .collection::<Question>("questions")
            .find_one(doc! { "_id": question_id })
            .await
            .context("Failed to query question")?
            .ok_or_else(|| ServiceError::validation("question", "Question not found"))?;

        let choices: Vec<Choice> = self
            .mongo
            .collection::<Choice>("choices")
            .find(doc! { "question_id": question_id })
            .await
            .context("Failed to query choices")?
            .try_collect()
            .await
            .context("Failed to read choices")?;

        let selected = parse_object_ids("choice_answer", choice_answer)?;
        for choice_id in &selected {
            if !choices.iter().any(|c| c.id.as_ref() == Some(choice_id)) {
                return Err(ServiceError::validation(
                    "choice_answer",
                    format!("Choice {} does not belong to this question", choice_id.to_hex()),
                ));
            }
        }

        let is_correct = grade(&question.kind, &choices, text_answer, &selected);
        Ok((selected, is_correct))
    }

    pub async fn list(
        &self,
        ctx: &RequestContext,
        params: &ListParams,
    ) -> ServiceResult<Paginated<UserResponseResponse>> {
        let mut clauses = Vec::new();
        if let Some(user_id) = ctx.owner_scope()? {
            clauses.push(doc! { "user_id": user_id });
        }

        let filter = query::USER_RESPONSES.build_filter_with(params, clauses, Vec::new())?;
        let sort = query::USER_RESPONSES.sort(params);
        let page = query::page(params)?;

        let responses = fetch_page(&self.responses(), filter, sort, page).await?;
        Ok(responses.map(UserResponseResponse::from))
    }

    pub async fn get(&self, ctx: &RequestContext, id: ObjectId) -> ServiceResult<UserResponseResponse> {
        Ok(self.load(ctx, id).await?.into())
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        req: CreateUserResponseRequest,
    ) -> ServiceResult<UserResponseResponse> {
        let user_id = ctx.require_user()?;
        let question_id = parse_object_id("question", &req.question)?;
        let (choice_answer, is_correct) = self
            .check_answer(question_id, &req.text_answer, &req.choice_answer)
            .await?;

        let mut response = UserResponse {
            id: None,
            user_id,
            question_id,
            text_answer: req.text_answer,
            choice_answer,
            is_correct,
            submitted_at: Utc::now(),
        };
        let inserted = self
            .responses()
            .insert_one(&response)
            .await
            .context("Failed to insert user response")?;
        response.id = inserted.inserted_id.as_object_id();

        metrics::record_response(is_correct);
        tracing::info!(
            user_id = %user_id,
            question_id = %question_id,
            is_correct,
            "Response submitted"
        );
        Ok(response.into())
    }

    /// Replaces the answer and grades it again.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: ObjectId,
        req: UpdateUserResponseRequest,
    ) -> ServiceResult<UserResponseResponse> {
        let mut response = self.load(ctx, id).await?;

        let text_answer = req.text_answer.unwrap_or(response.text_answer);
        let choice_answer = match req.choice_answer {
            Some(values) => values,
            None => response.choice_answer.iter().map(|c| c.to_hex()).collect(),
        };
        let (selected, is_correct) = self
            .check_answer(response.question_id, &text_answer, &choice_answer)
            .await?;

        response.text_answer = text_answer;
        response.choice_answer = selected;
        response.is_correct = is_correct;
        response.submitted_at = Utc::now();

        self.responses()
            .replace_one(doc! { "_id": id }, &response)
            .await
            .context("Failed to update user response")?;

        metrics::record_response(is_correct);
        tracing::info!(user_response_id = %id, is_correct, "Response updated");
        Ok(response.into())
    }

    pub async fn delete(&self, ctx: &RequestContext, id: ObjectId) -> ServiceResult<()> {
        self.load(ctx, id).await?;

        self.responses()
            .delete_one(doc! { "_id": id })
            .await
            .context("Failed to delete user response")?;

        tracing::info!(user_response_id = %id, "Response deleted");
        Ok(())
    }
}
