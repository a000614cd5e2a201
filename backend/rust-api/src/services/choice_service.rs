use anyhow::Context;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::Database;

use super::error::{ServiceError, ServiceResult};
use super::ordering::next_order;
use super::parse_object_id;
use super::query::{self, fetch_page, ListParams, Paginated};
use crate::context::RequestContext;
use crate::models::choice::{Choice, ChoiceResponse, CreateChoiceRequest, UpdateChoiceRequest};

/// Inserts a choice under an existing question, ordering it last when no order is given.
pub async fn insert_choice(
    mongo: &Database,
    question_id: ObjectId,
    req: CreateChoiceRequest,
) -> ServiceResult<Choice> {
    let order = match req.order {
        Some(order) => order,
        None => next_order(mongo, "choices", "question_id", question_id).await?,
    };

    let mut choice = Choice {
        id: None,
        question_id,
        text: req.text,
        alt_text: req.alt_text,
        image: req.image,
        order,
        hidden: req.hidden,
        choice_type: req.choice_type,
        is_correct: req.is_correct,
    };
    choice.check_content()?;

    let inserted = mongo
        .collection::<Choice>("choices")
        .insert_one(&choice)
        .await
        .context("Failed to insert choice")?;
    choice.id = inserted.inserted_id.as_object_id();

    tracing::info!(choice_id = ?choice.id, question_id = %question_id, order, "Choice created");
    Ok(choice)
}

pub struct ChoiceService {
    mongo: Database,
}

impl ChoiceService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    fn choices(&self) -> mongodb::Collection<Choice> {
        self.mongo.collection::<Choice>("choices")
    }

    async fn load(&self, choice_id: ObjectId) -> ServiceResult<Choice> {
        self.choices()
            .find_one(doc! { "_id": choice_id })
            .await
            .context("Failed to query choice")?
            .ok_or(ServiceError::NotFound("Choice"))
    }

    pub async fn list(&self, params: &ListParams) -> ServiceResult<Paginated<ChoiceResponse>> {
        let filter = query::CHOICES.build_filter(params)?;
        let sort = query::CHOICES.sort(params);
        let page = query::page(params)?;

        let choices = fetch_page(&self.choices(), filter, sort, page).await?;
        Ok(choices.map(ChoiceResponse::from))
    }

    pub async fn get(&self, choice_id: ObjectId) -> ServiceResult<ChoiceResponse> {
        Ok(self.load(choice_id).await?.into())
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        req: CreateChoiceRequest,
    ) -> ServiceResult<ChoiceResponse> {
        ctx.require_staff()?;

        let raw = req
            .question
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ServiceError::validation("question", "This field is required."))?;
        let question_id = parse_object_id("question", raw)?;

        let exists = self
            .mongo
            .collection::<mongodb::bson::Document>("questions")
            .count_documents(doc! { "_id": question_id })
            .await
            .context("Failed to query question")?;
        if exists == 0 {
            return Err(ServiceError::validation("question", "Question not found"));
        }

        Ok(insert_choice(&self.mongo, question_id, req).await?.into())
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        choice_id: ObjectId,
        req: UpdateChoiceRequest,
    ) -> ServiceResult<ChoiceResponse> {
        ctx.require_staff()?;
        let mut choice = self.load(choice_id).await?;
        req.apply_to(&mut choice);
        choice.check_content()?;

        self.choices()
            .replace_one(doc! { "_id": choice_id }, &choice)
            .await
            .context("Failed to update choice")?;

        tracing::info!(choice_id = %choice_id, "Choice updated");
        Ok(choice.into())
    }

    pub async fn delete(&self, ctx: &RequestContext, choice_id: ObjectId) -> ServiceResult<()> {
        ctx.require_staff()?;

        let result = self
            .choices()
            .delete_one(doc! { "_id": choice_id })
            .await
            .context("Failed to delete choice")?;
        if result.deleted_count == 0 {
            return Err(ServiceError::NotFound("Choice"));
        }

        tracing::info!(choice_id = %choice_id, "Choice deleted");
        Ok(())
    }
}
