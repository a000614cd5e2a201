use anyhow::Context;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use mongodb::Database;

use super::choice_service::insert_choice;
use super::error::{ServiceError, ServiceResult};
use super::parse_object_id;
use super::query::{self, fetch_page, ListParams, Paginated};
use crate::context::RequestContext;
use crate::models::choice::{Choice, ChoiceResponse, CreateChoiceRequest};
use crate::models::question::{
    check_choice_consistency, CreateQuestionRequest, Question, QuestionKind, QuestionResponse,
    UpdateQuestionRequest,
};
use crate::models::staff::Staff;

pub struct QuestionService {
    mongo: Database,
}

impl QuestionService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    fn questions(&self) -> mongodb::Collection<Question> {
        self.mongo.collection::<Question>("questions")
    }

    async fn load(&self, question_id: ObjectId) -> ServiceResult<Question> {
        self.questions()
            .find_one(doc! { "_id": question_id })
            .await
            .context("Failed to query question")?
            .ok_or(ServiceError::NotFound("Question"))
    }

    /// Choices of a question in order.
    pub async fn choices_of(&self, question_id: ObjectId) -> ServiceResult<Vec<Choice>> {
        let choices = self
            .mongo
            .collection::<Choice>("choices")
            .find(doc! { "question_id": question_id })
            .sort(doc! { "order": 1 })
            .await
            .context("Failed to query choices")?
            .try_collect()
            .await
            .context("Failed to read choices")?;
        Ok(choices)
    }

    async fn respond(&self, question: Question) -> ServiceResult<QuestionResponse> {
        let choices = match question.id {
            Some(id) => self.choices_of(id).await?,
            None => Vec::new(),
        };
        Ok(QuestionResponse::new(question, choices))
    }

    /// Staff record id for the `editor` field; an empty value clears it.
    async fn resolve_editor(&self, value: &str) -> ServiceResult<Option<ObjectId>> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(None);
        }
        let staff_id = parse_object_id("editor", value)?;
        let exists = self
            .mongo
            .collection::<Staff>("staff")
            .count_documents(doc! { "_id": staff_id })
            .await
            .context("Failed to query staff")?;
        if exists == 0 {
            return Err(ServiceError::validation("editor", "Staff member not found"));
        }
        Ok(Some(staff_id))
    }

    pub async fn list(&self, params: &ListParams) -> ServiceResult<Paginated<QuestionResponse>> {
        let filter = query::QUESTIONS.build_filter(params)?;
        let sort = query::QUESTIONS.sort(params);
        let page = query::page(params)?;

        let questions = fetch_page(&self.questions(), filter, sort, page).await?;

        let mut results = Vec::with_capacity(questions.results.len());
        for question in questions.results {
            results.push(self.respond(question).await?);
        }
        Ok(Paginated::new(questions.count, page, results))
    }

    pub async fn get(&self, question_id: ObjectId) -> ServiceResult<QuestionResponse> {
        let question = self.load(question_id).await?;
        self.respond(question).await
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        req: CreateQuestionRequest,
    ) -> ServiceResult<QuestionResponse> {
        ctx.require_staff()?;

        let kind = QuestionKind::build(req.question_type, req.correct_answers)?;
        let editor_id = match &req.editor {
            Some(value) => self.resolve_editor(value).await?,
            None => None,
        };

        let now = Utc::now();
        let mut question = Question {
            id: None,
            title: req.title,
            description: req.description,
            kind,
            image: req.image,
            video_url: req.video_url,
            answer_description: req.answer_description,
            editor_id,
            is_text_input: req.is_text_input,
            created_at: now,
            updated_at: now,
        };
        question.check_content()?;

        let inserted = self
            .questions()
            .insert_one(&question)
            .await
            .context("Failed to insert question")?;
        question.id = inserted.inserted_id.as_object_id();

        tracing::info!(
            question_id = ?question.id,
            question_type = question.kind.question_type().as_str(),
            "Question created"
        );
        self.respond(question).await
    }

    /// Applies the update and re-checks choice consistency against stored choices.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        question_id: ObjectId,
        req: UpdateQuestionRequest,
    ) -> ServiceResult<QuestionResponse> {
        ctx.require_staff()?;
        let mut question = self.load(question_id).await?;

        req.apply_to(&mut question)?;
        if let Some(value) = &req.editor {
            question.editor_id = self.resolve_editor(value).await?;
        }
        question.check_content()?;

        let choices = self.choices_of(question_id).await?;
        if let Err(e) = check_choice_consistency(&question.kind, &choices) {
            tracing::warn!(question_id = %question_id, "Question update rejected: {}", e);
            return Err(e);
        }
        question.updated_at = Utc::now();

        self.questions()
            .replace_one(doc! { "_id": question_id }, &question)
            .await
            .context("Failed to update question")?;

        tracing::info!(question_id = %question_id, "Question updated");
        Ok(QuestionResponse::new(question, choices))
    }

    /// Deletes the question with its choices and responses; slides keep existing without it.
    pub async fn delete(&self, ctx: &RequestContext, question_id: ObjectId) -> ServiceResult<()> {
        ctx.require_staff()?;

        let result = self
            .questions()
            .delete_one(doc! { "_id": question_id })
            .await
            .context("Failed to delete question")?;
        if result.deleted_count == 0 {
            return Err(ServiceError::NotFound("Question"));
        }

        for collection in ["choices", "user_responses"] {
            self.mongo
                .collection::<Document>(collection)
                .delete_many(doc! { "question_id": question_id })
                .await
                .with_context(|| format!("Failed to delete question {}", collection))?;
        }
        self.mongo
            .collection::<Document>("slides")
            .update_many(
                doc! { "question_id": question_id },
                doc! { "$set": { "question_id": Bson::Null } },
            )
            .await
            .context("Failed to detach question from slides")?;

        tracing::info!(question_id = %question_id, "Question deleted");
        Ok(())
    }

    pub async fn add_choice(
        &self,
        ctx: &RequestContext,
        question_id: ObjectId,
        req: CreateChoiceRequest,
    ) -> ServiceResult<ChoiceResponse> {
        ctx.require_staff()?;
        self.load(question_id).await?;

        let choice = insert_choice(&self.mongo, question_id, req).await?;
        Ok(choice.into())
    }
}
