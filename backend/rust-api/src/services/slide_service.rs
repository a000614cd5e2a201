use anyhow::Context;
use chrono::Utc;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::options::ReturnDocument;
use mongodb::Database;

use super::error::{ServiceError, ServiceResult};
use super::ordering::next_order;
use super::parse_object_id;
use super::permissions::{caller_author_id, can_view_course, ensure_content_editor, load_course};
use super::query::{self, fetch_page, ListParams, Paginated};
use crate::context::RequestContext;
use crate::models::lesson::Lesson;
use crate::models::slide::{
    CommentsCountResponse, CreateSlideRequest, Slide, SlideResponse, ToggleActivityResponse,
    UpdateSlideRequest,
};

pub struct SlideService {
    mongo: Database,
}

impl SlideService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    fn slides(&self) -> mongodb::Collection<Slide> {
        self.mongo.collection::<Slide>("slides")
    }

    async fn load(&self, slide_id: ObjectId) -> ServiceResult<Slide> {
        self.slides()
            .find_one(doc! { "_id": slide_id })
            .await
            .context("Failed to query slide")?
            .ok_or(ServiceError::NotFound("Slide"))
    }

    /// Resolves an optional reference; an empty string clears it.
    async fn resolve_reference(
        &self,
        field: &'static str,
        collection: &str,
        value: Option<&str>,
    ) -> ServiceResult<Option<ObjectId>> {
        let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Ok(None);
        };
        let id = parse_object_id(field, raw)?;
        let exists = self
            .mongo
            .collection::<Document>(collection)
            .count_documents(doc! { "_id": id })
            .await
            .with_context(|| format!("Failed to query {}", collection))?;
        if exists == 0 {
            return Err(ServiceError::validation(
                field,
                format!("Invalid pk \"{}\" - object does not exist.", raw),
            ));
        }
        Ok(Some(id))
    }

    pub async fn list(&self, params: &ListParams) -> ServiceResult<Paginated<SlideResponse>> {
        let filter = query::SLIDES.build_filter(params)?;
        let sort = query::SLIDES.sort(params);
        let page = query::page(params)?;

        let slides = fetch_page(&self.slides(), filter, sort, page).await?;
        Ok(slides.map(SlideResponse::from))
    }

    pub async fn get(&self, ctx: &RequestContext, slide_id: ObjectId) -> ServiceResult<SlideResponse> {
        let slide = self.load(slide_id).await?;
        let course = load_course(&self.mongo, slide.course_id).await?;
        let author_id = caller_author_id(&self.mongo, ctx).await?;
        if !can_view_course(ctx, &course, author_id.as_ref()) {
            return Err(ServiceError::NotFound("Slide"));
        }
        Ok(slide.into())
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        req: CreateSlideRequest,
    ) -> ServiceResult<SlideResponse> {
        ctx.require_user()?;
        let lesson_id = parse_object_id("lesson", &req.lesson)?;
        let lesson = self
            .mongo
            .collection::<Lesson>("lessons")
            .find_one(doc! { "_id": lesson_id })
            .await
            .context("Failed to query lesson")?
            .ok_or_else(|| ServiceError::validation("lesson", "Lesson not found"))?;
        ensure_content_editor(&self.mongo, ctx, lesson.course_id).await?;

        let question_id = self
            .resolve_reference("question", "questions", req.question.as_deref())
            .await?;
        let editor_id = self
            .resolve_reference("editor", "editors", req.editor.as_deref())
            .await?;

        let order = match req.order {
            Some(order) => order,
            None => next_order(&self.mongo, "slides", "lesson_id", lesson_id).await?,
        };

        let now = Utc::now();
        let mut slide = Slide {
            id: None,
            lesson_id,
            chapter_id: lesson.chapter_id,
            course_id: lesson.course_id,
            title: req.title,
            content: req.content,
            total_marks: req.total_marks,
            slide_type: req.slide_type,
            time_limit: req.time_limit,
            is_active: req.is_active,
            is_required: req.is_required,
            hints: req.hints,
            alt_text: req.alt_text,
            image: req.image,
            video_url: req.video_url,
            comments_count: 0,
            question_id,
            editor_id,
            order,
            created_at: now,
            updated_at: now,
        };
        slide.check_type_requirements()?;

        let inserted = self
            .slides()
            .insert_one(&slide)
            .await
            .context("Failed to insert slide")?;
        slide.id = inserted.inserted_id.as_object_id();

        tracing::info!(
            slide_id = ?slide.id,
            lesson_id = %lesson_id,
            slide_type = slide.slide_type.as_str(),
            order,
            "Slide created"
        );
        Ok(slide.into())
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        slide_id: ObjectId,
        req: UpdateSlideRequest,
    ) -> ServiceResult<SlideResponse> {
        ctx.require_user()?;
        let mut slide = self.load(slide_id).await?;
        ensure_content_editor(&self.mongo, ctx, slide.course_id).await?;

        req.apply_to(&mut slide);
        if req.question.is_some() {
            slide.question_id = self
                .resolve_reference("question", "questions", req.question.as_deref())
                .await?;
        }
        if req.editor.is_some() {
            slide.editor_id = self
                .resolve_reference("editor", "editors", req.editor.as_deref())
                .await?;
        }
        slide.check_type_requirements()?;
        slide.updated_at = Utc::now();

        self.slides()
            .replace_one(doc! { "_id": slide_id }, &slide)
            .await
            .context("Failed to update slide")?;

        tracing::info!(slide_id = %slide_id, "Slide updated");
        Ok(slide.into())
    }

    pub async fn delete(&self, ctx: &RequestContext, slide_id: ObjectId) -> ServiceResult<()> {
        ctx.require_user()?;
        let slide = self.load(slide_id).await?;
        ensure_content_editor(&self.mongo, ctx, slide.course_id).await?;

        self.slides()
            .delete_one(doc! { "_id": slide_id })
            .await
            .context("Failed to delete slide")?;

        tracing::info!(slide_id = %slide_id, "Slide deleted");
        Ok(())
    }

    pub async fn toggle_activity(
        &self,
        ctx: &RequestContext,
        slide_id: ObjectId,
    ) -> ServiceResult<ToggleActivityResponse> {
        ctx.require_user()?;
        let slide = self.load(slide_id).await?;
        ensure_content_editor(&self.mongo, ctx, slide.course_id).await?;

        let is_active = !slide.is_active;
        self.slides()
            .update_one(
                doc! { "_id": slide_id },
                doc! { "$set": {
                    "is_active": is_active,
                    "updatedAt": mongodb::bson::DateTime::now(),
                } },
            )
            .await
            .context("Failed to toggle slide activity")?;

        tracing::info!(slide_id = %slide_id, is_active, "Slide activity toggled");
        Ok(ToggleActivityResponse {
            status: if is_active {
                "Slide activated"
            } else {
                "Slide deactivated"
            },
            is_active,
        })
    }

    /// Bumps the comment counter in place; concurrent calls never lose an increment.
    pub async fn increment_comments(
        &self,
        ctx: &RequestContext,
        slide_id: ObjectId,
    ) -> ServiceResult<CommentsCountResponse> {
        ctx.require_user()?;

        let slide = self
            .slides()
            .find_one_and_update(
                doc! { "_id": slide_id },
                doc! { "$inc": { "comments_count": 1_i64 } },
            )
            .return_document(ReturnDocument::After)
            .await
            .context("Failed to increment slide comments")?
            .ok_or(ServiceError::NotFound("Slide"))?;

        Ok(CommentsCountResponse {
            comments_count: slide.comments_count,
        })
    }
}
