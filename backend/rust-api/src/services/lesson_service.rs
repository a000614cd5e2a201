use anyhow::Context;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::Database;
use std::collections::HashMap;

use super::error::{ServiceError, ServiceResult};
use super::ordering::{check_reorder, next_order, parking_order};
use super::parse_object_id;
use super::permissions::{caller_author_id, can_view_course, ensure_content_editor, load_course};
use super::query::{self, fetch_all, fetch_page, ListParams, Paginated};
use crate::context::RequestContext;
use crate::models::chapter::Chapter;
use crate::models::lesson::{
    CreateLessonRequest, Lesson, LessonResponse, ReorderSlidesRequest, UpdateLessonRequest,
};
use crate::models::slide::{Slide, SlideResponse};

pub struct LessonService {
    mongo: Database,
}

impl LessonService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    fn lessons(&self) -> mongodb::Collection<Lesson> {
        self.mongo.collection::<Lesson>("lessons")
    }

    async fn load(&self, lesson_id: ObjectId) -> ServiceResult<Lesson> {
        self.lessons()
            .find_one(doc! { "_id": lesson_id })
            .await
            .context("Failed to query lesson")?
            .ok_or(ServiceError::NotFound("Lesson"))
    }

    /// Active lessons only.
    pub async fn list(&self, params: &ListParams) -> ServiceResult<Paginated<LessonResponse>> {
        let clauses = vec![doc! { "is_active": true }];
        let filter = query::LESSONS.build_filter_with(params, clauses, Vec::new())?;
        let sort = query::LESSONS.sort(params);
        let page = query::page(params)?;

        let lessons = fetch_page(&self.lessons(), filter, sort, page).await?;
        Ok(lessons.map(LessonResponse::from))
    }

    pub async fn get(&self, ctx: &RequestContext, lesson_id: ObjectId) -> ServiceResult<LessonResponse> {
        let lesson = self.load(lesson_id).await?;
        let course = load_course(&self.mongo, lesson.course_id).await?;
        let author_id = caller_author_id(&self.mongo, ctx).await?;
        if !can_view_course(ctx, &course, author_id.as_ref()) {
            return Err(ServiceError::NotFound("Lesson"));
        }
        Ok(lesson.into())
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        req: CreateLessonRequest,
    ) -> ServiceResult<LessonResponse> {
        ctx.require_user()?;
        let chapter_id = parse_object_id("chapter", &req.chapter)?;
        let chapter = self
            .mongo
            .collection::<Chapter>("chapters")
            .find_one(doc! { "_id": chapter_id })
            .await
            .context("Failed to query chapter")?
            .ok_or_else(|| ServiceError::validation("chapter", "Chapter not found"))?;
        ensure_content_editor(&self.mongo, ctx, chapter.course_id).await?;

        let order = match req.order {
            Some(order) => order,
            None => next_order(&self.mongo, "lessons", "chapter_id", chapter_id).await?,
        };

        let now = Utc::now();
        let mut lesson = Lesson {
            id: None,
            chapter_id,
            course_id: chapter.course_id,
            title: req.title,
            description: req.description,
            order,
            duration: req.duration,
            is_required: req.is_required,
            is_active: req.is_active,
            score: req.score,
            lesson_type: req.lesson_type,
            created_at: now,
            updated_at: now,
        };

        let inserted = self
            .lessons()
            .insert_one(&lesson)
            .await
            .context("Failed to insert lesson")?;
        lesson.id = inserted.inserted_id.as_object_id();

        tracing::info!(
            lesson_id = ?lesson.id,
            chapter_id = %chapter_id,
            lesson_type = lesson.lesson_type.as_str(),
            order,
            "Lesson created"
        );
        Ok(lesson.into())
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        lesson_id: ObjectId,
        req: UpdateLessonRequest,
    ) -> ServiceResult<LessonResponse> {
        ctx.require_user()?;
        let mut lesson = self.load(lesson_id).await?;
        ensure_content_editor(&self.mongo, ctx, lesson.course_id).await?;

        req.apply_to(&mut lesson);
        lesson.updated_at = Utc::now();

        self.lessons()
            .replace_one(doc! { "_id": lesson_id }, &lesson)
            .await
            .context("Failed to update lesson")?;

        tracing::info!(lesson_id = %lesson_id, "Lesson updated");
        Ok(lesson.into())
    }

    pub async fn delete(&self, ctx: &RequestContext, lesson_id: ObjectId) -> ServiceResult<()> {
        ctx.require_user()?;
        let lesson = self.load(lesson_id).await?;
        ensure_content_editor(&self.mongo, ctx, lesson.course_id).await?;

        self.mongo
            .collection::<Document>("slides")
            .delete_many(doc! { "lesson_id": lesson_id })
            .await
            .context("Failed to delete lesson slides")?;
        self.lessons()
            .delete_one(doc! { "_id": lesson_id })
            .await
            .context("Failed to delete lesson")?;

        tracing::info!(lesson_id = %lesson_id, "Lesson deleted");
        Ok(())
    }

    /// Assigns new orders to the listed slides.
    ///
    /// Slides are first parked on distinct negative orders, then moved to their
    /// targets, so swapping two orders never collides on the (lesson, order) index.
    pub async fn reorder_slides(
        &self,
        ctx: &RequestContext,
        lesson_id: ObjectId,
        req: ReorderSlidesRequest,
    ) -> ServiceResult<Vec<SlideResponse>> {
        ctx.require_user()?;
        let lesson = self.load(lesson_id).await?;
        ensure_content_editor(&self.mongo, ctx, lesson.course_id).await?;

        let slides = self.mongo.collection::<Slide>("slides");
        let existing = fetch_all(&slides, doc! { "lesson_id": lesson_id }).await?;
        let lesson_slides: HashMap<ObjectId, i32> = existing
            .iter()
            .filter_map(|s| s.id.map(|id| (id, s.order)))
            .collect();

        let mut requested = Vec::with_capacity(req.slide_orders.len());
        for item in &req.slide_orders {
            requested.push((parse_object_id("slide_orders", &item.slide_id)?, item.order));
        }
        check_reorder(&requested, &lesson_slides)?;

        for (position, (slide_id, _)) in requested.iter().enumerate() {
            slides
                .update_one(
                    doc! { "_id": *slide_id },
                    doc! { "$set": { "order": parking_order(position) } },
                )
                .await
                .context("Failed to park slide order")?;
        }
        for (slide_id, order) in &requested {
            slides
                .update_one(
                    doc! { "_id": *slide_id },
                    doc! { "$set": { "order": *order, "updatedAt": mongodb::bson::DateTime::now() } },
                )
                .await
                .context("Failed to set slide order")?;
        }

        tracing::info!(lesson_id = %lesson_id, count = requested.len(), "Slides reordered");

        let reordered: Vec<Slide> = slides
            .find(doc! { "lesson_id": lesson_id })
            .sort(doc! { "order": 1 })
            .await
            .context("Failed to query slides")?
            .try_collect()
            .await
            .context("Failed to read slides")?;
        Ok(reordered.into_iter().map(SlideResponse::from).collect())
    }
}
