use anyhow::Context;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::Database;

use super::error::{ServiceError, ServiceResult};
use super::ordering::next_order;
use super::parse_object_id;
use super::permissions::{caller_author_id, can_view_course, ensure_content_editor, load_course};
use super::query::{self, fetch_page, ListParams, Paginated};
use crate::context::RequestContext;
use crate::models::chapter::{Chapter, ChapterResponse, CreateChapterRequest, UpdateChapterRequest};
use crate::models::lesson::{Lesson, LessonResponse};

pub struct ChapterService {
    mongo: Database,
}

impl ChapterService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    fn chapters(&self) -> mongodb::Collection<Chapter> {
        self.mongo.collection::<Chapter>("chapters")
    }

    async fn load(&self, chapter_id: ObjectId) -> ServiceResult<Chapter> {
        self.chapters()
            .find_one(doc! { "_id": chapter_id })
            .await
            .context("Failed to query chapter")?
            .ok_or(ServiceError::NotFound("Chapter"))
    }

    async fn ensure_visible(&self, ctx: &RequestContext, course_id: ObjectId) -> ServiceResult<()> {
        let course = load_course(&self.mongo, course_id).await?;
        let author_id = caller_author_id(&self.mongo, ctx).await?;
        if can_view_course(ctx, &course, author_id.as_ref()) {
            Ok(())
        } else {
            Err(ServiceError::NotFound("Chapter"))
        }
    }

    /// Active chapters only.
    pub async fn list(&self, params: &ListParams) -> ServiceResult<Paginated<ChapterResponse>> {
        let clauses = vec![doc! { "is_active": true }];
        let filter = query::CHAPTERS.build_filter_with(params, clauses, Vec::new())?;
        let sort = query::CHAPTERS.sort(params);
        let page = query::page(params)?;

        let chapters = fetch_page(&self.chapters(), filter, sort, page).await?;
        Ok(chapters.map(ChapterResponse::from))
    }

    pub async fn get(&self, ctx: &RequestContext, chapter_id: ObjectId) -> ServiceResult<ChapterResponse> {
        let chapter = self.load(chapter_id).await?;
        self.ensure_visible(ctx, chapter.course_id).await?;
        Ok(chapter.into())
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        req: CreateChapterRequest,
    ) -> ServiceResult<ChapterResponse> {
        ctx.require_user()?;
        let course_id = parse_object_id("course", &req.course)?;
        ensure_content_editor(&self.mongo, ctx, course_id).await?;

        let order = match req.order {
            Some(order) => order,
            None => next_order(&self.mongo, "chapters", "course_id", course_id).await?,
        };

        let now = Utc::now();
        let mut chapter = Chapter {
            id: None,
            course_id,
            title: req.title,
            description: req.description,
            order,
            image: req.image,
            estimated_time: req.estimated_time,
            is_active: req.is_active,
            created_at: now,
            updated_at: now,
        };

        let inserted = self
            .chapters()
            .insert_one(&chapter)
            .await
            .context("Failed to insert chapter")?;
        chapter.id = inserted.inserted_id.as_object_id();

        tracing::info!(chapter_id = ?chapter.id, course_id = %course_id, order, "Chapter created");
        Ok(chapter.into())
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        chapter_id: ObjectId,
        req: UpdateChapterRequest,
    ) -> ServiceResult<ChapterResponse> {
        ctx.require_user()?;
        let mut chapter = self.load(chapter_id).await?;
        ensure_content_editor(&self.mongo, ctx, chapter.course_id).await?;

        req.apply_to(&mut chapter);
        chapter.updated_at = Utc::now();

        self.chapters()
            .replace_one(doc! { "_id": chapter_id }, &chapter)
            .await
            .context("Failed to update chapter")?;

        tracing::info!(chapter_id = %chapter_id, "Chapter updated");
        Ok(chapter.into())
    }

    /// Deletes the chapter with its lessons and their slides.
    pub async fn delete(&self, ctx: &RequestContext, chapter_id: ObjectId) -> ServiceResult<()> {
        ctx.require_user()?;
        let chapter = self.load(chapter_id).await?;
        ensure_content_editor(&self.mongo, ctx, chapter.course_id).await?;

        for collection in ["slides", "lessons"] {
            self.mongo
                .collection::<Document>(collection)
                .delete_many(doc! { "chapter_id": chapter_id })
                .await
                .with_context(|| format!("Failed to delete chapter {}", collection))?;
        }

        self.chapters()
            .delete_one(doc! { "_id": chapter_id })
            .await
            .context("Failed to delete chapter")?;

        tracing::info!(chapter_id = %chapter_id, "Chapter deleted");
        Ok(())
    }

    /// Active lessons of the chapter in order.
    pub async fn lessons(
        &self,
        ctx: &RequestContext,
        chapter_id: ObjectId,
    ) -> ServiceResult<Vec<LessonResponse>> {
        let chapter = self.load(chapter_id).await?;
        self.ensure_visible(ctx, chapter.course_id).await?;

        let lessons: Vec<Lesson> = self
            .mongo
            .collection::<Lesson>("lessons")
            .find(doc! { "chapter_id": chapter_id, "is_active": true })
            .sort(doc! { "order": 1 })
            .await
            .context("Failed to query lessons")?
            .try_collect()
            .await
            .context("Failed to read lessons")?;

        Ok(lessons.into_iter().map(LessonResponse::from).collect())
    }
}
