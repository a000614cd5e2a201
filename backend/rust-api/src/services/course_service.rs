use anyhow::Context;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::Database;
use std::collections::HashMap;

use super::author_service::{check_categories_exist, refresh_total_courses};
use super::error::{ServiceError, ServiceResult};
use super::permissions::{caller_author_id, can_view_course, ensure_course_editor, load_course};
use super::query::{
    self, contains_ignore_case, equals_ignore_case, fetch_all, fetch_page, ListParams, Paginated,
};
use super::parse_object_ids;
use crate::context::RequestContext;
use crate::metrics;
use crate::models::author::Author;
use crate::models::category::{
    Category, CategoryIdsRequest, CategoryResponse, CourseCategoriesResponse,
};
use crate::models::chapter::{Chapter, ChapterResponse};
use crate::models::course::{
    check_requirements, slugify, Course, CourseResponse, CourseStatistics, CreateCourseRequest,
    PublishResponse, UpdateCourseRequest,
};
use crate::models::user::User;

pub struct CourseService {
    mongo: Database,
}

impl CourseService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    fn courses(&self) -> mongodb::Collection<Course> {
        self.mongo.collection::<Course>("courses")
    }

    /// Loads a course the caller may see; hidden courses read as missing.
    async fn load_visible(&self, ctx: &RequestContext, course_id: ObjectId) -> ServiceResult<Course> {
        let course = load_course(&self.mongo, course_id).await?;
        let author_id = caller_author_id(&self.mongo, ctx).await?;
        if can_view_course(ctx, &course, author_id.as_ref()) {
            Ok(course)
        } else {
            Err(ServiceError::NotFound("Course"))
        }
    }

    /// Author profiles whose user matches `user_filter`.
    async fn author_ids_for_users(&self, user_filter: Document) -> ServiceResult<Vec<ObjectId>> {
        let users = fetch_all(&self.mongo.collection::<User>("users"), user_filter).await?;
        let user_ids: Vec<ObjectId> = users.iter().filter_map(|u| u.id).collect();
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let authors = fetch_all(
            &self.mongo.collection::<Author>("authors"),
            doc! { "user_id": { "$in": user_ids } },
        )
        .await?;
        Ok(authors.iter().filter_map(|a| a.id).collect())
    }

    pub async fn list(
        &self,
        ctx: &RequestContext,
        params: &ListParams,
    ) -> ServiceResult<Paginated<CourseResponse>> {
        let mut clauses = Vec::new();

        if !ctx.is_staff {
            let visible = doc! { "is_published": true, "is_active": true };
            match caller_author_id(&self.mongo, ctx).await? {
                Some(author_id) => {
                    clauses.push(doc! { "$or": [visible, { "author_ids": author_id }] })
                }
                None => clauses.push(visible),
            }
        }

        if let Some(title) = params.get("category") {
            let categories = fetch_all(
                &self.mongo.collection::<Category>("categories"),
                doc! { "title": equals_ignore_case(title) },
            )
            .await?;
            let ids: Vec<ObjectId> = categories.iter().filter_map(|c| c.id).collect();
            clauses.push(doc! { "category_ids": { "$in": ids } });
        }

        if let Some(username) = params.get("author") {
            let ids = self
                .author_ids_for_users(doc! { "username": equals_ignore_case(username) })
                .await?;
            clauses.push(doc! { "author_ids": { "$in": ids } });
        }

        let mut extra_search = Vec::new();
        if let Some(term) = params.search_term() {
            let ids = self
                .author_ids_for_users(doc! { "username": contains_ignore_case(term) })
                .await?;
            if !ids.is_empty() {
                extra_search.push(doc! { "author_ids": { "$in": ids } });
            }
        }

        let filter = query::COURSES.build_filter_with(params, clauses, extra_search)?;
        let sort = query::COURSES.sort(params);
        let page = query::page(params)?;

        let courses = fetch_page(&self.courses(), filter, sort, page).await?;
        Ok(courses.map(CourseResponse::from))
    }

    pub async fn get(&self, ctx: &RequestContext, course_id: ObjectId) -> ServiceResult<CourseResponse> {
        Ok(self.load_visible(ctx, course_id).await?.into())
    }

    async fn check_slug_free(&self, slug: &str, except: Option<ObjectId>) -> ServiceResult<()> {
        let mut filter = doc! { "slug": slug };
        if let Some(id) = except {
            filter.insert("_id", doc! { "$ne": id });
        }
        let taken = self
            .courses()
            .count_documents(filter)
            .await
            .context("Failed to check course slug")?;
        if taken > 0 {
            return Err(ServiceError::validation(
                "slug",
                "course with this slug already exists.",
            ));
        }
        Ok(())
    }

    async fn resolve_authors(&self, values: &[String]) -> ServiceResult<Vec<ObjectId>> {
        let ids = parse_object_ids("author_ids", values)?;
        if ids.is_empty() {
            return Ok(ids);
        }
        let found = self
            .mongo
            .collection::<Author>("authors")
            .count_documents(doc! { "_id": { "$in": ids.clone() } })
            .await
            .context("Failed to check authors")?;
        if found as usize != ids.len() {
            return Err(ServiceError::validation(
                "author_ids",
                "One or more author IDs are invalid",
            ));
        }
        Ok(ids)
    }

    /// Parses the prerequisite list and rejects self and direct two-course cycles.
    async fn resolve_requirements(
        &self,
        course_id: Option<ObjectId>,
        values: &[String],
    ) -> ServiceResult<Vec<ObjectId>> {
        let ids = parse_object_ids("requirement_ids", values)?;
        if ids.is_empty() {
            return Ok(ids);
        }

        let required = fetch_all(&self.courses(), doc! { "_id": { "$in": ids.clone() } }).await?;
        if required.len() != ids.len() {
            return Err(ServiceError::validation(
                "requirement_ids",
                "One or more requirement IDs are invalid",
            ));
        }

        let requirements_of: HashMap<ObjectId, Vec<ObjectId>> = required
            .into_iter()
            .filter_map(|c| c.id.map(|id| (id, c.requirement_ids)))
            .collect();

        check_requirements(course_id.as_ref(), &ids, &requirements_of).map_err(|e| {
            tracing::warn!(course_id = ?course_id, "Rejected course requirements: {}", e);
            ServiceError::validation("requirement_ids", e.to_string())
        })?;

        Ok(ids)
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        req: CreateCourseRequest,
    ) -> ServiceResult<CourseResponse> {
        ctx.require_user()?;
        let caller_author = caller_author_id(&self.mongo, ctx).await?;
        if caller_author.is_none() && !ctx.is_staff {
            tracing::warn!(user_id = ?ctx.user_id, "Course creation denied: caller is not an author");
            return Err(ServiceError::forbidden("Only authors can create courses"));
        }

        let slug = match &req.slug {
            Some(slug) => slug.clone(),
            None => {
                let derived = slugify(&req.title);
                if derived.is_empty() {
                    format!("course-{}", &uuid::Uuid::new_v4().simple().to_string()[..8])
                } else {
                    derived
                }
            }
        };
        self.check_slug_free(&slug, None).await?;

        let category_ids = parse_object_ids("category_ids", &req.category_ids)?;
        check_categories_exist(&self.mongo, &category_ids).await?;

        let mut author_ids = self.resolve_authors(&req.author_ids).await?;
        if let Some(author_id) = caller_author {
            if !author_ids.contains(&author_id) {
                author_ids.push(author_id);
            }
        }

        let requirement_ids = self.resolve_requirements(None, &req.requirement_ids).await?;

        let now = Utc::now();
        let mut course = Course {
            id: None,
            title: req.title,
            slug,
            description: req.description,
            author_ids,
            category_ids,
            requirement_ids,
            duration: req.duration,
            level: req.level,
            price: req.price,
            start_date: req.start_date,
            end_date: req.end_date,
            is_published: req.is_published,
            is_active: req.is_active,
            logo: req.logo,
            video_url: req.video_url,
            language: req.language,
            rating: req.rating,
            created_at: now,
            updated_at: now,
        };

        let inserted = self
            .courses()
            .insert_one(&course)
            .await
            .context("Failed to insert course")?;
        course.id = inserted.inserted_id.as_object_id();

        refresh_total_courses(&self.mongo, &course.author_ids).await?;

        tracing::info!(course_id = ?course.id, slug = %course.slug, "Course created");
        Ok(course.into())
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        course_id: ObjectId,
        req: UpdateCourseRequest,
    ) -> ServiceResult<CourseResponse> {
        let mut course = load_course(&self.mongo, course_id).await?;
        ensure_course_editor(&self.mongo, ctx, &course).await?;

        let previous_authors = course.author_ids.clone();
        req.apply_to(&mut course);
        course
            .check_date_range()
            .map_err(ServiceError::non_field)?;

        if req.slug.is_some() {
            self.check_slug_free(&course.slug, Some(course_id)).await?;
        }
        if let Some(values) = &req.category_ids {
            let ids = parse_object_ids("category_ids", values)?;
            check_categories_exist(&self.mongo, &ids).await?;
            course.category_ids = ids;
        }
        if let Some(values) = &req.author_ids {
            course.author_ids = self.resolve_authors(values).await?;
        }
        if let Some(values) = &req.requirement_ids {
            course.requirement_ids = self.resolve_requirements(Some(course_id), values).await?;
        }
        course.updated_at = Utc::now();

        self.courses()
            .replace_one(doc! { "_id": course_id }, &course)
            .await
            .context("Failed to update course")?;

        if course.author_ids != previous_authors {
            let mut touched = previous_authors;
            for id in &course.author_ids {
                if !touched.contains(id) {
                    touched.push(*id);
                }
            }
            refresh_total_courses(&self.mongo, &touched).await?;
        }

        tracing::info!(course_id = %course_id, "Course updated");
        Ok(course.into())
    }

    /// Deletes the course with its chapters, lessons, slides and enrolments.
    pub async fn delete(&self, ctx: &RequestContext, course_id: ObjectId) -> ServiceResult<()> {
        let course = load_course(&self.mongo, course_id).await?;
        ensure_course_editor(&self.mongo, ctx, &course).await?;

        for collection in ["slides", "lessons", "chapters", "user_courses"] {
            self.mongo
                .collection::<Document>(collection)
                .delete_many(doc! { "course_id": course_id })
                .await
                .with_context(|| format!("Failed to delete course {}", collection))?;
        }

        self.mongo
            .collection::<Document>("courses")
            .update_many(
                doc! { "requirement_ids": course_id },
                doc! { "$pull": { "requirement_ids": course_id } },
            )
            .await
            .context("Failed to detach course from requirements")?;

        self.courses()
            .delete_one(doc! { "_id": course_id })
            .await
            .context("Failed to delete course")?;

        refresh_total_courses(&self.mongo, &course.author_ids).await?;

        tracing::info!(course_id = %course_id, "Course deleted");
        Ok(())
    }

    pub async fn set_published(
        &self,
        ctx: &RequestContext,
        course_id: ObjectId,
        published: bool,
    ) -> ServiceResult<PublishResponse> {
        let course = load_course(&self.mongo, course_id).await?;
        ensure_course_editor(&self.mongo, ctx, &course).await?;

        self.courses()
            .update_one(
                doc! { "_id": course_id },
                doc! { "$set": {
                    "is_published": published,
                    "updatedAt": mongodb::bson::DateTime::now(),
                } },
            )
            .await
            .context("Failed to change course publication")?;

        let action = if published { "publish" } else { "unpublish" };
        metrics::record_publication(action);
        tracing::info!(course_id = %course_id, action, "Course publication changed");

        Ok(PublishResponse {
            status: if published {
                "Course published"
            } else {
                "Course unpublished"
            },
            is_published: published,
        })
    }

    async fn categories_of(&self, course_id: ObjectId) -> ServiceResult<Vec<CategoryResponse>> {
        let course = load_course(&self.mongo, course_id).await?;
        let categories = fetch_all(
            &self.mongo.collection::<Category>("categories"),
            doc! { "_id": { "$in": course.category_ids } },
        )
        .await?;
        Ok(categories.into_iter().map(CategoryResponse::from).collect())
    }

    pub async fn add_categories(
        &self,
        ctx: &RequestContext,
        course_id: ObjectId,
        req: CategoryIdsRequest,
    ) -> ServiceResult<CourseCategoriesResponse> {
        let course = load_course(&self.mongo, course_id).await?;
        ensure_course_editor(&self.mongo, ctx, &course).await?;

        let ids = parse_object_ids("category_ids", &req.category_ids)?;
        if ids.is_empty() {
            return Err(ServiceError::validation(
                "category_ids",
                "category_ids must not be empty",
            ));
        }
        check_categories_exist(&self.mongo, &ids).await?;

        self.courses()
            .update_one(
                doc! { "_id": course_id },
                doc! { "$addToSet": { "category_ids": { "$each": ids } } },
            )
            .await
            .context("Failed to add course categories")?;

        tracing::info!(course_id = %course_id, "Categories added to course");
        Ok(CourseCategoriesResponse {
            status: "Categories added",
            categories: self.categories_of(course_id).await?,
        })
    }

    pub async fn remove_categories(
        &self,
        ctx: &RequestContext,
        course_id: ObjectId,
        req: CategoryIdsRequest,
    ) -> ServiceResult<CourseCategoriesResponse> {
        let course = load_course(&self.mongo, course_id).await?;
        ensure_course_editor(&self.mongo, ctx, &course).await?;

        let ids = parse_object_ids("category_ids", &req.category_ids)?;
        self.courses()
            .update_one(
                doc! { "_id": course_id },
                doc! { "$pull": { "category_ids": { "$in": ids } } },
            )
            .await
            .context("Failed to remove course categories")?;

        tracing::info!(course_id = %course_id, "Categories removed from course");
        Ok(CourseCategoriesResponse {
            status: "Categories removed",
            categories: self.categories_of(course_id).await?,
        })
    }

    pub async fn statistics(
        &self,
        ctx: &RequestContext,
        course_id: ObjectId,
    ) -> ServiceResult<CourseStatistics> {
        self.load_visible(ctx, course_id).await?;

        let total_chapters = self
            .mongo
            .collection::<Document>("chapters")
            .count_documents(doc! { "course_id": course_id })
            .await
            .context("Failed to count chapters")?;
        let total_lessons = self
            .mongo
            .collection::<Document>("lessons")
            .count_documents(doc! { "course_id": course_id })
            .await
            .context("Failed to count lessons")?;

        Ok(CourseStatistics {
            total_chapters,
            total_lessons,
        })
    }

    /// Active chapters of the course in order.
    pub async fn chapters(
        &self,
        ctx: &RequestContext,
        course_id: ObjectId,
    ) -> ServiceResult<Vec<ChapterResponse>> {
        self.load_visible(ctx, course_id).await?;

        let chapters: Vec<Chapter> = self
            .mongo
            .collection::<Chapter>("chapters")
            .find(doc! { "course_id": course_id, "is_active": true })
            .sort(doc! { "order": 1 })
            .await
            .context("Failed to query chapters")?
            .try_collect()
            .await
            .context("Failed to read chapters")?;

        Ok(chapters.into_iter().map(ChapterResponse::from).collect())
    }
}
