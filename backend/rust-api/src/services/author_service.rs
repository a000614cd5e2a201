use anyhow::Context;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::Database;

use super::error::{ServiceError, ServiceResult};
use super::query::{self, contains_ignore_case, fetch_all, fetch_page, ListParams, Paginated};
use super::{parse_object_id, parse_object_ids};
use crate::context::RequestContext;
use crate::models::author::{
    Author, AuthorCourseRequest, AuthorResponse, BecomeAuthorRequest, CreateAuthorRequest,
    UpdateAuthorRequest,
};
use crate::models::category::Category;
use crate::models::course::{Course, CourseResponse, CourseSummary};
use crate::models::user::{User, UserSummary};

/// Recounts `total_courses` for each author from the courses listing them.
pub async fn refresh_total_courses(mongo: &Database, author_ids: &[ObjectId]) -> ServiceResult<()> {
    let courses = mongo.collection::<Document>("courses");
    let authors = mongo.collection::<Author>("authors");

    for &author_id in author_ids {
        let total = courses
            .count_documents(doc! { "author_ids": author_id })
            .await
            .context("Failed to count author courses")?;
        authors
            .update_one(
                doc! { "_id": author_id },
                doc! { "$set": { "total_courses": total as i32 } },
            )
            .await
            .context("Failed to update author course count")?;
    }
    Ok(())
}

/// Every id must name an existing category.
pub async fn check_categories_exist(mongo: &Database, ids: &[ObjectId]) -> ServiceResult<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let mut unique = ids.to_vec();
    unique.sort();
    unique.dedup();
    let found = mongo
        .collection::<Category>("categories")
        .count_documents(doc! { "_id": { "$in": unique.clone() } })
        .await
        .context("Failed to check categories")?;
    if found as usize != unique.len() {
        return Err(ServiceError::non_field("One or more category IDs are invalid"));
    }
    Ok(())
}

pub struct AuthorService {
    mongo: Database,
}

impl AuthorService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    fn authors(&self) -> mongodb::Collection<Author> {
        self.mongo.collection::<Author>("authors")
    }

    async fn load(&self, author_id: ObjectId) -> ServiceResult<Author> {
        self.authors()
            .find_one(doc! { "_id": author_id })
            .await
            .context("Failed to query author")?
            .ok_or(ServiceError::NotFound("Author"))
    }

    async fn active_courses(&self, author_id: ObjectId) -> ServiceResult<Vec<Course>> {
        fetch_all(
            &self.mongo.collection::<Course>("courses"),
            doc! { "author_ids": author_id, "is_active": true },
        )
        .await
    }

    async fn respond(&self, author: Author) -> ServiceResult<AuthorResponse> {
        let user = self
            .mongo
            .collection::<User>("users")
            .find_one(doc! { "_id": author.user_id })
            .await
            .context("Failed to query author user")?
            .map(|u| UserSummary::from(&u));

        let courses = match author.id {
            Some(id) => self.active_courses(id).await?,
            None => Vec::new(),
        };
        let summaries = courses.iter().map(CourseSummary::from).collect();

        Ok(AuthorResponse::new(author, user, summaries))
    }

    pub async fn list(&self, params: &ListParams) -> ServiceResult<Paginated<AuthorResponse>> {
        let mut extra_search = Vec::new();
        if let Some(term) = params.search_term() {
            let pattern = contains_ignore_case(term);
            let users = fetch_all(
                &self.mongo.collection::<User>("users"),
                doc! { "$or": [
                    { "username": pattern.clone() },
                    { "firstname": pattern.clone() },
                    { "lastname": pattern },
                ] },
            )
            .await?;
            let user_ids: Vec<ObjectId> = users.iter().filter_map(|u| u.id).collect();
            extra_search.push(doc! { "user_id": { "$in": user_ids } });
        }

        let filter = query::AUTHORS.build_filter_with(params, Vec::new(), extra_search)?;
        let sort = query::AUTHORS.sort(params);
        let page = query::page(params)?;

        let authors = fetch_page(&self.authors(), filter, sort, page).await?;

        let mut results = Vec::with_capacity(authors.results.len());
        for author in authors.results {
            results.push(self.respond(author).await?);
        }
        Ok(Paginated::new(authors.count, page, results))
    }

    pub async fn get(&self, author_id: ObjectId) -> ServiceResult<AuthorResponse> {
        let author = self.load(author_id).await?;
        self.respond(author).await
    }

    async fn insert(
        &self,
        user_id: ObjectId,
        bio: String,
        specializations: &[String],
        already_message: &'static str,
    ) -> ServiceResult<AuthorResponse> {
        let specializations = parse_object_ids("specializations", specializations)?;
        check_categories_exist(&self.mongo, &specializations).await?;

        let existing = self
            .authors()
            .count_documents(doc! { "user_id": user_id })
            .await
            .context("Failed to check existing author")?;
        if existing > 0 {
            return Err(ServiceError::non_field(already_message));
        }

        let mut author = Author {
            id: None,
            user_id,
            bio,
            specializations,
            total_courses: 0,
        };
        let inserted = self
            .authors()
            .insert_one(&author)
            .await
            .context("Failed to insert author")?;
        author.id = inserted.inserted_id.as_object_id();

        tracing::info!(author_id = ?author.id, user_id = %user_id, "Author profile created");
        self.respond(author).await
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        req: CreateAuthorRequest,
    ) -> ServiceResult<AuthorResponse> {
        ctx.require_staff()?;

        let user_id = parse_object_id("user", &req.user)?;
        let user_exists = self
            .mongo
            .collection::<User>("users")
            .count_documents(doc! { "_id": user_id })
            .await
            .context("Failed to query user")?;
        if user_exists == 0 {
            return Err(ServiceError::validation("user", "User not found"));
        }

        self.insert(user_id, req.bio, &req.specializations, "This user is already an author")
            .await
    }

    /// Creates the caller's own author profile.
    pub async fn become_author(
        &self,
        ctx: &RequestContext,
        req: BecomeAuthorRequest,
    ) -> ServiceResult<AuthorResponse> {
        let user_id = ctx.require_user()?;
        self.insert(user_id, req.bio, &req.specializations, "You are already an author")
            .await
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        author_id: ObjectId,
        req: UpdateAuthorRequest,
    ) -> ServiceResult<AuthorResponse> {
        ctx.require_staff()?;
        let mut author = self.load(author_id).await?;

        if let Some(bio) = req.bio {
            author.bio = bio;
        }
        if let Some(specializations) = &req.specializations {
            let ids = parse_object_ids("specializations", specializations)?;
            check_categories_exist(&self.mongo, &ids).await?;
            author.specializations = ids;
        }

        self.authors()
            .replace_one(doc! { "_id": author_id }, &author)
            .await
            .context("Failed to update author")?;

        tracing::info!(author_id = %author_id, "Author updated");
        self.respond(author).await
    }

    pub async fn delete(&self, ctx: &RequestContext, author_id: ObjectId) -> ServiceResult<()> {
        ctx.require_staff()?;

        let result = self
            .authors()
            .delete_one(doc! { "_id": author_id })
            .await
            .context("Failed to delete author")?;
        if result.deleted_count == 0 {
            return Err(ServiceError::NotFound("Author"));
        }

        self.mongo
            .collection::<Document>("courses")
            .update_many(
                doc! { "author_ids": author_id },
                doc! { "$pull": { "author_ids": author_id } },
            )
            .await
            .context("Failed to detach author from courses")?;

        tracing::info!(author_id = %author_id, "Author deleted");
        Ok(())
    }

    pub async fn courses(&self, author_id: ObjectId) -> ServiceResult<Vec<CourseResponse>> {
        self.load(author_id).await?;
        let courses = self.active_courses(author_id).await?;
        Ok(courses.into_iter().map(CourseResponse::from).collect())
    }

    async fn course_for_action(&self, req: &AuthorCourseRequest) -> ServiceResult<ObjectId> {
        let raw = req
            .course_id
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ServiceError::validation("course_id", "course_id is required"))?;
        let course_id = parse_object_id("course_id", raw)?;

        let exists = self
            .mongo
            .collection::<Course>("courses")
            .count_documents(doc! { "_id": course_id })
            .await
            .context("Failed to query course")?;
        if exists == 0 {
            return Err(ServiceError::NotFound("Course"));
        }
        Ok(course_id)
    }

    pub async fn add_to_course(
        &self,
        ctx: &RequestContext,
        author_id: ObjectId,
        req: AuthorCourseRequest,
    ) -> ServiceResult<AuthorResponse> {
        ctx.require_staff()?;
        self.load(author_id).await?;
        let course_id = self.course_for_action(&req).await?;

        self.mongo
            .collection::<Document>("courses")
            .update_one(
                doc! { "_id": course_id },
                doc! { "$addToSet": { "author_ids": author_id } },
            )
            .await
            .context("Failed to add author to course")?;
        refresh_total_courses(&self.mongo, &[author_id]).await?;

        tracing::info!(author_id = %author_id, course_id = %course_id, "Author added to course");
        self.get(author_id).await
    }

    pub async fn remove_from_course(
        &self,
        ctx: &RequestContext,
        author_id: ObjectId,
        req: AuthorCourseRequest,
    ) -> ServiceResult<AuthorResponse> {
        ctx.require_staff()?;
        self.load(author_id).await?;
        let course_id = self.course_for_action(&req).await?;

        self.mongo
            .collection::<Document>("courses")
            .update_one(
                doc! { "_id": course_id },
                doc! { "$pull": { "author_ids": author_id } },
            )
            .await
            .context("Failed to remove author from course")?;
        refresh_total_courses(&self.mongo, &[author_id]).await?;

        tracing::info!(author_id = %author_id, course_id = %course_id, "Author removed from course");
        self.get(author_id).await
    }
}
