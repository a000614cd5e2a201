use anyhow::Context;
use chrono::Utc;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::Database;

use super::error::{ServiceError, ServiceResult};
use super::parse_object_id;
use super::query::{self, fetch_page, ListParams, Paginated};
use crate::context::RequestContext;
use crate::models::course::{Course, CourseSummary};
use crate::models::user_course::{
    CreateUserCourseRequest, UpdateProgressRequest, UpdateUserCourseRequest, UserCourse,
    UserCourseResponse,
};

pub struct UserCourseService {
    mongo: Database,
}

impl UserCourseService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    fn user_courses(&self) -> mongodb::Collection<UserCourse> {
        self.mongo.collection::<UserCourse>("user_courses")
    }

    async fn load(&self, ctx: &RequestContext, id: ObjectId) -> ServiceResult<UserCourse> {
        ctx.require_user()?;
        let user_course = self
            .user_courses()
            .find_one(doc! { "_id": id })
            .await
            .context("Failed to query user course")?
            .ok_or(ServiceError::NotFound("User course"))?;

        // other users' enrolments read as missing
        if !ctx.is_owner_or_staff(&user_course.user_id) {
            return Err(ServiceError::NotFound("User course"));
        }
        Ok(user_course)
    }

    async fn respond(&self, user_course: UserCourse) -> ServiceResult<UserCourseResponse> {
        let course = self
            .mongo
            .collection::<Course>("courses")
            .find_one(doc! { "_id": user_course.course_id })
            .await
            .context("Failed to query course")?
            .map(|c| CourseSummary::from(&c));
        Ok(UserCourseResponse::new(user_course, course))
    }

    pub async fn list(
        &self,
        ctx: &RequestContext,
        params: &ListParams,
    ) -> ServiceResult<Paginated<UserCourseResponse>> {
        let mut clauses = Vec::new();
        if let Some(user_id) = ctx.owner_scope()? {
            clauses.push(doc! { "user_id": user_id });
        }

        let filter = query::USER_COURSES.build_filter_with(params, clauses, Vec::new())?;
        let sort = query::USER_COURSES.sort(params);
        let page = query::page(params)?;

        let user_courses = fetch_page(&self.user_courses(), filter, sort, page).await?;

        let mut results = Vec::with_capacity(user_courses.results.len());
        for user_course in user_courses.results {
            results.push(self.respond(user_course).await?);
        }
        Ok(Paginated::new(user_courses.count, page, results))
    }

    pub async fn get(&self, ctx: &RequestContext, id: ObjectId) -> ServiceResult<UserCourseResponse> {
        let user_course = self.load(ctx, id).await?;
        self.respond(user_course).await
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        req: CreateUserCourseRequest,
    ) -> ServiceResult<UserCourseResponse> {
        let caller = ctx.require_user()?;
        let user_id = match &req.user {
            Some(user) if ctx.is_staff => parse_object_id("user", user)?,
            _ => caller,
        };
        let course_id = parse_object_id("course", &req.course)?;

        let course_exists = self
            .mongo
            .collection::<Course>("courses")
            .count_documents(doc! { "_id": course_id })
            .await
            .context("Failed to query course")?;
        if course_exists == 0 {
            return Err(ServiceError::validation("course", "Course not found"));
        }

        let enrolled = self
            .user_courses()
            .count_documents(doc! { "user_id": user_id, "course_id": course_id })
            .await
            .context("Failed to check enrolment")?;
        if enrolled > 0 {
            return Err(ServiceError::non_field(
                "The fields user, course must make a unique set.",
            ));
        }

        let now = Utc::now();
        let mut user_course = UserCourse {
            id: None,
            user_id,
            course_id,
            progress: req.progress,
            score: req.score,
            rank: req.rank,
            created_at: now,
            updated_at: now,
        };
        let inserted = self
            .user_courses()
            .insert_one(&user_course)
            .await
            .context("Failed to insert user course")?;
        user_course.id = inserted.inserted_id.as_object_id();

        tracing::info!(user_id = %user_id, course_id = %course_id, "User enrolled in course");
        self.respond(user_course).await
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: ObjectId,
        req: UpdateUserCourseRequest,
    ) -> ServiceResult<UserCourseResponse> {
        let mut user_course = self.load(ctx, id).await?;
        req.apply_to(&mut user_course);
        user_course.updated_at = Utc::now();

        self.user_courses()
            .replace_one(doc! { "_id": id }, &user_course)
            .await
            .context("Failed to update user course")?;

        tracing::info!(user_course_id = %id, "User course updated");
        self.respond(user_course).await
    }

    pub async fn delete(&self, ctx: &RequestContext, id: ObjectId) -> ServiceResult<()> {
        self.load(ctx, id).await?;

        self.user_courses()
            .delete_one(doc! { "_id": id })
            .await
            .context("Failed to delete user course")?;

        tracing::info!(user_course_id = %id, "User course deleted");
        Ok(())
    }

    pub async fn update_progress(
        &self,
        ctx: &RequestContext,
        id: ObjectId,
        req: UpdateProgressRequest,
    ) -> ServiceResult<UserCourseResponse> {
        let mut user_course = self.load(ctx, id).await?;
        user_course.progress = req.progress;
        user_course.updated_at = Utc::now();

        self.user_courses()
            .update_one(
                doc! { "_id": id },
                doc! { "$set": {
                    "progress": req.progress,
                    "updatedAt": mongodb::bson::DateTime::now(),
                } },
            )
            .await
            .context("Failed to update progress")?;

        tracing::info!(user_course_id = %id, progress = req.progress, "Course progress updated");
        self.respond(user_course).await
    }
}
