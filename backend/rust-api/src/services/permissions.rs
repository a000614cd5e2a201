use anyhow::Context;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::Database;

use super::error::{ServiceError, ServiceResult};
use crate::context::RequestContext;
use crate::models::author::Author;
use crate::models::course::Course;

const DENIED: &str = "You do not have permission to perform this action";

/// Author profile id of the caller, if they have one.
pub async fn caller_author_id(mongo: &Database, ctx: &RequestContext) -> ServiceResult<Option<ObjectId>> {
    let Some(user_id) = ctx.user_id else {
        return Ok(None);
    };

    let author = mongo
        .collection::<Author>("authors")
        .find_one(doc! { "user_id": user_id })
        .await
        .context("Failed to query author profile")?;

    Ok(author.and_then(|a| a.id))
}

pub fn can_edit_course(ctx: &RequestContext, course: &Course, author_id: Option<&ObjectId>) -> bool {
    if !ctx.is_authenticated() {
        return false;
    }
    ctx.is_staff || author_id.is_some_and(|id| course.author_ids.contains(id))
}

/// Drafts and inactive courses are visible to staff and the course's authors only.
pub fn can_view_course(ctx: &RequestContext, course: &Course, author_id: Option<&ObjectId>) -> bool {
    course.is_visible() || can_edit_course(ctx, course, author_id)
}

pub async fn ensure_course_editor(
    mongo: &Database,
    ctx: &RequestContext,
    course: &Course,
) -> ServiceResult<()> {
    ctx.require_user()?;
    if ctx.is_staff {
        return Ok(());
    }

    let author_id = caller_author_id(mongo, ctx).await?;
    if can_edit_course(ctx, course, author_id.as_ref()) {
        Ok(())
    } else {
        tracing::warn!(
            course_id = ?course.id,
            user_id = ?ctx.user_id,
            "Access denied: caller is not an author of the course"
        );
        Err(ServiceError::forbidden(DENIED))
    }
}

pub async fn load_course(mongo: &Database, course_id: ObjectId) -> ServiceResult<Course> {
    mongo
        .collection::<Course>("courses")
        .find_one(doc! { "_id": course_id })
        .await
        .context("Failed to query course")?
        .ok_or(ServiceError::NotFound("Course"))
}

/// Loads the course owning some content and checks the caller may edit it.
pub async fn ensure_content_editor(
    mongo: &Database,
    ctx: &RequestContext,
    course_id: ObjectId,
) -> ServiceResult<Course> {
    ctx.require_user()?;
    let course = load_course(mongo, course_id).await?;
    ensure_course_editor(mongo, ctx, &course).await?;
    Ok(course)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::course::{CourseLanguage, CourseLevel};
    use chrono::Utc;

    fn course(author_ids: Vec<ObjectId>, is_published: bool, is_active: bool) -> Course {
        let now = Utc::now();
        Course {
            id: Some(ObjectId::new()),
            title: "Rust".to_string(),
            slug: "rust".to_string(),
            description: String::new(),
            author_ids,
            category_ids: vec![],
            requirement_ids: vec![],
            duration: 10,
            level: CourseLevel::Elementary,
            price: 0.0,
            start_date: None,
            end_date: None,
            is_published,
            is_active,
            logo: "https://example.com/logo.png".to_string(),
            video_url: "https://example.com/v.mp4".to_string(),
            language: CourseLanguage::En,
            rating: 0.0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn authors_and_staff_edit_courses() {
        let author = ObjectId::new();
        let c = course(vec![author], true, true);
        let user = RequestContext::user(ObjectId::new(), false);
        let staff = RequestContext::user(ObjectId::new(), true);

        assert!(can_edit_course(&user, &c, Some(&author)));
        assert!(!can_edit_course(&user, &c, Some(&ObjectId::new())));
        assert!(!can_edit_course(&user, &c, None));
        assert!(can_edit_course(&staff, &c, None));
        assert!(!can_edit_course(&RequestContext::anonymous(), &c, Some(&author)));
    }

    #[test]
    fn drafts_are_hidden_from_the_public() {
        let author = ObjectId::new();
        let draft = course(vec![author], false, true);
        let anonymous = RequestContext::anonymous();
        let owner = RequestContext::user(ObjectId::new(), false);

        assert!(!can_view_course(&anonymous, &draft, None));
        assert!(can_view_course(&owner, &draft, Some(&author)));
        assert!(can_view_course(&anonymous, &course(vec![], true, true), None));
        assert!(!can_view_course(&anonymous, &course(vec![], true, false), None));
    }
}
