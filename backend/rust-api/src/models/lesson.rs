use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::chapter::default_true;
use super::{bson_datetime_as_chrono, id_hex};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LessonType {
    #[default]
    Lesson,
    Quiz,
}

impl LessonType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LessonType::Lesson => "lesson",
            LessonType::Quiz => "quiz",
        }
    }
}

/// Lesson stored in the "lessons" collection.
///
/// `course_id` is copied from the parent chapter on create so lessons can be
/// filtered by course without a join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub chapter_id: ObjectId,
    pub course_id: ObjectId,
    pub title: String,
    pub description: String,
    pub order: i32,
    pub duration: i32,
    pub is_required: bool,
    pub is_active: bool,
    pub score: i32,
    pub lesson_type: LessonType,
    #[serde(rename = "createdAt", with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt", with = "bson_datetime_as_chrono")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LessonResponse {
    pub id: String,
    pub chapter: String,
    pub course: String,
    pub title: String,
    pub description: String,
    pub order: i32,
    pub duration: i32,
    pub is_required: bool,
    pub is_active: bool,
    pub score: i32,
    pub lesson_type: LessonType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Lesson> for LessonResponse {
    fn from(lesson: Lesson) -> Self {
        LessonResponse {
            id: id_hex(&lesson.id),
            chapter: lesson.chapter_id.to_hex(),
            course: lesson.course_id.to_hex(),
            title: lesson.title,
            description: lesson.description,
            order: lesson.order,
            duration: lesson.duration,
            is_required: lesson.is_required,
            is_active: lesson.is_active,
            score: lesson.score,
            lesson_type: lesson.lesson_type,
            created_at: lesson.created_at,
            updated_at: lesson.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateLessonRequest {
    pub chapter: String,

    #[validate(length(
        min = 1,
        max = 255,
        message = "Title must be between 1 and 255 characters"
    ))]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[validate(range(min = 0, message = "Order must not be negative"))]
    pub order: Option<i32>,

    #[validate(range(min = 0, message = "Duration must not be negative"))]
    #[serde(default)]
    pub duration: i32,

    #[serde(default = "default_true")]
    pub is_required: bool,

    #[serde(default = "default_true")]
    pub is_active: bool,

    #[validate(range(min = 0, message = "Score must not be negative"))]
    #[serde(default)]
    pub score: i32,

    #[serde(default)]
    pub lesson_type: LessonType,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateLessonRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Title must be between 1 and 255 characters"
    ))]
    pub title: Option<String>,

    pub description: Option<String>,

    #[validate(range(min = 0, message = "Order must not be negative"))]
    pub order: Option<i32>,

    #[validate(range(min = 0, message = "Duration must not be negative"))]
    pub duration: Option<i32>,

    pub is_required: Option<bool>,
    pub is_active: Option<bool>,

    #[validate(range(min = 0, message = "Score must not be negative"))]
    pub score: Option<i32>,

    pub lesson_type: Option<LessonType>,
}

impl UpdateLessonRequest {
    pub fn apply_to(self, lesson: &mut Lesson) {
        if let Some(title) = self.title {
            lesson.title = title;
        }
        if let Some(description) = self.description {
            lesson.description = description;
        }
        if let Some(order) = self.order {
            lesson.order = order;
        }
        if let Some(duration) = self.duration {
            lesson.duration = duration;
        }
        if let Some(is_required) = self.is_required {
            lesson.is_required = is_required;
        }
        if let Some(is_active) = self.is_active {
            lesson.is_active = is_active;
        }
        if let Some(score) = self.score {
            lesson.score = score;
        }
        if let Some(lesson_type) = self.lesson_type {
            lesson.lesson_type = lesson_type;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideOrder {
    pub slide_id: String,
    pub order: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReorderSlidesRequest {
    #[validate(length(min = 1, message = "slide_orders must not be empty"))]
    #[serde(default)]
    pub slide_orders: Vec<SlideOrder>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_reorder_is_rejected() {
        let req: ReorderSlidesRequest = serde_json::from_str("{}").unwrap();
        assert!(req.validate().is_err());

        let req: ReorderSlidesRequest = serde_json::from_value(serde_json::json!({
            "slide_orders": [{"slide_id": "abc", "order": 1}]
        }))
        .unwrap();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn lesson_type_defaults_to_lesson() {
        let req: CreateLessonRequest = serde_json::from_value(serde_json::json!({
            "chapter": "64b000000000000000000001",
            "title": "Ownership"
        }))
        .unwrap();
        assert_eq!(req.lesson_type, LessonType::Lesson);
        assert!(req.is_active);
        assert!(req.order.is_none());
    }
}
