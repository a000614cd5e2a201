use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::chapter::default_true;
use super::{bson_datetime_as_chrono, id_hex};
use crate::services::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SlideType {
    #[default]
    Text,
    Quiz,
    Video,
    Interactive,
}

impl SlideType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlideType::Text => "text",
            SlideType::Quiz => "quiz",
            SlideType::Video => "video",
            SlideType::Interactive => "interactive",
        }
    }
}

/// Slide stored in the "slides" collection. Chapter and course ids are
/// denormalised from the parent lesson.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slide {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub lesson_id: ObjectId,
    pub chapter_id: ObjectId,
    pub course_id: ObjectId,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub total_marks: Option<i32>,
    pub slide_type: SlideType,
    #[serde(default)]
    pub time_limit: Option<i32>,
    pub is_active: bool,
    pub is_required: bool,
    pub hints: String,
    pub alt_text: String,
    pub image: String,
    pub video_url: String,
    pub comments_count: i64,
    #[serde(default)]
    pub question_id: Option<ObjectId>,
    #[serde(default)]
    pub editor_id: Option<ObjectId>,
    pub order: i32,
    #[serde(rename = "createdAt", with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt", with = "bson_datetime_as_chrono")]
    pub updated_at: DateTime<Utc>,
}

impl Slide {
    /// Type-dependent requirements checked on create and after every update.
    pub fn check_type_requirements(&self) -> ServiceResult<()> {
        match self.slide_type {
            SlideType::Quiz => {
                if self.question_id.is_none() {
                    return Err(ServiceError::validation(
                        "question",
                        "Quiz slides must have a question",
                    ));
                }
                if self.total_marks.is_none() {
                    return Err(ServiceError::validation(
                        "total_marks",
                        "Quiz slides must have total marks",
                    ));
                }
            }
            SlideType::Video => {
                if self.video_url.trim().is_empty() {
                    return Err(ServiceError::validation(
                        "video_url",
                        "Video slides must have a video URL",
                    ));
                }
            }
            SlideType::Text | SlideType::Interactive => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SlideResponse {
    pub id: String,
    pub lesson: String,
    pub chapter: String,
    pub course: String,
    pub title: String,
    pub content: String,
    pub total_marks: Option<i32>,
    pub slide_type: SlideType,
    pub time_limit: Option<i32>,
    pub is_active: bool,
    pub is_required: bool,
    pub hints: String,
    pub alt_text: String,
    pub image: String,
    pub video_url: String,
    pub comments_count: i64,
    pub question: Option<String>,
    pub editor: Option<String>,
    pub order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Slide> for SlideResponse {
    fn from(slide: Slide) -> Self {
        SlideResponse {
            id: id_hex(&slide.id),
            lesson: slide.lesson_id.to_hex(),
            chapter: slide.chapter_id.to_hex(),
            course: slide.course_id.to_hex(),
            title: slide.title,
            content: slide.content,
            total_marks: slide.total_marks,
            slide_type: slide.slide_type,
            time_limit: slide.time_limit,
            is_active: slide.is_active,
            is_required: slide.is_required,
            hints: slide.hints,
            alt_text: slide.alt_text,
            image: slide.image,
            video_url: slide.video_url,
            comments_count: slide.comments_count,
            question: slide.question_id.map(|id| id.to_hex()),
            editor: slide.editor_id.map(|id| id.to_hex()),
            order: slide.order,
            created_at: slide.created_at,
            updated_at: slide.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSlideRequest {
    pub lesson: String,

    #[validate(length(
        min = 1,
        max = 255,
        message = "Title must be between 1 and 255 characters"
    ))]
    pub title: String,

    #[serde(default)]
    pub content: String,

    #[validate(range(min = 0, message = "Total marks must not be negative"))]
    pub total_marks: Option<i32>,

    #[serde(default)]
    pub slide_type: SlideType,

    #[validate(range(min = 0, message = "Time limit must not be negative"))]
    pub time_limit: Option<i32>,

    #[serde(default = "default_true")]
    pub is_active: bool,

    #[serde(default = "default_true")]
    pub is_required: bool,

    #[serde(default)]
    pub hints: String,

    #[serde(default)]
    pub alt_text: String,

    #[serde(default)]
    pub image: String,

    #[serde(default)]
    pub video_url: String,

    pub question: Option<String>,
    pub editor: Option<String>,

    #[validate(range(min = 0, message = "Order must not be negative"))]
    pub order: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateSlideRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Title must be between 1 and 255 characters"
    ))]
    pub title: Option<String>,

    pub content: Option<String>,

    #[validate(range(min = 0, message = "Total marks must not be negative"))]
    pub total_marks: Option<i32>,

    pub slide_type: Option<SlideType>,

    #[validate(range(min = 0, message = "Time limit must not be negative"))]
    pub time_limit: Option<i32>,

    pub is_active: Option<bool>,
    pub is_required: Option<bool>,
    pub hints: Option<String>,
    pub alt_text: Option<String>,
    pub image: Option<String>,
    pub video_url: Option<String>,
    pub question: Option<String>,
    pub editor: Option<String>,

    #[validate(range(min = 0, message = "Order must not be negative"))]
    pub order: Option<i32>,
}

impl UpdateSlideRequest {
    /// Applies plain fields; `question` and `editor` references are resolved by the service.
    pub fn apply_to(&self, slide: &mut Slide) {
        if let Some(title) = &self.title {
            slide.title = title.clone();
        }
        if let Some(content) = &self.content {
            slide.content = content.clone();
        }
        if self.total_marks.is_some() {
            slide.total_marks = self.total_marks;
        }
        if let Some(slide_type) = self.slide_type {
            slide.slide_type = slide_type;
        }
        if self.time_limit.is_some() {
            slide.time_limit = self.time_limit;
        }
        if let Some(is_active) = self.is_active {
            slide.is_active = is_active;
        }
        if let Some(is_required) = self.is_required {
            slide.is_required = is_required;
        }
        if let Some(hints) = &self.hints {
            slide.hints = hints.clone();
        }
        if let Some(alt_text) = &self.alt_text {
            slide.alt_text = alt_text.clone();
        }
        if let Some(image) = &self.image {
            slide.image = image.clone();
        }
        if let Some(video_url) = &self.video_url {
            slide.video_url = video_url.clone();
        }
        if let Some(order) = self.order {
            slide.order = order;
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ToggleActivityResponse {
    pub status: &'static str,
    pub is_active: bool,
}

#[derive(Debug, Serialize)]
pub struct CommentsCountResponse {
    pub comments_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slide(slide_type: SlideType) -> Slide {
        let now = Utc::now();
        Slide {
            id: None,
            lesson_id: ObjectId::new(),
            chapter_id: ObjectId::new(),
            course_id: ObjectId::new(),
            title: "Borrowing".to_string(),
            content: String::new(),
            total_marks: None,
            slide_type,
            time_limit: None,
            is_active: true,
            is_required: true,
            hints: String::new(),
            alt_text: String::new(),
            image: String::new(),
            video_url: String::new(),
            comments_count: 0,
            question_id: None,
            editor_id: None,
            order: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn quiz_slide_needs_question_and_marks() {
        let mut s = slide(SlideType::Quiz);
        assert!(matches!(
            s.check_type_requirements(),
            Err(ServiceError::Validation { field: "question", .. })
        ));

        s.question_id = Some(ObjectId::new());
        assert!(matches!(
            s.check_type_requirements(),
            Err(ServiceError::Validation { field: "total_marks", .. })
        ));

        s.total_marks = Some(10);
        assert!(s.check_type_requirements().is_ok());
    }

    #[test]
    fn video_slide_needs_url() {
        let mut s = slide(SlideType::Video);
        assert!(s.check_type_requirements().is_err());

        s.video_url = "https://cdn.example.com/v.mp4".to_string();
        assert!(s.check_type_requirements().is_ok());
    }

    #[test]
    fn text_and_interactive_have_no_extra_requirements() {
        assert!(slide(SlideType::Text).check_type_requirements().is_ok());
        assert!(slide(SlideType::Interactive).check_type_requirements().is_ok());
    }
}
