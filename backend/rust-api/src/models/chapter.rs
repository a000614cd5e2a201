use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{bson_datetime_as_chrono, id_hex};

/// Chapter stored in the "chapters" collection, ordered within its course
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub course_id: ObjectId,
    pub title: String,
    pub description: String,
    pub order: i32,
    pub image: String,
    pub estimated_time: i32,
    pub is_active: bool,
    #[serde(rename = "createdAt", with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt", with = "bson_datetime_as_chrono")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChapterResponse {
    pub id: String,
    pub course: String,
    pub title: String,
    pub description: String,
    pub order: i32,
    pub image: String,
    pub estimated_time: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Chapter> for ChapterResponse {
    fn from(chapter: Chapter) -> Self {
        ChapterResponse {
            id: id_hex(&chapter.id),
            course: chapter.course_id.to_hex(),
            title: chapter.title,
            description: chapter.description,
            order: chapter.order,
            image: chapter.image,
            estimated_time: chapter.estimated_time,
            is_active: chapter.is_active,
            created_at: chapter.created_at,
            updated_at: chapter.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateChapterRequest {
    pub course: String,

    #[validate(length(
        min = 1,
        max = 255,
        message = "Title must be between 1 and 255 characters"
    ))]
    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Assigned as max + 1 within the course when omitted
    #[validate(range(min = 0, message = "Order must not be negative"))]
    pub order: Option<i32>,

    #[serde(default)]
    pub image: String,

    #[validate(range(min = 0, message = "Estimated time must not be negative"))]
    #[serde(default)]
    pub estimated_time: i32,

    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateChapterRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Title must be between 1 and 255 characters"
    ))]
    pub title: Option<String>,

    pub description: Option<String>,

    #[validate(range(min = 0, message = "Order must not be negative"))]
    pub order: Option<i32>,

    pub image: Option<String>,

    #[validate(range(min = 0, message = "Estimated time must not be negative"))]
    pub estimated_time: Option<i32>,

    pub is_active: Option<bool>,
}

impl UpdateChapterRequest {
    pub fn apply_to(self, chapter: &mut Chapter) {
        if let Some(title) = self.title {
            chapter.title = title;
        }
        if let Some(description) = self.description {
            chapter.description = description;
        }
        if let Some(order) = self.order {
            chapter.order = order;
        }
        if let Some(image) = self.image {
            chapter.image = image;
        }
        if let Some(estimated_time) = self.estimated_time {
            chapter.estimated_time = estimated_time;
        }
        if let Some(is_active) = self.is_active {
            chapter.is_active = is_active;
        }
    }
}

pub(crate) fn default_true() -> bool {
    true
}
