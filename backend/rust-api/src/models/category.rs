use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{bson_datetime_as_chrono, id_hex};

/// Category stored in the "categories" collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub description: String,
    #[serde(rename = "createdAt", with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryResponse {
    pub id: String,
    pub title: String,
    pub description: String,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        CategoryResponse {
            id: id_hex(&category.id),
            title: category.title,
            description: category.description,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Title must be between 1 and 255 characters"
    ))]
    pub title: String,

    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Title must be between 1 and 255 characters"
    ))]
    pub title: Option<String>,

    pub description: Option<String>,
}

impl UpdateCategoryRequest {
    pub fn apply_to(self, category: &mut Category) {
        if let Some(title) = self.title {
            category.title = title;
        }
        if let Some(description) = self.description {
            category.description = description;
        }
    }
}

/// Body of the add/remove category actions on a course.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryIdsRequest {
    #[serde(default)]
    pub category_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CourseCategoriesResponse {
    pub status: &'static str,
    pub categories: Vec<CategoryResponse>,
}
