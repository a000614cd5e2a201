use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::course::CourseSummary;
use super::id_hex;
use super::user::UserSummary;

/// Author profile, one per user, stored in the "authors" collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub bio: String,
    /// Category ids the author specialises in
    #[serde(default)]
    pub specializations: Vec<ObjectId>,
    pub total_courses: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthorResponse {
    pub id: String,
    pub user: Option<UserSummary>,
    pub bio: String,
    pub specializations: Vec<String>,
    pub total_courses: i32,
    pub active_courses: Vec<CourseSummary>,
}

impl AuthorResponse {
    pub fn new(author: Author, user: Option<UserSummary>, active_courses: Vec<CourseSummary>) -> Self {
        AuthorResponse {
            id: id_hex(&author.id),
            user,
            specializations: author.specializations.iter().map(|id| id.to_hex()).collect(),
            bio: author.bio,
            total_courses: author.total_courses,
            active_courses,
        }
    }
}

/// Staff creates an author profile for an existing user
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAuthorRequest {
    pub user: String,

    #[validate(length(max = 5000, message = "Bio must be at most 5000 characters"))]
    #[serde(default)]
    pub bio: String,

    #[serde(default)]
    pub specializations: Vec<String>,
}

/// Caller creates their own author profile
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct BecomeAuthorRequest {
    #[validate(length(max = 5000, message = "Bio must be at most 5000 characters"))]
    #[serde(default)]
    pub bio: String,

    #[serde(default)]
    pub specializations: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateAuthorRequest {
    #[validate(length(max = 5000, message = "Bio must be at most 5000 characters"))]
    pub bio: Option<String>,

    pub specializations: Option<Vec<String>>,
}

/// Body of add-to-course / remove-from-course
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorCourseRequest {
    pub course_id: Option<String>,
}
