use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::course::CourseSummary;
use super::{bson_datetime_as_chrono, id_hex};

/// Enrollment of a user in a course, unique per (user, course)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCourse {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub course_id: ObjectId,
    pub progress: i32,
    pub score: i32,
    pub rank: i32,
    #[serde(rename = "createdAt", with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt", with = "bson_datetime_as_chrono")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserCourseResponse {
    pub id: String,
    pub user: String,
    pub course: String,
    pub course_detail: Option<CourseSummary>,
    pub progress: i32,
    pub score: i32,
    pub rank: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserCourseResponse {
    pub fn new(user_course: UserCourse, course: Option<CourseSummary>) -> Self {
        UserCourseResponse {
            id: id_hex(&user_course.id),
            user: user_course.user_id.to_hex(),
            course: user_course.course_id.to_hex(),
            course_detail: course,
            progress: user_course.progress,
            score: user_course.score,
            rank: user_course.rank,
            created_at: user_course.created_at,
            updated_at: user_course.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUserCourseRequest {
    pub course: String,

    /// Staff may enroll another user; everyone else enrolls themselves
    pub user: Option<String>,

    #[validate(range(min = 0, max = 100, message = "Progress must be between 0 and 100"))]
    #[serde(default)]
    pub progress: i32,

    #[validate(range(min = 0, message = "Score must not be negative"))]
    #[serde(default)]
    pub score: i32,

    #[serde(default)]
    pub rank: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateUserCourseRequest {
    #[validate(range(min = 0, max = 100, message = "Progress must be between 0 and 100"))]
    pub progress: Option<i32>,

    #[validate(range(min = 0, message = "Score must not be negative"))]
    pub score: Option<i32>,

    pub rank: Option<i32>,
}

impl UpdateUserCourseRequest {
    pub fn apply_to(self, user_course: &mut UserCourse) {
        if let Some(progress) = self.progress {
            user_course.progress = progress;
        }
        if let Some(score) = self.score {
            user_course.score = score;
        }
        if let Some(rank) = self.rank {
            user_course.rank = rank;
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateProgressRequest {
    #[validate(range(min = 0, max = 100, message = "Progress must be between 0 and 100"))]
    #[serde(default)]
    pub progress: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(value: i32) -> UpdateProgressRequest {
        UpdateProgressRequest { progress: value }
    }

    #[test]
    fn progress_bounds() {
        assert!(progress(-1).validate().is_err());
        assert!(progress(101).validate().is_err());
        assert!(progress(0).validate().is_ok());
        assert!(progress(100).validate().is_ok());
    }

    #[test]
    fn missing_progress_defaults_to_zero() {
        let req: UpdateProgressRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.progress, 0);
    }
}
