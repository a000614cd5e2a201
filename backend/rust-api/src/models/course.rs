use chrono::{DateTime, NaiveDate, Utc};
use lazy_static::lazy_static;
use mongodb::bson::oid::ObjectId;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use thiserror::Error;
use validator::{Validate, ValidationError};

use super::{bson_datetime_as_chrono, id_hex, ids_hex};

lazy_static! {
    static ref SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CourseLevel {
    Elementary,
    Intermediate,
    UpperIntermediate,
    Advanced,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CourseLanguage {
    Fa,
    En,
}

/// Course stored in the "courses" collection.
///
/// `author_ids` reference author profiles, `requirement_ids` are prerequisite courses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub slug: String,
    pub description: String,
    #[serde(default)]
    pub author_ids: Vec<ObjectId>,
    #[serde(default)]
    pub category_ids: Vec<ObjectId>,
    #[serde(default)]
    pub requirement_ids: Vec<ObjectId>,
    pub duration: i32,
    pub level: CourseLevel,
    pub price: f64,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    pub is_published: bool,
    pub is_active: bool,
    pub logo: String,
    pub video_url: String,
    pub language: CourseLanguage,
    pub rating: f64,
    #[serde(rename = "createdAt", with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt", with = "bson_datetime_as_chrono")]
    pub updated_at: DateTime<Utc>,
}

impl Course {
    pub fn is_visible(&self) -> bool {
        self.is_published && self.is_active
    }

    pub fn check_date_range(&self) -> Result<(), String> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) if start > end => {
                Err("Start date must not be after end date".to_string())
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseResponse {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub author_ids: Vec<String>,
    pub category_ids: Vec<String>,
    pub requirement_ids: Vec<String>,
    pub duration: i32,
    pub level: CourseLevel,
    pub price: f64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_published: bool,
    pub is_active: bool,
    pub logo: String,
    pub video_url: String,
    pub language: CourseLanguage,
    pub rating: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Course> for CourseResponse {
    fn from(course: Course) -> Self {
        CourseResponse {
            id: id_hex(&course.id),
            author_ids: ids_hex(&course.author_ids),
            category_ids: ids_hex(&course.category_ids),
            requirement_ids: ids_hex(&course.requirement_ids),
            title: course.title,
            slug: course.slug,
            description: course.description,
            duration: course.duration,
            level: course.level,
            price: course.price,
            start_date: course.start_date,
            end_date: course.end_date,
            is_published: course.is_published,
            is_active: course.is_active,
            logo: course.logo,
            video_url: course.video_url,
            language: course.language,
            rating: course.rating,
            created_at: course.created_at,
            updated_at: course.updated_at,
        }
    }
}

/// Compact course view embedded in author and progress responses
#[derive(Debug, Clone, Serialize)]
pub struct CourseSummary {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub level: CourseLevel,
    pub is_active: bool,
}

impl From<&Course> for CourseSummary {
    fn from(course: &Course) -> Self {
        CourseSummary {
            id: id_hex(&course.id),
            title: course.title.clone(),
            slug: course.slug.clone(),
            level: course.level,
            is_active: course.is_active,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_create_dates"))]
pub struct CreateCourseRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Title must be between 1 and 255 characters"
    ))]
    pub title: String,

    #[validate(custom(function = "validate_slug"))]
    pub slug: Option<String>,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub category_ids: Vec<String>,

    #[serde(default)]
    pub author_ids: Vec<String>,

    #[serde(default)]
    pub requirement_ids: Vec<String>,

    #[validate(range(min = 0, message = "Duration must not be negative"))]
    pub duration: i32,

    pub level: CourseLevel,

    #[validate(range(min = 0.0, message = "Price must not be negative"))]
    pub price: f64,

    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,

    #[serde(default)]
    pub is_published: bool,

    #[serde(default)]
    pub is_active: bool,

    #[validate(url(message = "Logo must be a valid URL"))]
    pub logo: String,

    #[validate(url(message = "Video URL must be a valid URL"))]
    pub video_url: String,

    pub language: CourseLanguage,

    #[validate(range(min = 0.0, max = 5.0, message = "Rating must be between 0 and 5"))]
    #[serde(default)]
    pub rating: f64,
}

fn validate_create_dates(req: &CreateCourseRequest) -> Result<(), ValidationError> {
    match (req.start_date, req.end_date) {
        (Some(start), Some(end)) if start > end => Err(ValidationError::new("date_range")
            .with_message(Cow::from("Start date must not be after end date"))),
        _ => Ok(()),
    }
}

fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if SLUG_REGEX.is_match(slug) {
        Ok(())
    } else {
        Err(ValidationError::new("slug").with_message(Cow::from(
            "Slug may contain only lowercase letters, digits and single hyphens",
        )))
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateCourseRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Title must be between 1 and 255 characters"
    ))]
    pub title: Option<String>,

    #[validate(custom(function = "validate_slug"))]
    pub slug: Option<String>,

    pub description: Option<String>,
    pub category_ids: Option<Vec<String>>,
    pub author_ids: Option<Vec<String>>,
    pub requirement_ids: Option<Vec<String>>,

    #[validate(range(min = 0, message = "Duration must not be negative"))]
    pub duration: Option<i32>,

    pub level: Option<CourseLevel>,

    #[validate(range(min = 0.0, message = "Price must not be negative"))]
    pub price: Option<f64>,

    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_published: Option<bool>,
    pub is_active: Option<bool>,

    #[validate(url(message = "Logo must be a valid URL"))]
    pub logo: Option<String>,

    #[validate(url(message = "Video URL must be a valid URL"))]
    pub video_url: Option<String>,

    pub language: Option<CourseLanguage>,

    #[validate(range(min = 0.0, max = 5.0, message = "Rating must be between 0 and 5"))]
    pub rating: Option<f64>,
}

impl UpdateCourseRequest {
    /// Applies scalar fields. Id lists are resolved by the service.
    pub fn apply_to(&self, course: &mut Course) {
        if let Some(title) = &self.title {
            course.title = title.clone();
        }
        if let Some(slug) = &self.slug {
            course.slug = slug.clone();
        }
        if let Some(description) = &self.description {
            course.description = description.clone();
        }
        if let Some(duration) = self.duration {
            course.duration = duration;
        }
        if let Some(level) = self.level {
            course.level = level;
        }
        if let Some(price) = self.price {
            course.price = price;
        }
        if self.start_date.is_some() {
            course.start_date = self.start_date;
        }
        if self.end_date.is_some() {
            course.end_date = self.end_date;
        }
        if let Some(is_published) = self.is_published {
            course.is_published = is_published;
        }
        if let Some(is_active) = self.is_active {
            course.is_active = is_active;
        }
        if let Some(logo) = &self.logo {
            course.logo = logo.clone();
        }
        if let Some(video_url) = &self.video_url {
            course.video_url = video_url.clone();
        }
        if let Some(language) = self.language {
            course.language = language;
        }
        if let Some(rating) = self.rating {
            course.rating = rating;
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PublishResponse {
    pub status: &'static str,
    pub is_published: bool,
}

#[derive(Debug, Serialize)]
pub struct CourseStatistics {
    pub total_chapters: u64,
    pub total_lessons: u64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequirementError {
    #[error("A course cannot require itself")]
    SelfRequirement,

    #[error("Circular requirement: course {0} already requires this course")]
    Circular(String),
}

/// Checks a requested prerequisite set for `course_id`.
///
/// Rejects the course listing itself and direct two-course cycles, where a listed
/// prerequisite already requires `course_id`. Longer cycles (A→B→C→A) are not
/// detected; only the requested courses' own requirement lists are consulted.
pub fn check_requirements(
    course_id: Option<&ObjectId>,
    requested: &[ObjectId],
    requirements_of: &HashMap<ObjectId, Vec<ObjectId>>,
) -> Result<(), RequirementError> {
    let Some(course_id) = course_id else {
        // a course that does not exist yet cannot be required by anyone
        return Ok(());
    };

    if requested.contains(course_id) {
        return Err(RequirementError::SelfRequirement);
    }

    for requirement in requested {
        let loops_back = requirements_of
            .get(requirement)
            .map(|ids| ids.contains(course_id))
            .unwrap_or(false);
        if loops_back {
            return Err(RequirementError::Circular(requirement.to_hex()));
        }
    }

    Ok(())
}

/// URL slug derived from a course title: ASCII alphanumerics joined by single hyphens.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(ObjectId, Vec<ObjectId>)]) -> HashMap<ObjectId, Vec<ObjectId>> {
        edges.iter().cloned().collect()
    }

    #[test]
    fn course_cannot_require_itself() {
        let a = ObjectId::new();
        let result = check_requirements(Some(&a), &[a], &HashMap::new());
        assert_eq!(result, Err(RequirementError::SelfRequirement));
    }

    #[test]
    fn direct_two_cycle_is_rejected() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        // A already requires B; now B asks to require A
        let requirements = graph(&[(a, vec![b]), (b, vec![])]);

        let result = check_requirements(Some(&b), &[a], &requirements);
        assert_eq!(result, Err(RequirementError::Circular(a.to_hex())));
    }

    #[test]
    fn three_cycle_is_not_detected() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        let c = ObjectId::new();
        // A→B, B→C already exist; C requiring A closes a 3-cycle
        let requirements = graph(&[(a, vec![b]), (b, vec![c]), (c, vec![])]);

        assert!(check_requirements(Some(&c), &[a], &requirements).is_ok());
    }

    #[test]
    fn new_course_skips_cycle_check() {
        let a = ObjectId::new();
        assert!(check_requirements(None, &[a], &HashMap::new()).is_ok());
    }

    #[test]
    fn unrelated_requirements_pass() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        let c = ObjectId::new();
        let requirements = graph(&[(b, vec![c]), (c, vec![])]);

        assert!(check_requirements(Some(&a), &[b, c], &requirements).is_ok());
    }

    #[test]
    fn slugify_titles() {
        assert_eq!(slugify("Intro to Rust"), "intro-to-rust");
        assert_eq!(slugify("  C++ & Systems: Part 2 "), "c-systems-part-2");
        assert_eq!(slugify("آموزش"), "");
    }

    #[test]
    fn create_request_rejects_reversed_dates() {
        let req: CreateCourseRequest = serde_json::from_value(serde_json::json!({
            "title": "Rust",
            "duration": 10,
            "level": "elementary",
            "price": 0.0,
            "start_date": "2025-03-01",
            "end_date": "2025-02-01",
            "logo": "https://example.com/logo.png",
            "video_url": "https://example.com/intro.mp4",
            "language": "en"
        }))
        .unwrap();

        assert!(req.validate().is_err());
    }

    #[test]
    fn create_request_rating_bounds() {
        let mut body = serde_json::json!({
            "title": "Rust",
            "duration": 10,
            "level": "upper_intermediate",
            "price": 100.0,
            "logo": "https://example.com/logo.png",
            "video_url": "https://example.com/intro.mp4",
            "language": "fa",
            "rating": 5.0
        });
        let req: CreateCourseRequest = serde_json::from_value(body.clone()).unwrap();
        assert!(req.validate().is_ok());

        body["rating"] = serde_json::json!(5.5);
        let req: CreateCourseRequest = serde_json::from_value(body).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn invalid_slug_is_rejected() {
        assert!(validate_slug("good-slug-1").is_ok());
        assert!(validate_slug("Bad Slug").is_err());
        assert!(validate_slug("double--dash").is_err());
    }
}
