use crate::config::Config;
use mongodb::bson::oid::ObjectId;
use mongodb::{Client as MongoClient, Database};

use self::error::{ServiceError, ServiceResult};

pub struct AppState {
    pub config: Config,
    pub mongo: Database,
    /// Connections are opened on demand, so the API starts without Redis and
    /// only login lockout and health checks depend on it.
    pub redis: redis::Client,
}

impl AppState {
    pub fn new(config: Config, mongo_client: MongoClient, redis_client: redis::Client) -> Self {
        let mongo = mongo_client.database(&config.mongo_database);
        Self {
            config,
            mongo,
            redis: redis_client,
        }
    }
}

/// Parses a path or body id, reporting a malformed one against `field`.
pub fn parse_object_id(field: &'static str, value: &str) -> ServiceResult<ObjectId> {
    ObjectId::parse_str(value.trim())
        .map_err(|_| ServiceError::validation(field, format!("\"{}\" is not a valid id", value)))
}

pub fn parse_object_ids(field: &'static str, values: &[String]) -> ServiceResult<Vec<ObjectId>> {
    let mut ids = Vec::with_capacity(values.len());
    for value in values {
        let id = parse_object_id(field, value)?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// Path ids that do not parse cannot name an existing record.
pub fn parse_path_id(entity: &'static str, value: &str) -> ServiceResult<ObjectId> {
    ObjectId::parse_str(value).map_err(|_| ServiceError::NotFound(entity))
}

pub mod auth_service;
pub mod author_service;
pub mod category_service;
pub mod chapter_service;
pub mod choice_service;
pub mod course_service;
pub mod editor_service;
pub mod error;
pub mod indexes;
pub mod lesson_service;
pub mod lockout;
pub mod ordering;
pub mod permissions;
pub mod query;
pub mod question_service;
pub mod slide_service;
pub mod staff_service;
pub mod streak_service;
pub mod superuser_seed;
pub mod user_course_service;
pub mod user_response_service;
pub mod user_service;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_id_lists_are_deduplicated() {
        let id = ObjectId::new().to_hex();
        let ids = parse_object_ids("category_ids", &[id.clone(), id]).unwrap();
        assert_eq!(ids.len(), 1);
    }

    #[test]
    fn malformed_ids_name_the_field() {
        assert!(matches!(
            parse_object_id("course", "nope"),
            Err(ServiceError::Validation { field: "course", .. })
        ));
        assert!(matches!(
            parse_path_id("Course", "nope"),
            Err(ServiceError::NotFound("Course"))
        ));
    }
}
