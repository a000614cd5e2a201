use mongodb::error::{ErrorKind, WriteFailure};
use thiserror::Error;

/// Failure modes shared by every service operation.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("Authentication credentials were not provided")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    RateLimited(String),

    #[error(transparent)]
    Internal(anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        ServiceError::Validation {
            field,
            message: message.into(),
        }
    }

    /// Validation failure that is not tied to a single field.
    pub fn non_field(message: impl Into<String>) -> Self {
        Self::validation("non_field_errors", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ServiceError::Forbidden(message.into())
    }
}

impl From<anyhow::Error> for ServiceError {
    fn from(err: anyhow::Error) -> Self {
        let duplicate = err
            .downcast_ref::<mongodb::error::Error>()
            .map(is_duplicate_key)
            .unwrap_or(false);

        if duplicate {
            ServiceError::Conflict(format!("Unique constraint violated: {}", err))
        } else {
            ServiceError::Internal(err)
        }
    }
}

impl From<mongodb::error::Error> for ServiceError {
    fn from(err: mongodb::error::Error) -> Self {
        ServiceError::from(anyhow::Error::new(err))
    }
}

/// MongoDB reports unique index violations as write error 11000.
pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == 11000,
        ErrorKind::Command(command_error) => command_error.code == 11000,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_displays_message() {
        let err = ServiceError::validation("progress", "Progress must be between 0 and 100");
        assert_eq!(err.to_string(), "Progress must be between 0 and 100");
    }

    #[test]
    fn plain_anyhow_error_is_internal() {
        let err = ServiceError::from(anyhow::anyhow!("boom"));
        assert!(matches!(err, ServiceError::Internal(_)));
    }

    #[test]
    fn not_found_names_the_entity() {
        assert_eq!(ServiceError::NotFound("Course").to_string(), "Course not found");
    }
}
