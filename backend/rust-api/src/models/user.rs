use chrono::{DateTime, NaiveDate, Utc};
use lazy_static::lazy_static;
use mongodb::bson::oid::ObjectId;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

use super::{bson_datetime_as_chrono, bson_datetime_as_chrono_option, id_hex};
use crate::services::error::{ServiceError, ServiceResult};

lazy_static! {
    static ref PHONE_REGEX: Regex = Regex::new(r"^\+?[1-9][0-9]{7,14}$").unwrap();
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Female,
    Male,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    #[default]
    Free,
    Pro,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Free => "free",
            UserType::Pro => "pro",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserLevel {
    #[default]
    Basic,
    Advanced,
}

impl UserLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserLevel::Basic => "basic",
            UserLevel::Advanced => "advanced",
        }
    }
}

/// User model stored in MongoDB "users" collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub firstname: String,
    pub lastname: String,
    pub gender: Gender,
    pub phone_number: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(rename = "type")]
    pub user_type: UserType,
    pub level: UserLevel,
    pub is_active: bool,
    pub is_confirmed: bool,
    pub is_staff: bool,
    #[serde(default)]
    pub expire_date: Option<NaiveDate>,
    #[serde(rename = "createdAt", with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt", with = "bson_datetime_as_chrono")]
    pub updated_at: DateTime<Utc>,
    #[serde(
        rename = "lastLoginAt",
        default,
        skip_serializing_if = "Option::is_none",
        with = "bson_datetime_as_chrono_option"
    )]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
    }

    pub fn has_valid_subscription(&self, today: NaiveDate) -> bool {
        self.expire_date.map(|d| d >= today).unwrap_or(false)
    }
}

/// User profile returned to client (without sensitive data)
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub full_name: String,
    pub gender: Gender,
    pub phone_number: String,
    pub birth_date: Option<NaiveDate>,
    #[serde(rename = "type")]
    pub user_type: UserType,
    pub level: UserLevel,
    pub is_active: bool,
    pub is_confirmed: bool,
    pub is_staff: bool,
    pub expire_date: Option<NaiveDate>,
    pub has_valid_subscription: bool,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// `role` is the staff role name, `author`, or `student`, resolved by the caller.
    pub fn new(user: User, role: impl Into<String>) -> Self {
        let today = Utc::now().date_naive();
        UserProfile {
            id: id_hex(&user.id),
            full_name: user.full_name(),
            has_valid_subscription: user.has_valid_subscription(today),
            role: role.into(),
            email: user.email,
            username: user.username,
            firstname: user.firstname,
            lastname: user.lastname,
            gender: user.gender,
            phone_number: user.phone_number,
            birth_date: user.birth_date,
            user_type: user.user_type,
            level: user.level,
            is_active: user.is_active,
            is_confirmed: user.is_confirmed,
            is_staff: user.is_staff,
            expire_date: user.expire_date,
            created_at: user.created_at,
            updated_at: user.updated_at,
            last_login_at: user.last_login_at,
        }
    }
}

/// Compact user view nested in author and staff responses
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: String,
    pub email: String,
    pub username: String,
    pub full_name: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        UserSummary {
            id: id_hex(&user.id),
            email: user.email.clone(),
            username: user.username.clone(),
            full_name: user.full_name(),
        }
    }
}

/// Request to register a new user
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(
        min = 1,
        max = 150,
        message = "Username must be between 1 and 150 characters"
    ))]
    pub username: String,

    pub password: String,

    pub confirm_password: String,

    #[validate(length(
        min = 1,
        max = 150,
        message = "First name must be between 1 and 150 characters"
    ))]
    pub firstname: String,

    #[validate(length(
        min = 1,
        max = 150,
        message = "Last name must be between 1 and 150 characters"
    ))]
    pub lastname: String,

    #[validate(custom(function = "validate_phone"))]
    pub phone_number: String,

    #[serde(default)]
    pub gender: Gender,

    pub birth_date: Option<NaiveDate>,

    #[serde(default, rename = "type")]
    pub user_type: UserType,

    #[serde(default)]
    pub level: UserLevel,

    pub expire_date: Option<NaiveDate>,
}

/// Request to login
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Request to change password
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Old password is required"))]
    pub old_password: String,

    pub new_password: String,

    pub confirm_password: String,
}

/// Profile update by the owner or staff. Credentials and flags are not editable here.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(
        min = 1,
        max = 150,
        message = "First name must be between 1 and 150 characters"
    ))]
    pub firstname: Option<String>,

    #[validate(length(
        min = 1,
        max = 150,
        message = "Last name must be between 1 and 150 characters"
    ))]
    pub lastname: Option<String>,

    pub gender: Option<Gender>,

    #[validate(custom(function = "validate_phone"))]
    pub phone_number: Option<String>,

    pub birth_date: Option<NaiveDate>,

    #[serde(rename = "type")]
    pub user_type: Option<UserType>,

    pub level: Option<UserLevel>,

    pub expire_date: Option<NaiveDate>,
}

impl UpdateUserRequest {
    pub fn apply_to(self, user: &mut User) {
        if let Some(firstname) = self.firstname {
            user.firstname = firstname;
        }
        if let Some(lastname) = self.lastname {
            user.lastname = lastname;
        }
        if let Some(gender) = self.gender {
            user.gender = gender;
        }
        if let Some(phone_number) = self.phone_number {
            user.phone_number = normalize_phone(&phone_number);
        }
        if self.birth_date.is_some() {
            user.birth_date = self.birth_date;
        }
        if let Some(user_type) = self.user_type {
            user.user_type = user_type;
        }
        if let Some(level) = self.level {
            user.level = level;
        }
        if self.expire_date.is_some() {
            user.expire_date = self.expire_date;
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if PHONE_REGEX.is_match(&normalize_phone(phone)) {
        Ok(())
    } else {
        Err(ValidationError::new("phone_number")
            .with_message(Cow::from("Enter a valid phone number")))
    }
}

/// Strips spaces, dashes and parentheses.
pub fn normalize_phone(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect()
}

/// Lowercases the domain part, keeping the local part as typed.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

/// Password and confirmation must match; the password must be at least 8
/// characters and not entirely numeric.
pub fn check_new_password(password: &str, confirm: &str) -> ServiceResult<()> {
    if password != confirm {
        return Err(ServiceError::validation(
            "confirm_password",
            "Passwords do not match.",
        ));
    }
    if password.chars().count() < 8 {
        return Err(ServiceError::validation(
            "password",
            "This password is too short. It must contain at least 8 characters.",
        ));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(ServiceError::validation(
            "password",
            "This password is entirely numeric.",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_rules() {
        assert!(check_new_password("correct horse", "correct horse").is_ok());

        assert!(matches!(
            check_new_password("correct horse", "correct house"),
            Err(ServiceError::Validation { field: "confirm_password", .. })
        ));
        assert!(matches!(
            check_new_password("short", "short"),
            Err(ServiceError::Validation { field: "password", .. })
        ));
        assert!(matches!(
            check_new_password("1234567890", "1234567890"),
            Err(ServiceError::Validation { field: "password", .. })
        ));
    }

    #[test]
    fn email_and_username_normalisation() {
        assert_eq!(normalize_email(" Jane.Doe@Example.COM "), "Jane.Doe@example.com");
        assert_eq!(normalize_username(" JaneDoe "), "janedoe");
    }

    #[test]
    fn phone_validation() {
        assert!(validate_phone("+98 912 345-6789").is_ok());
        assert!(validate_phone("+4915123456789").is_ok());
        assert!(validate_phone("12ab").is_err());
        assert!(validate_phone("+0123").is_err());
    }

    #[test]
    fn subscription_depends_on_expire_date() {
        let now = Utc::now();
        let today = now.date_naive();
        let mut user = User {
            id: None,
            email: "a@b.io".to_string(),
            username: "a".to_string(),
            password_hash: String::new(),
            firstname: "Ada".to_string(),
            lastname: "Lovelace".to_string(),
            gender: Gender::Female,
            phone_number: "+441234567890".to_string(),
            birth_date: None,
            user_type: UserType::Pro,
            level: UserLevel::Advanced,
            is_active: true,
            is_confirmed: false,
            is_staff: false,
            expire_date: None,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        };

        assert_eq!(user.full_name(), "Ada Lovelace");
        assert!(!user.has_valid_subscription(today));

        user.expire_date = Some(today);
        assert!(user.has_valid_subscription(today));

        user.expire_date = today.pred_opt();
        assert!(!user.has_valid_subscription(today));
    }

    #[test]
    fn register_request_validates_fields() {
        let req: RegisterRequest = serde_json::from_value(serde_json::json!({
            "email": "not-an-email",
            "username": "",
            "password": "secret123",
            "confirm_password": "secret123",
            "firstname": "Ada",
            "lastname": "Lovelace",
            "phone_number": "+441234567890"
        }))
        .unwrap();

        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("username"));
        assert!(!fields.contains_key("phone_number"));
    }
}
