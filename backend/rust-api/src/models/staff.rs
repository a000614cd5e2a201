use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::id_hex;
use super::user::{RegisterRequest, UserSummary};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StaffRole {
    Admin,
    Accounting,
    Support,
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Admin => "admin",
            StaffRole::Accounting => "accounting",
            StaffRole::Support => "support",
        }
    }
}

/// Staff record, one per user, stored in the "staff" collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub role_type: StaffRole,
}

#[derive(Debug, Clone, Serialize)]
pub struct StaffResponse {
    pub id: String,
    pub user: Option<UserSummary>,
    pub role_type: StaffRole,
}

impl StaffResponse {
    pub fn new(staff: Staff, user: Option<UserSummary>) -> Self {
        StaffResponse {
            id: id_hex(&staff.id),
            user,
            role_type: staff.role_type,
        }
    }
}

/// Creates the nested user together with its staff record
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateStaffRequest {
    #[validate(nested)]
    pub user: RegisterRequest,

    pub role_type: StaffRole,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateStaffRequest {
    pub role_type: Option<StaffRole>,
}
