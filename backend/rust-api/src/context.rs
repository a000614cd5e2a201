use mongodb::bson::oid::ObjectId;

use crate::middlewares::auth::{AuthError, JwtClaims};
use crate::services::error::{ServiceError, ServiceResult};

/// Who is calling. Built once per request by the context middleware and handed to
/// every service operation explicitly.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub user_id: Option<ObjectId>,
    pub is_staff: bool,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(user_id: ObjectId, is_staff: bool) -> Self {
        Self {
            user_id: Some(user_id),
            is_staff,
        }
    }

    pub fn from_claims(claims: &JwtClaims) -> Result<Self, AuthError> {
        let user_id = ObjectId::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
        Ok(Self::user(user_id, claims.is_staff))
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    pub fn require_user(&self) -> ServiceResult<ObjectId> {
        self.user_id.ok_or(ServiceError::Unauthorized)
    }

    pub fn require_staff(&self) -> ServiceResult<()> {
        self.require_user()?;
        if self.is_staff {
            Ok(())
        } else {
            tracing::warn!("Access denied: staff role required");
            Err(ServiceError::forbidden(
                "You do not have permission to perform this action",
            ))
        }
    }

    pub fn is_owner_or_staff(&self, owner: &ObjectId) -> bool {
        self.is_staff || self.user_id.as_ref() == Some(owner)
    }

    pub fn ensure_owner_or_staff(&self, owner: &ObjectId) -> ServiceResult<()> {
        self.require_user()?;
        if self.is_owner_or_staff(owner) {
            Ok(())
        } else {
            tracing::warn!("Access denied: caller does not own the record");
            Err(ServiceError::forbidden(
                "You do not have permission to perform this action",
            ))
        }
    }

    /// Restricts a listing to the caller's own records unless they are staff.
    pub fn owner_scope(&self) -> ServiceResult<Option<ObjectId>> {
        let user_id = self.require_user()?;
        Ok(if self.is_staff { None } else { Some(user_id) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_context_is_unauthorized() {
        let ctx = RequestContext::anonymous();
        assert!(matches!(ctx.require_user(), Err(ServiceError::Unauthorized)));
        assert!(matches!(ctx.require_staff(), Err(ServiceError::Unauthorized)));
    }

    #[test]
    fn regular_user_is_forbidden_from_staff_actions() {
        let ctx = RequestContext::user(ObjectId::new(), false);
        assert!(matches!(ctx.require_staff(), Err(ServiceError::Forbidden(_))));
    }

    #[test]
    fn owner_or_staff_rules() {
        let owner = ObjectId::new();
        let stranger = RequestContext::user(ObjectId::new(), false);
        let staff = RequestContext::user(ObjectId::new(), true);
        let me = RequestContext::user(owner, false);

        assert!(me.ensure_owner_or_staff(&owner).is_ok());
        assert!(staff.ensure_owner_or_staff(&owner).is_ok());
        assert!(stranger.ensure_owner_or_staff(&owner).is_err());
    }

    #[test]
    fn owner_scope_is_open_for_staff() {
        let user_id = ObjectId::new();
        assert_eq!(
            RequestContext::user(user_id, false).owner_scope().unwrap(),
            Some(user_id)
        );
        assert_eq!(RequestContext::user(user_id, true).owner_scope().unwrap(), None);
    }
}
