use anyhow::Context;
use bcrypt::{hash, verify, DEFAULT_COST};
use mongodb::bson::doc;
use mongodb::Database;

use super::error::{ServiceError, ServiceResult};
use super::lockout::{LoginLockout, LOCKOUT_WINDOW_SECONDS};
use super::query::equals_ignore_case;
use super::AppState;
use crate::metrics;
use crate::middlewares::auth::{AuthError, JwtService, TokenPair, TokenType};
use crate::models::user::{normalize_email, LoginRequest, User};

const BAD_CREDENTIALS: &str = "Incorrect Credentials";

/// Hash a password using bcrypt
pub fn hash_password(password: &str) -> ServiceResult<String> {
    Ok(hash(password, DEFAULT_COST).context("Failed to hash password")?)
}

/// Verify a password against a hash
pub fn verify_password(password: &str, password_hash: &str) -> ServiceResult<bool> {
    Ok(verify(password, password_hash).context("Failed to verify password")?)
}

pub struct AuthService {
    mongo: Database,
    lockout: LoginLockout,
    jwt_service: JwtService,
}

impl AuthService {
    pub fn new(state: &AppState) -> Self {
        Self {
            mongo: state.mongo.clone(),
            lockout: LoginLockout::new(state.redis.clone()),
            jwt_service: JwtService::from_state(state),
        }
    }

    /// Exchanges email and password for a token pair.
    ///
    /// Unknown email, wrong password and inactive account are indistinguishable
    /// to the caller and all count toward the lockout.
    pub async fn login(&self, req: LoginRequest) -> ServiceResult<TokenPair> {
        let email = normalize_email(&req.email);

        if self.lockout.is_locked(&email).await {
            metrics::record_login("locked");
            tracing::warn!(email = %email, "Login rejected: account temporarily locked");
            return Err(ServiceError::RateLimited(format!(
                "Too many failed login attempts. Try again in {} minutes.",
                LOCKOUT_WINDOW_SECONDS / 60
            )));
        }

        let users = self.mongo.collection::<User>("users");
        let user = users
            .find_one(doc! { "email": equals_ignore_case(&email) })
            .await
            .context("Failed to query user")?;

        let user = match user {
            Some(user)
                if user.is_active
                    && verify_password(&req.password, &user.password_hash).unwrap_or(false) =>
            {
                user
            }
            _ => {
                self.lockout.record_failure(&email).await;
                metrics::record_login("failure");
                tracing::warn!(email = %email, "Failed login attempt");
                return Err(ServiceError::non_field(BAD_CREDENTIALS));
            }
        };

        let user_id = user
            .id
            .ok_or_else(|| anyhow::anyhow!("User ID not found"))?;

        users
            .update_one(
                doc! { "_id": user_id },
                doc! { "$set": { "lastLoginAt": mongodb::bson::DateTime::now() } },
            )
            .await
            .context("Failed to update last login timestamp")?;

        self.lockout.clear(&email).await;

        let pair = self
            .jwt_service
            .issue_pair(&user_id, user.is_staff)
            .map_err(|e| anyhow::anyhow!("Failed to generate token: {}", e))?;

        metrics::record_login("success");
        tracing::info!(user_id = %user_id.to_hex(), "Successful login");

        Ok(pair)
    }

    pub fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        self.jwt_service.refresh_access(refresh_token)
    }

    /// Accepts any valid token of either type.
    pub fn verify(&self, token: &str) -> Result<(), AuthError> {
        self.jwt_service
            .validate_typed(token, TokenType::Access)
            .or_else(|_| self.jwt_service.validate_typed(token, TokenType::Refresh))
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_roundtrip() {
        let hashed = hash("correct horse", 4).unwrap();
        assert!(verify_password("correct horse", &hashed).unwrap());
        assert!(!verify_password("wrong horse", &hashed).unwrap());
    }
}
