use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind as JwtErrorKind, DecodingKey, EncodingKey, Header,
    Validation,
};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::context::RequestContext;
use crate::services::AppState;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtClaims {
    pub sub: String, // user_id
    pub is_staff: bool,
    pub token_type: TokenType,
    pub jti: String,
    pub exp: usize,
    pub iat: usize,
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub refresh: String,
    pub access: String,
}

#[derive(Debug)]
pub enum AuthError {
    InvalidToken,
    ExpiredToken,
    MissingToken,
    InvalidSignature,
    WrongTokenType,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::InvalidToken => write!(f, "Invalid token"),
            AuthError::ExpiredToken => write!(f, "Token expired"),
            AuthError::MissingToken => write!(f, "Missing authorization token"),
            AuthError::InvalidSignature => write!(f, "Invalid token signature"),
            AuthError::WrongTokenType => write!(f, "Token has wrong type"),
        }
    }
}

impl std::error::Error for AuthError {}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl_seconds: 3600,
            refresh_ttl_seconds: 86400,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(&state.config.jwt_secret).with_ttls(
            state.config.access_token_ttl_seconds,
            state.config.refresh_token_ttl_seconds,
        )
    }

    pub fn with_ttls(mut self, access_ttl_seconds: i64, refresh_ttl_seconds: i64) -> Self {
        self.access_ttl_seconds = access_ttl_seconds;
        self.refresh_ttl_seconds = refresh_ttl_seconds;
        self
    }

    pub fn generate_token(&self, claims: JwtClaims) -> Result<String, AuthError> {
        encode(&Header::default(), &claims, &self.encoding_key).map_err(|_| AuthError::InvalidToken)
    }

    pub fn validate_token(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let validation = Validation::default();

        decode::<JwtClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                JwtErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                JwtErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::InvalidToken,
            })
    }

    /// Validates a token and insists on its type, so refresh tokens never pass as access tokens.
    pub fn validate_typed(&self, token: &str, expected: TokenType) -> Result<JwtClaims, AuthError> {
        let claims = self.validate_token(token)?;
        if claims.token_type != expected {
            return Err(AuthError::WrongTokenType);
        }
        Ok(claims)
    }

    pub fn issue(
        &self,
        user_id: &ObjectId,
        is_staff: bool,
        token_type: TokenType,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let ttl = match token_type {
            TokenType::Access => self.access_ttl_seconds,
            TokenType::Refresh => self.refresh_ttl_seconds,
        };
        let exp = now + Duration::seconds(ttl);

        self.generate_token(JwtClaims {
            sub: user_id.to_hex(),
            is_staff,
            token_type,
            jti: Uuid::new_v4().to_string(),
            exp: exp.timestamp() as usize,
            iat: now.timestamp() as usize,
        })
    }

    pub fn issue_pair(&self, user_id: &ObjectId, is_staff: bool) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            refresh: self.issue(user_id, is_staff, TokenType::Refresh)?,
            access: self.issue(user_id, is_staff, TokenType::Access)?,
        })
    }

    /// Exchanges a refresh token for a new access token carrying the same identity.
    pub fn refresh_access(&self, refresh_token: &str) -> Result<String, AuthError> {
        let claims = self.validate_typed(refresh_token, TokenType::Refresh)?;
        let user_id = ObjectId::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
        self.issue(&user_id, claims.is_staff, TokenType::Access)
    }
}

/// Builds the request context: anonymous without a bearer token, 401 on a bad one.
pub async fn context_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let context = match headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
    {
        None => RequestContext::anonymous(),
        Some(value) => {
            let token = value.strip_prefix("Bearer ").ok_or_else(|| {
                tracing::warn!("Authorization header without Bearer scheme");
                StatusCode::UNAUTHORIZED
            })?;

            let jwt_service = JwtService::from_state(&state);
            let claims = jwt_service
                .validate_typed(token, TokenType::Access)
                .map_err(|e| {
                    tracing::warn!("JWT validation failed: {}", e);
                    StatusCode::UNAUTHORIZED
                })?;

            tracing::debug!(
                "Authenticated user: {} (staff: {})",
                claims.sub,
                claims.is_staff
            );

            let context = RequestContext::from_claims(&claims).map_err(|e| {
                tracing::warn!("JWT subject rejected: {}", e);
                StatusCode::UNAUTHORIZED
            })?;
            request.extensions_mut().insert(claims);
            context
        }
    };

    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_generation_and_validation() {
        let service = JwtService::new("test-secret");

        let claims = JwtClaims {
            sub: "user123".to_string(),
            is_staff: false,
            token_type: TokenType::Access,
            jti: "jti-1".to_string(),
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
            iat: chrono::Utc::now().timestamp() as usize,
        };

        let token = service.generate_token(claims.clone()).unwrap();
        let validated = service.validate_token(&token).unwrap();

        assert_eq!(validated.sub, claims.sub);
        assert_eq!(validated.token_type, TokenType::Access);
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let service = JwtService::new("test-secret");
        let pair = service.issue_pair(&ObjectId::new(), true).unwrap();

        assert!(service
            .validate_typed(&pair.access, TokenType::Access)
            .is_ok());
        assert!(matches!(
            service.validate_typed(&pair.refresh, TokenType::Access),
            Err(AuthError::WrongTokenType)
        ));
    }

    #[test]
    fn refresh_access_keeps_identity() {
        let service = JwtService::new("test-secret");
        let user_id = ObjectId::new();
        let pair = service.issue_pair(&user_id, true).unwrap();

        let access = service.refresh_access(&pair.refresh).unwrap();
        let claims = service.validate_typed(&access, TokenType::Access).unwrap();

        assert_eq!(claims.sub, user_id.to_hex());
        assert!(claims.is_staff);
        assert!(service.refresh_access(&pair.access).is_err());
    }

    #[test]
    fn expired_token_is_reported() {
        let service = JwtService::new("test-secret");
        let past = chrono::Utc::now().timestamp() - 7200;
        let token = service
            .generate_token(JwtClaims {
                sub: ObjectId::new().to_hex(),
                is_staff: false,
                token_type: TokenType::Access,
                jti: "old".to_string(),
                exp: past as usize,
                iat: (past - 60) as usize,
            })
            .unwrap();

        assert!(matches!(
            service.validate_token(&token),
            Err(AuthError::ExpiredToken)
        ));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let issuer = JwtService::new("secret-a");
        let verifier = JwtService::new("secret-b");
        let token = issuer
            .issue(&ObjectId::new(), false, TokenType::Access)
            .unwrap();

        assert!(matches!(
            verifier.validate_token(&token),
            Err(AuthError::InvalidSignature)
        ));
    }
}
