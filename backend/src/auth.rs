use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::IntoResponse,
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::Role;
use thiserror::Error;
use tracing::warn;

use crate::error::ServiceError;

/// Token payload. Branch fields are present only for branch users; an
/// administrator is not tied to a branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
    pub exp: usize,
}

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
}

impl JwtKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

pub fn issue_token(
    keys: &JwtKeys,
    ttl_secs: i64,
    username: &str,
    role: Role,
    branch: Option<(i64, String)>,
) -> Result<String, ServiceError> {
    let expiration = chrono::Utc::now() + chrono::Duration::seconds(ttl_secs);
    let (branch_id, branch_name) = match branch {
        Some((id, name)) => (Some(id), Some(name)),
        None => (None, None),
    };
    let claims = Claims {
        sub: username.to_string(),
        role,
        branch_id,
        branch_name,
        exp: expiration.timestamp() as usize,
    };
    encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
        .map_err(|err| ServiceError::Internal(err.to_string()))
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing authorization header")]
    Missing,
    #[error("invalid authorization token")]
    Invalid,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        (axum::http::StatusCode::UNAUTHORIZED, self.to_string()).into_response()
    }
}

/// The verified caller, extracted from the bearer token on every
/// authenticated route.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub username: String,
    pub role: Role,
    pub branch_id: Option<i64>,
}

impl AuthenticatedUser {
    pub fn require_admin(&self) -> Result<(), ServiceError> {
        if self.role.is_admin() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden)
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    JwtKeys: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let Some(header_value) = parts.headers.get(axum::http::header::AUTHORIZATION) else {
            return Err(AuthError::Missing);
        };
        let header_str = header_value.to_str().map_err(|_| AuthError::Invalid)?;
        let token = header_str
            .strip_prefix("Bearer ")
            .ok_or(AuthError::Invalid)?;
        let mut validation = Validation::new(Algorithm::HS256);
        // Sessions end at exp exactly, the same cutoff the client applies.
        validation.leeway = 0;
        match decode::<Claims>(token, &keys.decoding, &validation) {
            Ok(data) => Ok(AuthenticatedUser {
                username: data.claims.sub,
                role: data.claims.role,
                branch_id: data.claims.branch_id,
            }),
            Err(err) => {
                warn!(error = ?err, "failed to decode jwt");
                Err(AuthError::Invalid)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> JwtKeys {
        JwtKeys::new("test-secret")
    }

    #[test]
    fn issued_token_round_trips_claims() {
        let token = issue_token(
            &keys(),
            3600,
            "colombo",
            Role::User,
            Some((7, "COLOMBO".to_string())),
        )
        .unwrap();

        let decoded = decode::<Claims>(
            &token,
            &keys().decoding,
            &Validation::new(Algorithm::HS256),
        )
        .unwrap();
        assert_eq!(decoded.claims.sub, "colombo");
        assert_eq!(decoded.claims.role, Role::User);
        assert_eq!(decoded.claims.branch_id, Some(7));
        assert_eq!(decoded.claims.branch_name.as_deref(), Some("COLOMBO"));
    }

    #[test]
    fn admin_token_has_no_branch_claims() {
        let token = issue_token(&keys(), 3600, "admin", Role::Admin, None).unwrap();
        let decoded = decode::<Claims>(
            &token,
            &keys().decoding,
            &Validation::new(Algorithm::HS256),
        )
        .unwrap();
        assert_eq!(decoded.claims.role, Role::Admin);
        assert!(decoded.claims.branch_id.is_none());
        assert!(decoded.claims.branch_name.is_none());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = issue_token(&keys(), -60, "admin", Role::Admin, None).unwrap();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let result = decode::<Claims>(&token, &keys().decoding, &validation);
        assert!(result.is_err());
    }

    #[test]
    fn require_admin_forks_on_role() {
        let admin = AuthenticatedUser {
            username: "admin".to_string(),
            role: Role::Admin,
            branch_id: None,
        };
        assert!(admin.require_admin().is_ok());

        let user = AuthenticatedUser {
            username: "colombo".to_string(),
            role: Role::User,
            branch_id: Some(7),
        };
        assert!(matches!(user.require_admin(), Err(ServiceError::Forbidden)));
    }
}
