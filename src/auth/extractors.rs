use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use tracing::warn;
use uuid::Uuid;

use crate::auth::jwt::TokenKeys;
use crate::error::AccountError;

/// Extracts and validates the bearer token, returning the user ID.
#[derive(Debug)]
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    TokenKeys: FromRef<S>,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = TokenKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or((
                StatusCode::UNAUTHORIZED,
                "Missing Authorization header".to_string(),
            ))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or((
            StatusCode::UNAUTHORIZED,
            "Invalid Authorization header".to_string(),
        ))?;

        // Expired and invalid diverge only in the logs; both are 401.
        let claims = match keys.verify(token) {
            Ok(c) => c,
            Err(AccountError::TokenExpired) => {
                warn!("expired token");
                return Err((StatusCode::UNAUTHORIZED, "Token expired".to_string()));
            }
            Err(_) => {
                warn!("invalid token");
                return Err((StatusCode::UNAUTHORIZED, "Invalid token".to_string()));
            }
        };

        Ok(AuthUser(claims.sub))
    }
}
