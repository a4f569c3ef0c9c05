use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tower_sessions::Session;
use tracing::warn;
use uuid::Uuid;

use super::jwt::JwtKeys;
use crate::error::AppError;

/// Session key under which the signed token is kept.
pub const SESSION_TOKEN_KEY: &str = "token";

/// Verified caller identity. Extracting it is the auth gate: handlers that
/// take an `AuthUser` never run for unauthenticated requests.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
}

pub async fn session_token(session: &Session) -> Option<String> {
    match session.get::<String>(SESSION_TOKEN_KEY).await {
        Ok(token) => token,
        Err(e) => {
            warn!(error = %e, "session read failed");
            None
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let header = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Token presented by the caller: the session wins over the Authorization
/// header.
pub async fn presented_token<S>(parts: &mut Parts, state: &S) -> Option<String>
where
    S: Send + Sync,
{
    if let Ok(session) = Session::from_request_parts(parts, state).await {
        if let Some(token) = session_token(&session).await {
            return Some(token);
        }
    }
    bearer_token(parts)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = presented_token(parts, state)
            .await
            .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(&token).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            AppError::Forbidden("Invalid or expired token".into())
        })?;

        Ok(AuthUser {
            user_id: claims.user_id,
            email: claims.email,
        })
    }
}

/// Token presented by the caller, if any. Never rejects.
pub struct MaybeToken(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeToken
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeToken(presented_token(parts, state).await))
    }
}
