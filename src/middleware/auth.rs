//! Identity extraction.
//!
//! Session authentication is an upstream collaborator: the gateway verifies
//! the session and injects the caller's identity as the `x-user-id` header.
//! This service only checks that an identity is present and well-formed.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{request::Parts, HeaderMap};
use uuid::Uuid;

use crate::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Identity the upstream gateway authenticated for this request.
#[derive(Debug, Clone, Copy)]
pub struct AuthedUser(pub Uuid);

pub fn identity_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        identity_from_headers(&parts.headers)
            .map(AuthedUser)
            .ok_or(AppError::Unauthenticated)
    }
}
