//! User identity extraction
//!
//! Identity is issued upstream; this service only consumes an opaque user
//! identifier and contact string from request headers and never validates
//! them.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// Opaque identity of the requesting user
#[derive(Debug, Clone)]
pub struct UserIdentity {
    pub user_id: String,
    pub email: String,
}

fn identity_from_parts(parts: &Parts) -> Option<UserIdentity> {
    let user_id = parts
        .headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())?;

    let email = parts
        .headers
        .get(USER_EMAIL_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    Some(UserIdentity {
        user_id: user_id.to_string(),
        email: email.to_string(),
    })
}

#[async_trait]
impl<S> FromRequestParts<S> for UserIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        identity_from_parts(parts).ok_or(AppError::IdentityRequired)
    }
}

/// Identity for routes that also serve anonymous callers
#[derive(Debug, Clone)]
pub struct MaybeIdentity(pub Option<UserIdentity>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeIdentity
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeIdentity(identity_from_parts(parts)))
    }
}
