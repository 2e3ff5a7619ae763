//! Caller identity.
//!
//! Login happens in front of this service; the authenticated address arrives
//! in the `x-user-email` header.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use database::validation::{normalize_email, validate_email};

use crate::error::ApiError;

pub const CALLER_HEADER: &str = "x-user-email";

/// Normalized email of the authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerEmail(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for CallerEmail
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(CALLER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(ApiError::Unauthenticated)?;

        validate_email(value)?;
        Ok(CallerEmail(normalize_email(value)))
    }
}
