/// Request authentication extractors
use crate::{context::AppContext, db::models::User, error::ApiError};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Authenticated account, required
///
/// Rejects the request when the bearer token is missing or invalid.
pub struct CurrentUser(pub User);

/// Authenticated account, optional
///
/// Resolves to `None` when no Authorization header is present; an invalid
/// token still rejects the request rather than downgrading to anonymous.
pub struct OptionalUser(pub Option<User>);

/// Pull the bearer token out of an Authorization header value
pub fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<AppContext> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::InvalidToken("Missing authorization header".to_string()))?;

        let token = extract_bearer_token(header)
            .ok_or_else(|| ApiError::InvalidToken("Malformed authorization header".to_string()))?;

        let user = ctx.accounts.validate_access_token(token).await?;
        Ok(CurrentUser(user))
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for OptionalUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let Some(header) = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
        else {
            return Ok(OptionalUser(None));
        };

        let token = extract_bearer_token(header)
            .ok_or_else(|| ApiError::InvalidToken("Malformed authorization header".to_string()))?;

        let user = ctx.accounts.validate_access_token(token).await?;
        Ok(OptionalUser(Some(user)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_extraction() {
        assert_eq!(extract_bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer_token("bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer_token("Basic abc123"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token(""), None);
    }
}
