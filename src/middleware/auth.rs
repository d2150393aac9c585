use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};

use crate::auth::validate_jwt;
use crate::database::models::User;
use crate::error::ApiError;
use crate::state::AppState;

/// The account behind a valid bearer token. Rejects with 401 otherwise.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

/// Like `CurrentUser`, but a request without an Authorization header is
/// anonymous instead of rejected. A header that is present must still be valid.
#[derive(Clone, Debug)]
pub struct MaybeUser(pub Option<User>);

impl MaybeUser {
    pub fn is_anonymous(&self) -> bool {
        self.0.is_none()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match extract_bearer(&parts.headers)? {
            Some(token) => Ok(CurrentUser(resolve_user(token, state).await?)),
            None => Err(ApiError::unauthorized("Not authenticated")),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match extract_bearer(&parts.headers)? {
            Some(token) => Ok(MaybeUser(Some(resolve_user(token, state).await?))),
            None => Ok(MaybeUser(None)),
        }
    }
}

/// Bearer token from the Authorization header; `None` when the header is absent
fn extract_bearer(headers: &HeaderMap) -> Result<Option<&str>, ApiError> {
    let Some(auth_header) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid Authorization header format"))?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(Some(token.trim())),
        Some(_) => Err(ApiError::unauthorized("Empty bearer token")),
        None => Err(ApiError::unauthorized(
            "Authorization header must use Bearer token format",
        )),
    }
}

/// Validate the token and load the user named by its subject
async fn resolve_user(token: &str, state: &AppState) -> Result<User, ApiError> {
    let claims = validate_jwt(token, &state.config.security)?;

    state
        .db
        .find_user_by_email(&claims.sub)
        .await?
        .ok_or_else(|| {
            tracing::warn!("Token subject {} no longer exists", claims.sub);
            ApiError::unauthorized("Could not validate credentials")
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn missing_header_is_anonymous() {
        assert_eq!(extract_bearer(&HeaderMap::new()).unwrap(), None);
    }

    #[test]
    fn bearer_token_is_extracted() {
        let headers = headers("Bearer abc.def.ghi");
        assert_eq!(extract_bearer(&headers).unwrap(), Some("abc.def.ghi"));
    }

    #[test]
    fn other_schemes_and_empty_tokens_are_rejected() {
        assert!(extract_bearer(&headers("Basic dXNlcjpwYXNz")).is_err());
        assert!(extract_bearer(&headers("Bearer  ")).is_err());
    }
}
