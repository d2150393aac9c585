use axum::extract::{Path, Query, State};
use serde::Deserialize;
use validator::Validate;

use crate::database::models::{User, UserChanges};
use crate::database::query::USER_SORT;
use crate::database::{ListQuery, Page};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser, ValidJson};
use crate::state::AppState;

use super::parse_id;

#[derive(Debug, Deserialize, Validate)]
pub struct UserPatch {
    #[validate(email(message = "Invalid email format"), length(max = 255))]
    pub email: Option<String>,
}

/// GET /users/
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    CurrentUser(_): CurrentUser,
) -> ApiResult<Vec<User>> {
    let page = Page::from_query(&query, &USER_SORT, &state.config.api)?;
    Ok(ApiResponse::success(state.db.list_users(&page).await?))
}

/// GET /users/:id/
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CurrentUser(_): CurrentUser,
) -> ApiResult<User> {
    let user = state
        .db
        .find_user(parse_id(&id)?)
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;
    Ok(ApiResponse::success(user))
}

/// PATCH /users/:id/ - email only
pub async fn patch(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CurrentUser(_): CurrentUser,
    ValidJson(payload): ValidJson<UserPatch>,
) -> ApiResult<User> {
    let changes = UserChanges {
        email: payload.email.map(|e| e.trim().to_lowercase()),
    };
    let user = state
        .db
        .update_user(parse_id(&id)?, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;
    Ok(ApiResponse::success(user))
}

/// DELETE /users/:id/
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CurrentUser(current): CurrentUser,
) -> ApiResult<()> {
    let id = parse_id(&id)?;
    if !state.db.delete_user(id).await? {
        return Err(ApiError::not_found("user not found"));
    }

    tracing::info!("User {} deleted by {}", id, current.email);
    Ok(ApiResponse::no_content())
}
