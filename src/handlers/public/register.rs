use axum::extract::State;
use serde::Deserialize;
use validator::Validate;

use crate::database::models::User;
use crate::middleware::{ApiResponse, ApiResult, ValidJson};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"), length(max = 255))]
    pub email: String,

    #[validate(length(min = 1, max = 255, message = "Password must be between 1 and 255 characters"))]
    pub password: String,
}

/// POST /users/ - open registration; duplicate email is 409
pub async fn register_post(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<RegisterRequest>,
) -> ApiResult<User> {
    let user = state
        .users
        .register(&payload.email, &payload.password)
        .await?;
    Ok(ApiResponse::created(user))
}
