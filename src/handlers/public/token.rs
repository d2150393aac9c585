// handlers/public/token.rs - POST /token/ handler

use axum::{
    extract::{rejection::FormRejection, State},
    Form, Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::auth::{generate_jwt, Claims};
use crate::error::ApiError;
use crate::state::AppState;

/// OAuth2 password-grant form; `username` carries the email
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

/**
 * POST /token/ - exchange credentials for a bearer token
 *
 * Input is `application/x-www-form-urlencoded` with `username` and
 * `password`. The response is the bare OAuth2 shape, not the usual
 * success envelope:
 *
 * ```json
 * { "access_token": "eyJhbGciOiJIUzI1NiI...", "token_type": "bearer" }
 * ```
 *
 * Unknown email and wrong password both answer 401.
 */
pub async fn token_post(
    State(state): State<AppState>,
    form: Result<Form<TokenRequest>, FormRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Form(form) =
        form.map_err(|e| ApiError::unprocessable_entity(e.body_text(), HashMap::new()))?;

    let user = state
        .users
        .authenticate(&form.username, &form.password)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Incorrect username or password"))?;

    let claims = Claims::new(user.email.clone(), &state.config.security);
    let access_token = generate_jwt(&claims, &state.config.security)?;

    tracing::info!("Issued token for {}", user.email);
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
    }))
}
