use axum::extract::{Path, Query, State};
use serde::Deserialize;
use validator::Validate;

use crate::database::models::{Brand, BrandChanges, NewBrand};
use crate::database::query::BRAND_SORT;
use crate::database::{ListQuery, Page};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser, ValidJson};
use crate::state::AppState;

use super::parse_id;

#[derive(Debug, Deserialize, Validate)]
pub struct BrandCreate {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BrandPatch {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: Option<String>,
}

/// GET /brands/
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    CurrentUser(_): CurrentUser,
) -> ApiResult<Vec<Brand>> {
    let page = Page::from_query(&query, &BRAND_SORT, &state.config.api)?;
    Ok(ApiResponse::success(state.db.list_brands(&page).await?))
}

/// POST /brands/
pub async fn post(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    ValidJson(payload): ValidJson<BrandCreate>,
) -> ApiResult<Brand> {
    let brand = state.db.insert_brand(NewBrand { name: payload.name }).await?;
    Ok(ApiResponse::created(brand))
}

/// GET /brands/:id/
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CurrentUser(_): CurrentUser,
) -> ApiResult<Brand> {
    let brand = state
        .db
        .find_brand(parse_id(&id)?)
        .await?
        .ok_or_else(|| ApiError::not_found("brand not found"))?;
    Ok(ApiResponse::success(brand))
}

/// PATCH /brands/:id/
pub async fn patch(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CurrentUser(_): CurrentUser,
    ValidJson(payload): ValidJson<BrandPatch>,
) -> ApiResult<Brand> {
    let brand = state
        .db
        .update_brand(parse_id(&id)?, BrandChanges { name: payload.name })
        .await?
        .ok_or_else(|| ApiError::not_found("brand not found"))?;
    Ok(ApiResponse::success(brand))
}

/// DELETE /brands/:id/ - 409 while products still reference the brand
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CurrentUser(_): CurrentUser,
) -> ApiResult<()> {
    if !state.db.delete_brand(parse_id(&id)?).await? {
        return Err(ApiError::not_found("brand not found"));
    }
    Ok(ApiResponse::no_content())
}
