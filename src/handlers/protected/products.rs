use axum::extract::{Path, Query, State};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::database::models::{NewProduct, Product, ProductChanges};
use crate::database::query::PRODUCT_SORT;
use crate::database::{ListQuery, Page};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser, MaybeUser, ValidJson};
use crate::observer::{NotifierError, Snapshot};
use crate::state::AppState;

use super::{double_option, parse_id};

#[derive(Debug, Deserialize, Validate)]
pub struct ProductCreate {
    #[validate(length(min = 1, max = 255, message = "SKU must be between 1 and 255 characters"))]
    pub sku: String,

    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,

    #[validate(range(min = 0.0, message = "Price must not be negative"))]
    pub price: f64,

    pub brand_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProductPatch {
    #[validate(length(min = 1, max = 255, message = "SKU must be between 1 and 255 characters"))]
    pub sku: Option<String>,

    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: Option<String>,

    #[validate(range(min = 0.0, message = "Price must not be negative"))]
    pub price: Option<f64>,

    /// `null` detaches the brand, an absent field leaves it alone
    #[serde(default, deserialize_with = "double_option")]
    pub brand_id: Option<Option<Uuid>>,
}

/// GET /products/ - open to anonymous callers; listing never counts views
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    _viewer: MaybeUser,
) -> ApiResult<Vec<Product>> {
    let page = Page::from_query(&query, &PRODUCT_SORT, &state.config.api)?;
    Ok(ApiResponse::success(state.db.list_products(&page).await?))
}

/// GET /products/:id/
///
/// An anonymous retrieval schedules a view after the response is built, so
/// the returned `views` is the count before this request.
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
    viewer: MaybeUser,
) -> ApiResult<Product> {
    let product = state
        .db
        .find_product(parse_id(&id)?)
        .await?
        .ok_or_else(|| ApiError::not_found("product not found"))?;

    if viewer.is_anonymous() {
        state.views.schedule(product.id);
    }
    Ok(ApiResponse::success(product))
}

/// POST /products/
pub async fn post(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    ValidJson(payload): ValidJson<ProductCreate>,
) -> ApiResult<Product> {
    let product = state
        .db
        .insert_product(NewProduct {
            sku: payload.sku,
            name: payload.name,
            price: payload.price,
            brand_id: payload.brand_id,
        })
        .await?;

    announce(&state, None, Some(&product));
    Ok(ApiResponse::created(product))
}

/// PATCH /products/:id/
pub async fn patch(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CurrentUser(_): CurrentUser,
    ValidJson(payload): ValidJson<ProductPatch>,
) -> ApiResult<Product> {
    let changes = ProductChanges {
        sku: payload.sku,
        name: payload.name,
        price: payload.price,
        brand_id: payload.brand_id,
    };
    let (before, after) = state
        .db
        .update_product(parse_id(&id)?, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("product not found"))?;

    announce(&state, Some(&before), Some(&after));
    Ok(ApiResponse::success(after))
}

/// DELETE /products/:id/
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CurrentUser(_): CurrentUser,
) -> ApiResult<()> {
    let removed = state
        .db
        .delete_product(parse_id(&id)?)
        .await?
        .ok_or_else(|| ApiError::not_found("product not found"))?;

    announce(&state, Some(&removed), None);
    Ok(ApiResponse::no_content())
}

/// Hand the mutation to the change notifier. The response never depends on it.
fn announce(state: &AppState, before: Option<&Product>, after: Option<&Product>) {
    let scheduled = || -> Result<(), NotifierError> {
        let before = before.map(Snapshot::capture).transpose()?;
        let after = after.map(Snapshot::capture).transpose()?;
        state.products.schedule(&state.tasks, before, after)
    };

    if let Err(e) = scheduled() {
        tracing::error!("Product change notification not scheduled: {}", e);
    }
}
