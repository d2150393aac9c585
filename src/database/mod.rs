pub mod memory;
pub mod models;
pub mod postgres;
pub mod query;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use models::{
    Brand, BrandChanges, NewBrand, NewProduct, NewUser, Product, ProductChanges, User, UserChanges,
};

pub use memory::MemoryDatabase;
pub use postgres::PgDatabase;
pub use query::{ListQuery, OrderBy, Page};

/// Errors from the persistence layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid reference in {field}: {message}")]
    InvalidReference { field: &'static str, message: String },

    #[error("Invalid sort column: {0}")]
    InvalidSort(String),

    #[error("Counter overflow: {0}")]
    Overflow(&'static str),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Record load/save/delete by id for every entity the API exposes.
///
/// Lookups return `Ok(None)` for missing rows; updates and deletes report
/// a missing row the same way (`None` / `false`).
#[async_trait]
pub trait Database: Send + Sync {
    async fn ping(&self) -> Result<(), DatabaseError>;

    // Users
    async fn list_users(&self, page: &Page) -> Result<Vec<User>, DatabaseError>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;
    async fn insert_user(&self, user: NewUser) -> Result<User, DatabaseError>;
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, DatabaseError>;
    async fn delete_user(&self, id: Uuid) -> Result<bool, DatabaseError>;

    // Brands
    async fn list_brands(&self, page: &Page) -> Result<Vec<Brand>, DatabaseError>;
    async fn find_brand(&self, id: Uuid) -> Result<Option<Brand>, DatabaseError>;
    async fn insert_brand(&self, brand: NewBrand) -> Result<Brand, DatabaseError>;
    async fn update_brand(&self, id: Uuid, changes: BrandChanges) -> Result<Option<Brand>, DatabaseError>;
    /// Fails with `Conflict` while products still reference the brand
    async fn delete_brand(&self, id: Uuid) -> Result<bool, DatabaseError>;

    // Products
    async fn list_products(&self, page: &Page) -> Result<Vec<Product>, DatabaseError>;
    async fn find_product(&self, id: Uuid) -> Result<Option<Product>, DatabaseError>;
    async fn insert_product(&self, product: NewProduct) -> Result<Product, DatabaseError>;
    /// Returns `(before, after)`, both read under the same row lock so a
    /// concurrent view increment lands in both or neither
    async fn update_product(
        &self,
        id: Uuid,
        changes: ProductChanges,
    ) -> Result<Option<(Product, Product)>, DatabaseError>;
    /// Returns the removed row
    async fn delete_product(&self, id: Uuid) -> Result<Option<Product>, DatabaseError>;
    /// Atomically add one view; returns the new count. Fails with `Overflow` at `i32::MAX`.
    async fn increment_product_views(&self, id: Uuid) -> Result<Option<i32>, DatabaseError>;
}

/// Postgres when a URL is configured, otherwise the in-memory store
pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn Database>, DatabaseError> {
    match &config.url {
        Some(url) => {
            tracing::info!("Connecting to Postgres at {}", redact_url(url)?);
            let db = PgDatabase::connect(url, config).await?;
            db.bootstrap().await?;
            Ok(Arc::new(db))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage (data is lost on exit)");
            Ok(Arc::new(MemoryDatabase::new()))
        }
    }
}

fn redact_url(raw: &str) -> Result<String, DatabaseError> {
    let mut url = url::Url::parse(raw).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
    if url.password().is_some() {
        url.set_password(Some("***"))
            .map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
    }
    Ok(url.into())
}
