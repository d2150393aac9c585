use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use super::models::{
    Brand, BrandChanges, NewBrand, NewProduct, NewUser, Product, ProductChanges, User, UserChanges,
};
use super::{Database, DatabaseError, Page};
use crate::config::DatabaseConfig;

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        email VARCHAR(255) NOT NULL UNIQUE,
        hashed_password VARCHAR(255) NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS brands (
        id UUID PRIMARY KEY,
        name VARCHAR(255) NOT NULL UNIQUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS products (
        id UUID PRIMARY KEY,
        sku VARCHAR(255) NOT NULL UNIQUE,
        name VARCHAR(255) NOT NULL,
        price DOUBLE PRECISION NOT NULL,
        views INTEGER NOT NULL DEFAULT 0,
        brand_id UUID NULL REFERENCES brands(id) ON DELETE RESTRICT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    "CREATE INDEX IF NOT EXISTS products_brand_id_idx ON products (brand_id)",
];

const USER_COLUMNS: &str = "id, email, hashed_password, created_at, updated_at";
const BRAND_COLUMNS: &str = "id, name, created_at, updated_at";
const PRODUCT_COLUMNS: &str = "id, sku, name, price, views, brand_id, created_at, updated_at";

/// SQLSTATE for integer overflow
const NUMERIC_OUT_OF_RANGE: &str = "22003";

/// Postgres-backed store
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    pub async fn connect(url: &str, config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    /// Create tables and indexes if missing
    pub async fn bootstrap(&self) -> Result<(), DatabaseError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Database schema ready");
        Ok(())
    }
}

/// Translate constraint violations into domain errors
fn map_write_error(err: sqlx::Error, entity: &str) -> DatabaseError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return DatabaseError::Conflict(format!("{} already exists", entity));
        }
        if db_err.is_foreign_key_violation() {
            return DatabaseError::InvalidReference {
                field: "brand_id",
                message: "brand not found".to_string(),
            };
        }
    }
    DatabaseError::Sqlx(err)
}

#[async_trait]
impl Database for PgDatabase {
    async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_users(&self, page: &Page) -> Result<Vec<User>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM users {} OFFSET $1 LIMIT $2",
            USER_COLUMNS,
            page.order.to_sql()
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(page.offset)
            .bind(page.limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        let sql = format!(
            "INSERT INTO users (id, email, hashed_password) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.email)
            .bind(&user.hashed_password)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "user with this email"))
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, DatabaseError> {
        let sql = format!(
            "UPDATE users SET email = COALESCE($2, email), updated_at = now() \
             WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(changes.email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "user with this email"))
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_brands(&self, page: &Page) -> Result<Vec<Brand>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM brands {} OFFSET $1 LIMIT $2",
            BRAND_COLUMNS,
            page.order.to_sql()
        );
        let brands = sqlx::query_as::<_, Brand>(&sql)
            .bind(page.offset)
            .bind(page.limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(brands)
    }

    async fn find_brand(&self, id: Uuid) -> Result<Option<Brand>, DatabaseError> {
        let sql = format!("SELECT {} FROM brands WHERE id = $1", BRAND_COLUMNS);
        let brand = sqlx::query_as::<_, Brand>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(brand)
    }

    async fn insert_brand(&self, brand: NewBrand) -> Result<Brand, DatabaseError> {
        let sql = format!(
            "INSERT INTO brands (id, name) VALUES ($1, $2) RETURNING {}",
            BRAND_COLUMNS
        );
        sqlx::query_as::<_, Brand>(&sql)
            .bind(Uuid::new_v4())
            .bind(&brand.name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "brand with this name"))
    }

    async fn update_brand(&self, id: Uuid, changes: BrandChanges) -> Result<Option<Brand>, DatabaseError> {
        let sql = format!(
            "UPDATE brands SET name = COALESCE($2, name), updated_at = now() \
             WHERE id = $1 RETURNING {}",
            BRAND_COLUMNS
        );
        sqlx::query_as::<_, Brand>(&sql)
            .bind(id)
            .bind(changes.name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "brand with this name"))
    }

    async fn delete_brand(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM brands WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match map_write_error(e, "brand") {
                DatabaseError::InvalidReference { .. } => {
                    DatabaseError::Conflict("brand is still referenced by products".to_string())
                }
                other => other,
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_products(&self, page: &Page) -> Result<Vec<Product>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM products {} OFFSET $1 LIMIT $2",
            PRODUCT_COLUMNS,
            page.order.to_sql()
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(page.offset)
            .bind(page.limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    async fn find_product(&self, id: Uuid) -> Result<Option<Product>, DatabaseError> {
        let sql = format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS);
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, DatabaseError> {
        let sql = format!(
            "INSERT INTO products (id, sku, name, price, brand_id) VALUES ($1, $2, $3, $4, $5) \
             RETURNING {}",
            PRODUCT_COLUMNS
        );
        sqlx::query_as::<_, Product>(&sql)
            .bind(Uuid::new_v4())
            .bind(&product.sku)
            .bind(&product.name)
            .bind(product.price)
            .bind(product.brand_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "product with this sku"))
    }

    async fn update_product(
        &self,
        id: Uuid,
        changes: ProductChanges,
    ) -> Result<Option<(Product, Product)>, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        // Row lock holds off view increments until commit
        let select = format!("SELECT {} FROM products WHERE id = $1 FOR UPDATE", PRODUCT_COLUMNS);
        let Some(before) = sqlx::query_as::<_, Product>(&select)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let sql = format!(
            "UPDATE products SET \
                sku = COALESCE($2, sku), \
                name = COALESCE($3, name), \
                price = COALESCE($4, price), \
                brand_id = CASE WHEN $5 THEN $6 ELSE brand_id END, \
                updated_at = now() \
             WHERE id = $1 RETURNING {}",
            PRODUCT_COLUMNS
        );
        let brand_given = changes.brand_id.is_some();
        let after = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(changes.sku)
            .bind(changes.name)
            .bind(changes.price)
            .bind(brand_given)
            .bind(changes.brand_id.flatten())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_write_error(e, "product with this sku"))?;

        tx.commit().await?;
        Ok(Some((before, after)))
    }

    async fn delete_product(&self, id: Uuid) -> Result<Option<Product>, DatabaseError> {
        let sql = format!("DELETE FROM products WHERE id = $1 RETURNING {}", PRODUCT_COLUMNS);
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    async fn increment_product_views(&self, id: Uuid) -> Result<Option<i32>, DatabaseError> {
        sqlx::query_scalar::<_, i32>(
            "UPDATE products SET views = views + 1 WHERE id = $1 RETURNING views",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            let overflow = matches!(
                &e,
                sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(NUMERIC_OUT_OF_RANGE)
            );
            if overflow {
                DatabaseError::Overflow("products.views")
            } else {
                DatabaseError::Sqlx(e)
            }
        })
    }
}
