use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{
    Brand, BrandChanges, NewBrand, NewProduct, NewUser, Product, ProductChanges, User, UserChanges,
};
use super::{Database, DatabaseError, Page};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    brands: HashMap<Uuid, Brand>,
    products: HashMap<Uuid, Product>,
}

/// In-process store with the same constraints as the Postgres schema:
/// unique email/brand name/sku and RESTRICT on brand deletion.
#[derive(Default)]
pub struct MemoryDatabase {
    tables: RwLock<Tables>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Order and slice rows the way `ORDER BY ... OFFSET ... LIMIT` would
fn paginate<T: Serialize + Clone>(rows: impl Iterator<Item = T>, page: &Page) -> Vec<T> {
    let mut keyed: Vec<(serde_json::Value, T)> = rows
        .map(|row| (serde_json::to_value(&row).unwrap_or_default(), row))
        .collect();
    keyed.sort_by(|(a, _), (b, _)| page.order.compare(a, b));
    keyed
        .into_iter()
        .skip(page.offset as usize)
        .take(page.limit as usize)
        .map(|(_, row)| row)
        .collect()
}

fn ensure_brand(tables: &Tables, brand_id: Option<Uuid>) -> Result<(), DatabaseError> {
    match brand_id {
        Some(id) if !tables.brands.contains_key(&id) => Err(DatabaseError::InvalidReference {
            field: "brand_id",
            message: "brand not found".to_string(),
        }),
        _ => Ok(()),
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn list_users(&self, page: &Page) -> Result<Vec<User>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(paginate(tables.users.values().cloned(), page))
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(DatabaseError::Conflict("user with this email already exists".into()));
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: user.email,
            hashed_password: user.hashed_password,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, DatabaseError> {
        let mut tables = self.tables.write().await;
        if let Some(email) = &changes.email {
            if tables.users.values().any(|u| u.id != id && &u.email == email) {
                return Err(DatabaseError::Conflict("user with this email already exists".into()));
            }
        }
        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(email) = changes.email {
            user.email = email;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, DatabaseError> {
        Ok(self.tables.write().await.users.remove(&id).is_some())
    }

    async fn list_brands(&self, page: &Page) -> Result<Vec<Brand>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(paginate(tables.brands.values().cloned(), page))
    }

    async fn find_brand(&self, id: Uuid) -> Result<Option<Brand>, DatabaseError> {
        Ok(self.tables.read().await.brands.get(&id).cloned())
    }

    async fn insert_brand(&self, brand: NewBrand) -> Result<Brand, DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables.brands.values().any(|b| b.name == brand.name) {
            return Err(DatabaseError::Conflict("brand with this name already exists".into()));
        }
        let now = Utc::now();
        let brand = Brand {
            id: Uuid::new_v4(),
            name: brand.name,
            created_at: now,
            updated_at: now,
        };
        tables.brands.insert(brand.id, brand.clone());
        Ok(brand)
    }

    async fn update_brand(&self, id: Uuid, changes: BrandChanges) -> Result<Option<Brand>, DatabaseError> {
        let mut tables = self.tables.write().await;
        if let Some(name) = &changes.name {
            if tables.brands.values().any(|b| b.id != id && &b.name == name) {
                return Err(DatabaseError::Conflict("brand with this name already exists".into()));
            }
        }
        let Some(brand) = tables.brands.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            brand.name = name;
        }
        brand.updated_at = Utc::now();
        Ok(Some(brand.clone()))
    }

    async fn delete_brand(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.brands.contains_key(&id) {
            return Ok(false);
        }
        if tables.products.values().any(|p| p.brand_id == Some(id)) {
            return Err(DatabaseError::Conflict(
                "brand is still referenced by products".to_string(),
            ));
        }
        Ok(tables.brands.remove(&id).is_some())
    }

    async fn list_products(&self, page: &Page) -> Result<Vec<Product>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(paginate(tables.products.values().cloned(), page))
    }

    async fn find_product(&self, id: Uuid) -> Result<Option<Product>, DatabaseError> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables.products.values().any(|p| p.sku == product.sku) {
            return Err(DatabaseError::Conflict("product with this sku already exists".into()));
        }
        ensure_brand(&tables, product.brand_id)?;
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            sku: product.sku,
            name: product.name,
            price: product.price,
            views: 0,
            brand_id: product.brand_id,
            created_at: now,
            updated_at: now,
        };
        tables.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        id: Uuid,
        changes: ProductChanges,
    ) -> Result<Option<(Product, Product)>, DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.products.contains_key(&id) {
            return Ok(None);
        }
        if let Some(sku) = &changes.sku {
            if tables.products.values().any(|p| p.id != id && &p.sku == sku) {
                return Err(DatabaseError::Conflict("product with this sku already exists".into()));
            }
        }
        if let Some(brand_id) = changes.brand_id {
            ensure_brand(&tables, brand_id)?;
        }
        let Some(product) = tables.products.get_mut(&id) else {
            return Ok(None);
        };
        let before = product.clone();
        if let Some(sku) = changes.sku {
            product.sku = sku;
        }
        if let Some(name) = changes.name {
            product.name = name;
        }
        if let Some(price) = changes.price {
            product.price = price;
        }
        if let Some(brand_id) = changes.brand_id {
            product.brand_id = brand_id;
        }
        product.updated_at = Utc::now();
        Ok(Some((before, product.clone())))
    }

    async fn delete_product(&self, id: Uuid) -> Result<Option<Product>, DatabaseError> {
        Ok(self.tables.write().await.products.remove(&id))
    }

    async fn increment_product_views(&self, id: Uuid) -> Result<Option<i32>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let Some(product) = tables.products.get_mut(&id) else {
            return Ok(None);
        };
        product.views = product
            .views
            .checked_add(1)
            .ok_or(DatabaseError::Overflow("products.views"))?;
        Ok(Some(product.views))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::database::query::{ListQuery, PRODUCT_SORT};

    fn new_product(sku: &str, name: &str, price: f64) -> NewProduct {
        NewProduct {
            sku: sku.to_string(),
            name: name.to_string(),
            price,
            brand_id: None,
        }
    }

    fn page(order_by: &str) -> Page {
        let query = ListQuery {
            order_by: Some(order_by.to_string()),
            ..Default::default()
        };
        Page::from_query(&query, &PRODUCT_SORT, &AppConfig::development().api).unwrap()
    }

    #[tokio::test]
    async fn rejects_duplicate_sku() {
        let db = MemoryDatabase::new();
        db.insert_product(new_product("Sku1", "Product1", 1.0)).await.unwrap();

        let err = db.insert_product(new_product("Sku1", "Other", 2.0)).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));
    }

    #[tokio::test]
    async fn product_brand_must_exist() {
        let db = MemoryDatabase::new();
        let mut product = new_product("Sku1", "Product1", 1.0);
        product.brand_id = Some(Uuid::new_v4());

        let err = db.insert_product(product).await.unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidReference { field: "brand_id", .. }));
    }

    #[tokio::test]
    async fn brand_delete_is_restricted_by_products() {
        let db = MemoryDatabase::new();
        let brand = db.insert_brand(NewBrand { name: "Brand1".into() }).await.unwrap();
        let mut product = new_product("Sku1", "Product1", 1.0);
        product.brand_id = Some(brand.id);
        let product = db.insert_product(product).await.unwrap();

        assert!(matches!(
            db.delete_brand(brand.id).await,
            Err(DatabaseError::Conflict(_))
        ));

        let removed = db.delete_product(product.id).await.unwrap().unwrap();
        assert_eq!(removed.id, product.id);
        assert!(db.delete_product(product.id).await.unwrap().is_none());
        assert!(db.delete_brand(brand.id).await.unwrap());
        assert!(!db.delete_brand(brand.id).await.unwrap());
    }

    #[tokio::test]
    async fn partial_update_keeps_other_fields_and_detaches_brand() {
        let db = MemoryDatabase::new();
        let brand = db.insert_brand(NewBrand { name: "Brand1".into() }).await.unwrap();
        let mut product = new_product("Sku1", "Product1", 1.0);
        product.brand_id = Some(brand.id);
        let product = db.insert_product(product).await.unwrap();

        let (before, updated) = db
            .update_product(
                product.id,
                ProductChanges {
                    name: Some("Product2".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(before.name, "Product1");
        assert_eq!(updated.name, "Product2");
        assert_eq!(updated.sku, "Sku1");
        assert_eq!(updated.brand_id, Some(brand.id));
        assert!(updated.updated_at >= product.updated_at);

        let (_, detached) = db
            .update_product(
                product.id,
                ProductChanges {
                    brand_id: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(detached.brand_id, None);
    }

    #[tokio::test]
    async fn lists_in_requested_order_with_paging() {
        let db = MemoryDatabase::new();
        db.insert_product(new_product("Sku1", "Beta", 3.0)).await.unwrap();
        db.insert_product(new_product("Sku2", "Alpha", 1.0)).await.unwrap();
        db.insert_product(new_product("Sku3", "Gamma", 2.0)).await.unwrap();

        let names: Vec<String> = db
            .list_products(&page("name"))
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, ["Alpha", "Beta", "Gamma"]);

        let mut by_price = page("-price");
        by_price.offset = 1;
        by_price.limit = 1;
        let products = db.list_products(&by_price).await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Gamma");
    }

    #[tokio::test]
    async fn increments_views_one_at_a_time() {
        let db = MemoryDatabase::new();
        let product = db.insert_product(new_product("Sku1", "Product1", 1.0)).await.unwrap();

        assert_eq!(db.increment_product_views(product.id).await.unwrap(), Some(1));
        assert_eq!(db.increment_product_views(product.id).await.unwrap(), Some(2));
        assert_eq!(db.increment_product_views(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_reports_the_row_it_replaced() {
        let db = MemoryDatabase::new();
        let product = db.insert_product(new_product("Sku1", "Product1", 1.0)).await.unwrap();

        // A view lands between an earlier read and the update
        db.increment_product_views(product.id).await.unwrap();
        let (before, after) = db
            .update_product(
                product.id,
                ProductChanges {
                    name: Some("Product1".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(before.views, 1);
        assert_eq!(after.views, 1);
        assert!(db
            .update_product(Uuid::new_v4(), ProductChanges::default())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn view_counter_overflow_is_an_error() {
        let db = MemoryDatabase::new();
        let product = db.insert_product(new_product("Sku1", "Product1", 1.0)).await.unwrap();
        if let Some(stored) = db.tables.write().await.products.get_mut(&product.id) {
            stored.views = i32::MAX;
        }

        assert!(matches!(
            db.increment_product_views(product.id).await,
            Err(DatabaseError::Overflow("products.views"))
        ));
        let stored = db.find_product(product.id).await.unwrap().unwrap();
        assert_eq!(stored.views, i32::MAX);
    }
}
