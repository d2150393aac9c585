use std::sync::Arc;
use uuid::Uuid;

use crate::database::{Database, DatabaseError};
use crate::tasks::TaskQueue;

/// Counts anonymous product retrievals.
///
/// The increment runs after the response is produced, so the `views` value a
/// caller sees is the one before its own retrieval. A failed increment is
/// logged and otherwise ignored.
#[derive(Clone)]
pub struct ViewCounter {
    db: Arc<dyn Database>,
    tasks: TaskQueue,
}

impl ViewCounter {
    pub fn new(db: Arc<dyn Database>, tasks: TaskQueue) -> Self {
        Self { db, tasks }
    }

    /// Add one view now. `Ok(None)` when the product is gone.
    pub async fn record(&self, product_id: Uuid) -> Result<Option<i32>, DatabaseError> {
        self.db.increment_product_views(product_id).await
    }

    /// Defer `record` to the task queue
    pub fn schedule(&self, product_id: Uuid) {
        let counter = self.clone();
        self.tasks.spawn("product-view", async move {
            match counter.record(product_id).await {
                Ok(Some(views)) => {
                    tracing::debug!("Product {} now has {} views", product_id, views)
                }
                Ok(None) => {
                    tracing::warn!("Product {} vanished before its view was counted", product_id)
                }
                Err(e) => tracing::warn!("Failed to count view of product {}: {}", product_id, e),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::NewProduct;
    use crate::database::MemoryDatabase;
    use std::time::Duration;

    async fn setup() -> (Arc<dyn Database>, ViewCounter, Uuid) {
        let db: Arc<dyn Database> = Arc::new(MemoryDatabase::new());
        let product = db
            .insert_product(NewProduct {
                sku: "Sku1".to_string(),
                name: "Product1".to_string(),
                price: 1.0,
                brand_id: None,
            })
            .await
            .unwrap();
        let tasks = TaskQueue::start(16, Duration::from_secs(1));
        (db.clone(), ViewCounter::new(db, tasks), product.id)
    }

    #[tokio::test]
    async fn scheduled_views_accumulate() {
        let (db, counter, id) = setup().await;

        counter.schedule(id);
        counter.schedule(id);
        counter.tasks.wait_idle().await;

        let product = db.find_product(id).await.unwrap().unwrap();
        assert_eq!(product.views, 2);
    }

    #[tokio::test]
    async fn counting_views_leaves_updated_at_alone() {
        let (db, counter, id) = setup().await;
        let before = db.find_product(id).await.unwrap().unwrap();

        assert_eq!(counter.record(id).await.unwrap(), Some(1));

        let after = db.find_product(id).await.unwrap().unwrap();
        assert_eq!(after.updated_at, before.updated_at);
    }

    #[tokio::test]
    async fn missing_product_is_not_an_error() {
        let (_, counter, _) = setup().await;

        assert_eq!(counter.record(Uuid::new_v4()).await.unwrap(), None);
        counter.schedule(Uuid::new_v4());
        counter.tasks.wait_idle().await;
    }
}
