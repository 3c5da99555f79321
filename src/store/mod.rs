//! Repository layer - persistence for the products, categories and orders collections.
//!
//! Two interchangeable backends implement the same contract:
//! - [`JsonStore`]: one JSON array file per collection, rewritten wholesale on every mutation.
//! - [`SqliteStore`]: a keyed `SeaORM` store with per-record reads and updates.
//!
//! Both enforce the same rules: product ids start at 1 and grow monotonically, category ids are
//! unique, categories still referenced by a product cannot be deleted, and every update to a
//! product or order is checked against the `version` it was read at (a mismatch is a
//! [`Error::Conflict`](crate::errors::Error::Conflict) and leaves the record untouched).

pub mod json;
pub mod sqlite;

pub use json::JsonStore;
pub use sqlite::SqliteStore;

use crate::{
    config::{StorageBackend, StorageConfig},
    errors::Result,
    models::{Category, Order, Product},
};
use tracing::info;

/// Fields of a product before it has been assigned an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub promo_price: Option<f64>,
    pub stock: u32,
    pub category: String,
    pub image: String,
}

impl NewProduct {
    #[must_use]
    pub fn into_product(self, id: i64) -> Product {
        Product {
            id,
            name: self.name,
            description: self.description,
            price: self.price,
            promo_price: self.promo_price,
            stock: self.stock,
            category: self.category,
            image: self.image,
            version: 0,
        }
    }
}

/// The configured repository backend.
pub enum Store {
    Json(JsonStore),
    Sqlite(SqliteStore),
}

impl Store {
    /// Opens the backend selected in `[storage]`, creating files or tables as needed.
    pub async fn open(config: &StorageConfig) -> Result<Self> {
        match config.backend {
            StorageBackend::Json => {
                info!("Using JSON file store in {:?}", config.data_dir);
                Ok(Self::Json(JsonStore::open(&config.data_dir).await?))
            }
            StorageBackend::Sqlite => {
                info!("Using SQLite store");
                Ok(Self::Sqlite(SqliteStore::open(&config.database_url).await?))
            }
        }
    }

    /// Returns every product, in id order.
    pub async fn list_products(&self) -> Result<Vec<Product>> {
        match self {
            Self::Json(store) => store.list_products().await,
            Self::Sqlite(store) => store.list_products().await,
        }
    }

    pub async fn get_product(&self, id: i64) -> Result<Option<Product>> {
        match self {
            Self::Json(store) => store.get_product(id).await,
            Self::Sqlite(store) => store.get_product(id).await,
        }
    }

    /// Assigns the next product id and persists the new record.
    pub async fn insert_product(&self, new_product: NewProduct) -> Result<Product> {
        match self {
            Self::Json(store) => store.insert_product(new_product).await,
            Self::Sqlite(store) => store.insert_product(new_product).await,
        }
    }

    /// Replaces the stored product with `product`, which must carry the version it was read at.
    /// The returned record has its version bumped.
    pub async fn update_product(&self, product: Product) -> Result<Product> {
        match self {
            Self::Json(store) => store.update_product(product).await,
            Self::Sqlite(store) => store.update_product(product).await,
        }
    }

    /// Removes a product and returns the removed record.
    pub async fn remove_product(&self, id: i64) -> Result<Product> {
        match self {
            Self::Json(store) => store.remove_product(id).await,
            Self::Sqlite(store) => store.remove_product(id).await,
        }
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        match self {
            Self::Json(store) => store.list_categories().await,
            Self::Sqlite(store) => store.list_categories().await,
        }
    }

    pub async fn get_category(&self, id: &str) -> Result<Option<Category>> {
        match self {
            Self::Json(store) => store.get_category(id).await,
            Self::Sqlite(store) => store.get_category(id).await,
        }
    }

    /// Persists a new category; fails with a validation error if the id is already taken.
    pub async fn insert_category(&self, category: Category) -> Result<Category> {
        match self {
            Self::Json(store) => store.insert_category(category).await,
            Self::Sqlite(store) => store.insert_category(category).await,
        }
    }

    /// Removes a category unless a product still references it.
    pub async fn remove_category(&self, id: &str) -> Result<Category> {
        match self {
            Self::Json(store) => store.remove_category(id).await,
            Self::Sqlite(store) => store.remove_category(id).await,
        }
    }

    /// Returns every order, oldest first.
    pub async fn list_orders(&self) -> Result<Vec<Order>> {
        match self {
            Self::Json(store) => store.list_orders().await,
            Self::Sqlite(store) => store.list_orders().await,
        }
    }

    pub async fn get_order(&self, id: &str) -> Result<Option<Order>> {
        match self {
            Self::Json(store) => store.get_order(id).await,
            Self::Sqlite(store) => store.get_order(id).await,
        }
    }

    pub async fn insert_order(&self, order: Order) -> Result<Order> {
        match self {
            Self::Json(store) => store.insert_order(order).await,
            Self::Sqlite(store) => store.insert_order(order).await,
        }
    }

    /// Replaces the stored order with `order`, which must carry the version it was read at.
    pub async fn update_order(&self, order: Order) -> Result<Order> {
        match self {
            Self::Json(store) => store.update_order(order).await,
            Self::Sqlite(store) => store.update_order(order).await,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::{errors::Error, models::OrderStatus, test_utils::*};

    /// Runs the same scenario against both backends.
    async fn with_each_backend<F, Fut>(scenario: F) -> Result<()>
    where
        F: Fn(Store) -> Fut,
        Fut: std::future::Future<Output = Result<()>>,
    {
        let (_dir, json) = setup_json_store().await?;
        scenario(json).await?;
        let sqlite = setup_sqlite_store().await?;
        scenario(sqlite).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_product_ids_start_at_one_and_increase() -> Result<()> {
        with_each_backend(|store| async move {
            create_test_category(&store, "Panes").await?;
            let first = store.insert_product(new_test_product("Baguette", "panes")).await?;
            let second = store.insert_product(new_test_product("Pan de campo", "panes")).await?;
            assert_eq!(first.id, 1);
            assert_eq!(second.id, 2);
            assert_eq!(store.list_products().await?, vec![first, second]);
            Ok(())
        })
        .await
    }

    #[tokio::test]
    async fn test_update_product_bumps_version_and_detects_conflicts() -> Result<()> {
        with_each_backend(|store| async move {
            create_test_category(&store, "Panes").await?;
            let product = store.insert_product(new_test_product("Baguette", "panes")).await?;

            let mut edited = product.clone();
            edited.price = 1500.0;
            let updated = store.update_product(edited).await?;
            assert_eq!(updated.version, product.version + 1);
            assert_eq!(updated.price, 1500.0);

            // Writing again from the stale copy must fail and change nothing
            let mut stale = product.clone();
            stale.price = 9.0;
            let result = store.update_product(stale).await;
            assert!(matches!(result, Err(Error::Conflict { .. })));
            assert_eq!(store.get_product(product.id).await?.unwrap(), updated);
            Ok(())
        })
        .await
    }

    #[tokio::test]
    async fn test_update_missing_product_is_not_found() -> Result<()> {
        with_each_backend(|store| async move {
            let ghost = new_test_product("Ghost", "panes").into_product(42);
            let result = store.update_product(ghost).await;
            assert!(matches!(result, Err(Error::NotFound { .. })));
            Ok(())
        })
        .await
    }

    #[tokio::test]
    async fn test_remove_product() -> Result<()> {
        with_each_backend(|store| async move {
            create_test_category(&store, "Panes").await?;
            let product = store.insert_product(new_test_product("Baguette", "panes")).await?;
            let removed = store.remove_product(product.id).await?;
            assert_eq!(removed, product);
            assert!(store.list_products().await?.is_empty());
            assert!(matches!(
                store.remove_product(product.id).await,
                Err(Error::NotFound { .. })
            ));
            Ok(())
        })
        .await
    }

    #[tokio::test]
    async fn test_category_collision_and_referential_guard() -> Result<()> {
        with_each_backend(|store| async move {
            let category = create_test_category(&store, "Panes").await?;
            let duplicate = store.insert_category(category.clone()).await;
            assert!(matches!(duplicate, Err(Error::Validation { .. })));

            let product = store.insert_product(new_test_product("Baguette", "panes")).await?;
            let guarded = store.remove_category("panes").await;
            assert!(matches!(guarded, Err(Error::Validation { .. })));
            assert_eq!(store.list_categories().await?, vec![category.clone()]);
            assert_eq!(store.list_products().await?, vec![product.clone()]);

            store.remove_product(product.id).await?;
            assert_eq!(store.remove_category("panes").await?, category);
            assert!(store.list_categories().await?.is_empty());
            Ok(())
        })
        .await
    }

    #[tokio::test]
    async fn test_order_roundtrip_and_status_update() -> Result<()> {
        with_each_backend(|store| async move {
            let order = store.insert_order(test_order("ord-1")).await?;
            assert_eq!(store.get_order("ord-1").await?.unwrap(), order);

            let mut processing = order.clone();
            processing.status = OrderStatus::Processing;
            let updated = store.update_order(processing).await?;
            assert_eq!(updated.status, OrderStatus::Processing);
            assert_eq!(updated.version, 1);
            assert_eq!(updated.items, order.items);

            let mut stale = order.clone();
            stale.status = OrderStatus::Cancelled;
            assert!(matches!(
                store.update_order(stale).await,
                Err(Error::Conflict { .. })
            ));
            assert_eq!(store.list_orders().await?, vec![updated]);
            Ok(())
        })
        .await
    }
}
