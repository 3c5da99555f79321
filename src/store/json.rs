//! Flat-file JSON backend.
//!
//! Each collection lives in its own pretty-printed JSON array file and is loaded and rewritten
//! in full on every operation. Writes land in a sibling `.tmp` file which is then renamed over
//! the collection file, so readers never observe a half-written array. Every operation on a
//! collection holds that collection's async mutex for the whole read-modify-write cycle;
//! operations spanning collections lock products, then categories, then orders.
//!
//! A collection file that does not exist yet is created as `[]` on first access.

use crate::{
    errors::{Error, Result},
    models::{Category, Order, Product},
    store::NewProduct,
};
use serde::{Serialize, de::DeserializeOwned};
use std::{
    io::ErrorKind,
    marker::PhantomData,
    path::{Path, PathBuf},
};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, instrument};

pub const PRODUCTS_FILE: &str = "products.json";
pub const CATEGORIES_FILE: &str = "categories.json";
pub const ORDERS_FILE: &str = "orders.json";

/// One JSON array file plus the lock serializing access to it.
struct JsonCollection<T> {
    path: PathBuf,
    lock: Mutex<()>,
    _records: PhantomData<fn() -> T>,
}

impl<T> JsonCollection<T>
where
    T: Serialize + DeserializeOwned,
{
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
            _records: PhantomData,
        }
    }

    async fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }

    /// Reads the whole collection. Callers must hold the collection lock.
    async fn load(&self) -> Result<Vec<T>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                Error::storage(format!("Failed to parse {}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{} does not exist yet, creating it empty", self.path.display());
                self.persist(&[]).await?;
                Ok(Vec::new())
            }
            Err(e) => Err(Error::storage(format!(
                "Failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }

    /// Replaces the whole collection. Callers must hold the collection lock.
    async fn persist(&self, records: &[T]) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await.map_err(|e| {
            Error::storage(format!("Failed to write {}: {e}", tmp.display()))
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            Error::storage(format!("Failed to write {}: {e}", self.path.display()))
        })
    }
}

/// Repository backed by `products.json`, `categories.json` and `orders.json` in one directory.
pub struct JsonStore {
    products: JsonCollection<Product>,
    categories: JsonCollection<Category>,
    orders: JsonCollection<Order>,
}

impl JsonStore {
    /// Opens (and creates if needed) the data directory.
    pub async fn open(data_dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir).await.map_err(|e| {
            Error::storage(format!(
                "Failed to create data directory {}: {e}",
                data_dir.display()
            ))
        })?;

        Ok(Self {
            products: JsonCollection::new(data_dir.join(PRODUCTS_FILE)),
            categories: JsonCollection::new(data_dir.join(CATEGORIES_FILE)),
            orders: JsonCollection::new(data_dir.join(ORDERS_FILE)),
        })
    }

    pub async fn list_products(&self) -> Result<Vec<Product>> {
        let _guard = self.products.lock().await;
        self.products.load().await
    }

    pub async fn get_product(&self, id: i64) -> Result<Option<Product>> {
        let _guard = self.products.lock().await;
        let products = self.products.load().await?;
        Ok(products.into_iter().find(|p| p.id == id))
    }

    #[instrument(skip(self, new_product), fields(name = %new_product.name))]
    pub async fn insert_product(&self, new_product: NewProduct) -> Result<Product> {
        let _guard = self.products.lock().await;
        let mut products = self.products.load().await?;

        let id = products.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        let product = new_product.into_product(id);
        products.push(product.clone());

        self.products.persist(&products).await?;
        debug!("Inserted product {}", id);
        Ok(product)
    }

    #[instrument(skip(self, product), fields(id = product.id))]
    pub async fn update_product(&self, product: Product) -> Result<Product> {
        let _guard = self.products.lock().await;
        let mut products = self.products.load().await?;

        let slot = products
            .iter_mut()
            .find(|p| p.id == product.id)
            .ok_or_else(|| Error::not_found("Product", product.id))?;

        if slot.version != product.version {
            return Err(Error::Conflict {
                entity: "Product",
                id: product.id.to_string(),
            });
        }

        let updated = Product {
            version: product.version + 1,
            ..product
        };
        *slot = updated.clone();

        self.products.persist(&products).await?;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn remove_product(&self, id: i64) -> Result<Product> {
        let _guard = self.products.lock().await;
        let mut products = self.products.load().await?;

        let index = products
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| Error::not_found("Product", id))?;
        let removed = products.remove(index);

        self.products.persist(&products).await?;
        Ok(removed)
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        let _guard = self.categories.lock().await;
        self.categories.load().await
    }

    pub async fn get_category(&self, id: &str) -> Result<Option<Category>> {
        let _guard = self.categories.lock().await;
        let categories = self.categories.load().await?;
        Ok(categories.into_iter().find(|c| c.id == id))
    }

    #[instrument(skip(self, category), fields(id = %category.id))]
    pub async fn insert_category(&self, category: Category) -> Result<Category> {
        let _guard = self.categories.lock().await;
        let mut categories = self.categories.load().await?;

        if categories.iter().any(|c| c.id == category.id) {
            return Err(Error::validation(format!(
                "Category '{}' already exists",
                category.id
            )));
        }
        categories.push(category.clone());

        self.categories.persist(&categories).await?;
        Ok(category)
    }

    #[instrument(skip(self))]
    pub async fn remove_category(&self, id: &str) -> Result<Category> {
        // Lock order: products, then categories
        let _products_guard = self.products.lock().await;
        let _categories_guard = self.categories.lock().await;

        let products = self.products.load().await?;
        if products.iter().any(|p| p.category == id) {
            return Err(Error::validation(format!(
                "Category '{id}' is still used by products"
            )));
        }

        let mut categories = self.categories.load().await?;
        let index = categories
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| Error::not_found("Category", id))?;
        let removed = categories.remove(index);

        self.categories.persist(&categories).await?;
        Ok(removed)
    }

    pub async fn list_orders(&self) -> Result<Vec<Order>> {
        let _guard = self.orders.lock().await;
        self.orders.load().await
    }

    pub async fn get_order(&self, id: &str) -> Result<Option<Order>> {
        let _guard = self.orders.lock().await;
        let orders = self.orders.load().await?;
        Ok(orders.into_iter().find(|o| o.id == id))
    }

    #[instrument(skip(self, order), fields(id = %order.id))]
    pub async fn insert_order(&self, order: Order) -> Result<Order> {
        let _guard = self.orders.lock().await;
        let mut orders = self.orders.load().await?;

        if orders.iter().any(|o| o.id == order.id) {
            return Err(Error::Conflict {
                entity: "Order",
                id: order.id,
            });
        }
        orders.push(order.clone());

        self.orders.persist(&orders).await?;
        Ok(order)
    }

    #[instrument(skip(self, order), fields(id = %order.id))]
    pub async fn update_order(&self, order: Order) -> Result<Order> {
        let _guard = self.orders.lock().await;
        let mut orders = self.orders.load().await?;

        let slot = orders
            .iter_mut()
            .find(|o| o.id == order.id)
            .ok_or_else(|| Error::not_found("Order", &order.id))?;

        if slot.version != order.version {
            return Err(Error::Conflict {
                entity: "Order",
                id: order.id,
            });
        }

        let updated = Order {
            version: order.version + 1,
            ..order
        };
        *slot = updated.clone();

        self.orders.persist(&orders).await?;
        Ok(updated)
    }
}
