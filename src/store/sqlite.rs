//! Keyed `SQLite` backend built on `SeaORM`.
//!
//! Unlike the JSON backend, records are read and written individually. Product ids come from
//! `SQLite` autoincrement. Updates are conditional on the stored `version`, so two writers racing
//! on the same record cannot silently overwrite each other: the loser gets a conflict.

use crate::{
    config::database::{create_connection, create_tables},
    entities::{self, Category as CategoryEntity, Order as OrderEntity, Product as ProductEntity},
    entities::{CategoryColumn, OrderColumn, ProductColumn},
    errors::{Error, Result},
    models::{Category, Order, Product},
    store::NewProduct,
};
use chrono::Utc;
use sea_orm::{DatabaseConnection, QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{debug, instrument};

pub struct SqliteStore {
    db: DatabaseConnection,
}

impl SqliteStore {
    /// Connects to `database_url` and creates any missing tables.
    pub async fn open(database_url: &str) -> Result<Self> {
        let db = create_connection(database_url).await?;
        create_tables(&db).await?;
        Ok(Self { db })
    }

    #[must_use]
    pub const fn from_connection(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list_products(&self) -> Result<Vec<Product>> {
        ProductEntity::find()
            .order_by_asc(ProductColumn::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(product_from_model)
            .collect()
    }

    pub async fn get_product(&self, id: i64) -> Result<Option<Product>> {
        ProductEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(product_from_model)
            .transpose()
    }

    #[instrument(skip(self, new_product), fields(name = %new_product.name))]
    pub async fn insert_product(&self, new_product: NewProduct) -> Result<Product> {
        let now = Utc::now();
        let product = entities::product::ActiveModel {
            name: Set(new_product.name),
            description: Set(new_product.description),
            price: Set(new_product.price),
            promo_price: Set(new_product.promo_price),
            stock: Set(i64::from(new_product.stock)),
            category: Set(new_product.category),
            image: Set(new_product.image),
            version: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let inserted = product.insert(&self.db).await?;
        debug!("Inserted product {}", inserted.id);
        product_from_model(inserted)
    }

    #[instrument(skip(self, product), fields(id = product.id))]
    pub async fn update_product(&self, product: Product) -> Result<Product> {
        let read_version = i64::from(product.version);
        let changes = entities::product::ActiveModel {
            name: Set(product.name),
            description: Set(product.description),
            price: Set(product.price),
            promo_price: Set(product.promo_price),
            stock: Set(i64::from(product.stock)),
            category: Set(product.category),
            image: Set(product.image),
            version: Set(read_version + 1),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };

        let result = ProductEntity::update_many()
            .set(changes)
            .filter(ProductColumn::Id.eq(product.id))
            .filter(ProductColumn::Version.eq(read_version))
            .exec(&self.db)
            .await?;

        let stored = ProductEntity::find_by_id(product.id)
            .one(&self.db)
            .await?
            .ok_or_else(|| Error::not_found("Product", product.id))?;

        if result.rows_affected == 0 {
            return Err(Error::Conflict {
                entity: "Product",
                id: product.id.to_string(),
            });
        }
        product_from_model(stored)
    }

    #[instrument(skip(self))]
    pub async fn remove_product(&self, id: i64) -> Result<Product> {
        let stored = ProductEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| Error::not_found("Product", id))?;

        ProductEntity::delete_by_id(id).exec(&self.db).await?;
        product_from_model(stored)
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(CategoryEntity::find()
            .all(&self.db)
            .await?
            .into_iter()
            .map(category_from_model)
            .collect())
    }

    pub async fn get_category(&self, id: &str) -> Result<Option<Category>> {
        Ok(CategoryEntity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .map(category_from_model))
    }

    #[instrument(skip(self, category), fields(id = %category.id))]
    pub async fn insert_category(&self, category: Category) -> Result<Category> {
        let txn = self.db.begin().await?;

        if CategoryEntity::find_by_id(category.id.clone())
            .one(&txn)
            .await?
            .is_some()
        {
            return Err(Error::validation(format!(
                "Category '{}' already exists",
                category.id
            )));
        }

        let model = entities::category::ActiveModel {
            id: Set(category.id.clone()),
            name: Set(category.name.clone()),
        };
        CategoryEntity::insert(model)
            .exec_without_returning(&txn)
            .await?;

        txn.commit().await?;
        Ok(category)
    }

    #[instrument(skip(self))]
    pub async fn remove_category(&self, id: &str) -> Result<Category> {
        // Use a transaction so the reference check and the delete see the same state
        let txn = self.db.begin().await?;

        let in_use = ProductEntity::find()
            .filter(ProductColumn::Category.eq(id))
            .one(&txn)
            .await?
            .is_some();
        if in_use {
            return Err(Error::validation(format!(
                "Category '{id}' is still used by products"
            )));
        }

        let stored = CategoryEntity::find_by_id(id.to_string())
            .one(&txn)
            .await?
            .ok_or_else(|| Error::not_found("Category", id))?;

        CategoryEntity::delete_many()
            .filter(CategoryColumn::Id.eq(id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(category_from_model(stored))
    }

    pub async fn list_orders(&self) -> Result<Vec<Order>> {
        OrderEntity::find()
            .order_by_asc(OrderColumn::Date)
            .all(&self.db)
            .await?
            .into_iter()
            .map(order_from_model)
            .collect()
    }

    pub async fn get_order(&self, id: &str) -> Result<Option<Order>> {
        OrderEntity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .map(order_from_model)
            .transpose()
    }

    #[instrument(skip(self, order), fields(id = %order.id))]
    pub async fn insert_order(&self, order: Order) -> Result<Order> {
        let model = entities::order::ActiveModel {
            id: Set(order.id.clone()),
            customer: Set(serde_json::to_string(&order.customer)?),
            items: Set(serde_json::to_string(&order.items)?),
            total: Set(order.total),
            payment_method: Set(order.payment_method.clone()),
            date: Set(order.date),
            status: Set(order.status.as_str().to_string()),
            version: Set(i64::from(order.version)),
        };
        OrderEntity::insert(model)
            .exec_without_returning(&self.db)
            .await?;
        Ok(order)
    }

    #[instrument(skip(self, order), fields(id = %order.id))]
    pub async fn update_order(&self, order: Order) -> Result<Order> {
        let read_version = i64::from(order.version);
        let changes = entities::order::ActiveModel {
            status: Set(order.status.as_str().to_string()),
            version: Set(read_version + 1),
            ..Default::default()
        };

        let result = OrderEntity::update_many()
            .set(changes)
            .filter(OrderColumn::Id.eq(order.id.as_str()))
            .filter(OrderColumn::Version.eq(read_version))
            .exec(&self.db)
            .await?;

        let stored = OrderEntity::find_by_id(order.id.clone())
            .one(&self.db)
            .await?
            .ok_or_else(|| Error::not_found("Order", &order.id))?;

        if result.rows_affected == 0 {
            return Err(Error::Conflict {
                entity: "Order",
                id: order.id,
            });
        }
        order_from_model(stored)
    }
}

fn product_from_model(model: entities::ProductModel) -> Result<Product> {
    Ok(Product {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        promo_price: model.promo_price,
        stock: u32::try_from(model.stock)?,
        category: model.category,
        image: model.image,
        version: u32::try_from(model.version)?,
    })
}

fn category_from_model(model: entities::CategoryModel) -> Category {
    Category {
        id: model.id,
        name: model.name,
    }
}

fn order_from_model(model: entities::OrderModel) -> Result<Order> {
    Ok(Order {
        customer: serde_json::from_str(&model.customer)?,
        items: serde_json::from_str(&model.items)?,
        status: model.status.parse()?,
        version: u32::try_from(model.version)?,
        id: model.id,
        total: model.total,
        payment_method: model.payment_method,
        date: model.date,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_from_connection_uses_existing_tables() -> Result<()> {
        let db = sea_orm::Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        let store = SqliteStore::from_connection(db);

        store
            .insert_category(Category {
                id: "panes".to_string(),
                name: "Panes".to_string(),
            })
            .await?;
        let product = store.insert_product(new_test_product("Baguette", "panes")).await?;
        assert_eq!(product.id, 1);
        assert_eq!(product.version, 0);
        assert_eq!(store.get_product(1).await?, Some(product));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_order_keeps_snapshot_fields() -> Result<()> {
        let store = setup_sqlite_store().await?;
        let order = store.insert_order(test_order("ord-2")).await?;

        // Only status and version are written on update
        let mut edited = order.clone();
        edited.status = crate::models::OrderStatus::Cancelled;
        edited.total = 1.0;
        let updated = store.update_order(edited).await?;

        assert_eq!(updated.status, crate::models::OrderStatus::Cancelled);
        assert_eq!(updated.total, order.total);
        Ok(())
    }

    #[tokio::test]
    async fn test_order_snapshot_survives_storage() -> Result<()> {
        let store = setup_sqlite_store().await?;
        let order = test_order("ord-snapshot");
        store.insert_order(order.clone()).await?;

        let stored = store.get_order("ord-snapshot").await?.unwrap();
        assert_eq!(stored.customer, order.customer);
        assert_eq!(stored.items, order.items);
        assert_eq!(stored.status, order.status);
        Ok(())
    }
}
