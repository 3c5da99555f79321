//! Product entity - Represents a storefront product in the keyed store.
//!
//! Products belong to a category (by slug), carry an optional promo price and a stock count,
//! and reference an uploaded image by its public relative path. The `version` column backs
//! optimistic concurrency checks on update.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product (autoincrement)
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name (e.g., "Baguette", "Combo desayuno")
    pub name: String,
    /// Free-form description shown on the product card
    pub description: String,
    /// Regular unit price
    pub price: f64,
    /// Optional sale price
    pub promo_price: Option<f64>,
    /// Units available
    pub stock: i64,
    /// Slug of the category this product is listed under
    pub category: String,
    /// Image path relative to the public root
    pub image: String,
    /// Incremented on every update
    pub version: i64,
    /// When the product was created
    pub created_at: DateTimeUtc,
    /// When the product was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each product belongs to one category
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::Category",
        to = "super::category::Column::Id"
    )]
    Category,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
