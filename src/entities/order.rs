//! Order entity - Orders placed through the manual checkout path.
//!
//! Customer details and the item snapshot are stored as JSON text; they are written once at
//! submission and never re-joined against products. Only `status` and `version` change afterwards.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Order database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    /// Time-ordered unique token
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Serialized `Customer`
    pub customer: String,
    /// Serialized `Vec<OrderItem>`
    pub items: String,
    /// Order total computed at submission
    pub total: f64,
    /// Payment method chosen by the buyer (e.g., "efectivo", "transferencia")
    pub payment_method: String,
    /// When the order was placed
    pub date: DateTimeUtc,
    /// One of `pending`, `processing`, `shipped`, `delivered`, `cancelled`
    pub status: String,
    /// Incremented on every status change
    pub version: i64,
}

/// Orders have no relationships; items are snapshots, not foreign keys
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
