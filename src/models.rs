//! Domain records shared by every storage backend and the HTTP layer.
//!
//! These are the shapes persisted in the flat JSON collections and returned by the API.
//! The `SQLite` backend converts its `SeaORM` models into these types at the store boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::errors::Error;

/// A product offered in the storefront.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Product {
    /// Unique positive identifier
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Regular unit price
    pub price: f64,
    /// Sale price, only effective when lower than `price`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promo_price: Option<f64>,
    pub stock: u32,
    /// Id (slug) of the owning category
    pub category: String,
    /// Image path relative to the public root (e.g. `productos/1718000000000-ab12cd34.jpg`)
    pub image: String,
    /// Bumped on every update, used for optimistic concurrency checks
    #[serde(default)]
    pub version: u32,
}

impl Product {
    /// A product is on sale iff it has a promo price strictly below its regular price.
    #[must_use]
    pub fn is_on_sale(&self) -> bool {
        self.promo_price.is_some_and(|promo| promo < self.price)
    }

    /// Unit price used for carts and checkout.
    #[must_use]
    pub fn effective_price(&self) -> f64 {
        match self.promo_price {
            Some(promo) if promo < self.price => promo,
            _ => self.price,
        }
    }
}

/// A product category; `id` is the slug derived from `name`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub name: String,
}

/// Lifecycle of an order. Transitions are driven only by admin action.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// `pending → processing → shipped → delivered`, or `pending → cancelled`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing | Self::Cancelled)
                | (Self::Processing, Self::Shipped)
                | (Self::Shipped, Self::Delivered)
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            other => Err(Error::validation(format!("Unknown order status '{other}'"))),
        }
    }
}

/// Buyer details captured at checkout. Spanish aliases accept payloads from the legacy storefront.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct Customer {
    #[serde(alias = "nombre")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(alias = "telefono")]
    pub phone: String,
    #[serde(default, alias = "metodoEntrega")]
    pub delivery_method: String,
    #[serde(default, alias = "direccion", skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, alias = "ciudad", skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, alias = "codigoPostal", skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, alias = "referencias", skip_serializing_if = "Option::is_none")]
    pub references: Option<String>,
    #[serde(default, alias = "horarioEntrega", skip_serializing_if = "Option::is_none")]
    pub delivery_time: Option<String>,
}

/// Snapshot of a cart line taken at submission time. Never re-joined against the product later.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OrderItem {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub quantity: u32,
}

impl OrderItem {
    #[must_use]
    pub fn subtotal(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }
}

/// A placed order.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Order {
    /// Time-ordered unique token
    pub id: String,
    pub customer: Customer,
    pub items: Vec<OrderItem>,
    pub total: f64,
    pub payment_method: String,
    pub date: DateTime<Utc>,
    pub status: OrderStatus,
    #[serde(default)]
    pub version: u32,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    fn product(price: f64, promo_price: Option<f64>) -> Product {
        Product {
            id: 1,
            name: "Baguette".to_string(),
            description: String::new(),
            price,
            promo_price,
            stock: 3,
            category: "panes".to_string(),
            image: "productos/1.jpg".to_string(),
            version: 0,
        }
    }

    #[test]
    fn test_effective_price_uses_lower_promo() {
        let p = product(1000.0, Some(800.0));
        assert!(p.is_on_sale());
        assert_eq!(p.effective_price(), 800.0);
    }

    #[test]
    fn test_effective_price_ignores_promo_not_below_price() {
        let equal = product(1000.0, Some(1000.0));
        assert!(!equal.is_on_sale());
        assert_eq!(equal.effective_price(), 1000.0);

        let higher = product(1000.0, Some(1200.0));
        assert!(!higher.is_on_sale());
        assert_eq!(higher.effective_price(), 1000.0);

        let absent = product(1000.0, None);
        assert!(!absent.is_on_sale());
        assert_eq!(absent.effective_price(), 1000.0);
    }

    #[test]
    fn test_order_status_transitions() {
        use OrderStatus::{Cancelled, Delivered, Pending, Processing, Shipped};

        assert!(Pending.can_transition_to(Processing));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Processing.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Delivered));

        assert!(!Pending.can_transition_to(Shipped));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Processing.can_transition_to(Cancelled));
        assert!(!Delivered.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Processing));
    }

    #[test]
    fn test_order_status_parses_case_insensitively() {
        assert_eq!("Shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
        assert_eq!("canceled".parse::<OrderStatus>().unwrap(), OrderStatus::Cancelled);
        assert!("lost".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_customer_accepts_legacy_field_names() {
        let json = r#"{"nombre":"Ana","telefono":"1122334455","metodoEntrega":"Retiro","ciudad":"CABA"}"#;
        let customer: Customer = serde_json::from_str(json).unwrap();
        assert_eq!(customer.name, "Ana");
        assert_eq!(customer.phone, "1122334455");
        assert_eq!(customer.delivery_method, "Retiro");
        assert_eq!(customer.city.as_deref(), Some("CABA"));
        assert!(customer.email.is_none());
    }
}
