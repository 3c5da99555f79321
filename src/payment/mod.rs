//! Hosted-payment preferences.
//!
//! A preference is a provider-hosted checkout session: the shop sends the priced line items and
//! payer details, the provider answers with an id and a URL the buyer is redirected to.

pub mod mercadopago;

pub use mercadopago::MercadoPagoClient;

use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One priced line of a preference. Prices always come from the server-side catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreferenceItem {
    pub id: String,
    pub title: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub currency_id: String,
}

/// Buyer details forwarded to the provider as given by the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Payer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreferenceRequest {
    pub items: Vec<PreferenceItem>,
    pub payer: Option<Payer>,
}

/// What the storefront needs to redirect the buyer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preference {
    pub id: String,
    pub init_point: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_preference(&self, request: &PreferenceRequest) -> Result<Preference>;
}
