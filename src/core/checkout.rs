//! Checkout - turning a submitted cart into an order or a hosted-payment preference.
//!
//! Both paths price the cart the same way: every line is resolved against the live product
//! list, unknown products and quantities above stock are rejected, and each unit is charged
//! the product's effective price. Prices and totals sent by the client are display-only.
//!
//! - Manual path ([`place_order`]): the order is persisted as `pending`, the shop is emailed in
//!   the background, and the caller gets a WhatsApp link prefilled with the order summary.
//! - Hosted path ([`create_preference`]): the priced lines are sent to the payment gateway and
//!   the caller gets the redirect URL. Nothing is persisted.

use crate::{
    config::AppConfig,
    errors::{Error, Result},
    models::{Customer, Order, OrderItem, OrderStatus, Product},
    notify::{Email, Mailer, templates},
    payment::{Payer, PaymentGateway, Preference, PreferenceItem, PreferenceRequest},
    store::Store,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tracing::{info, instrument, warn};

/// Payment method recorded when the storefront does not send one.
const DEFAULT_PAYMENT_METHOD: &str = "whatsapp";

/// One cart line as sent by the storefront. Only `id` and `quantity` are trusted.
#[derive(Debug, Clone, Deserialize)]
pub struct CartLine {
    pub id: i64,
    pub quantity: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
}

/// Body of the manual (WhatsApp) checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderSubmission {
    pub customer: Customer,
    pub items: Vec<CartLine>,
    #[serde(default)]
    pub total: Option<f64>,
    #[serde(default, alias = "metodoPago", alias = "paymentMethod")]
    pub payment_method: Option<String>,
}

/// Body of the hosted-payment checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct PreferenceSubmission {
    pub items: Vec<CartLine>,
    #[serde(default)]
    pub payer: Option<Payer>,
}

/// A cart after server-side pricing.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedCart {
    pub lines: Vec<(Product, u32)>,
    pub total: f64,
}

impl PricedCart {
    #[must_use]
    pub fn order_items(&self) -> Vec<OrderItem> {
        self.lines
            .iter()
            .map(|(product, quantity)| OrderItem {
                id: product.id,
                name: product.name.clone(),
                price: product.effective_price(),
                quantity: *quantity,
            })
            .collect()
    }
}

/// Result of the manual checkout.
#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    pub order: Order,
    pub whatsapp_url: Option<String>,
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Resolves and prices `lines` against the current catalog.
///
/// Lines naming the same product are merged before the stock check.
///
/// # Errors
/// - [`Error::Validation`] for an empty cart, a zero quantity, a quantity above stock, or a
///   total under `minimum_purchase`
/// - [`Error::NotFound`] for an unknown product id
pub async fn price_cart(store: &Store, lines: &[CartLine], minimum_purchase: f64) -> Result<PricedCart> {
    if lines.is_empty() {
        return Err(Error::validation("The cart is empty"));
    }

    let mut merged: Vec<(i64, u32)> = Vec::new();
    for line in lines {
        if line.quantity == 0 {
            return Err(Error::validation(format!(
                "Quantity for product {} must be at least 1",
                line.id
            )));
        }
        match merged.iter_mut().find(|(id, _)| *id == line.id) {
            Some((_, quantity)) => *quantity = quantity.saturating_add(line.quantity),
            None => merged.push((line.id, line.quantity)),
        }
    }

    let catalog: HashMap<i64, Product> = store
        .list_products()
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let mut priced = Vec::with_capacity(merged.len());
    let mut total = 0.0;
    for (id, quantity) in merged {
        let product = catalog
            .get(&id)
            .ok_or_else(|| Error::not_found("Product", id))?;
        if quantity > product.stock {
            return Err(Error::validation(format!(
                "Insufficient stock for {}: requested {quantity}, available {}",
                product.name, product.stock
            )));
        }
        total += product.effective_price() * f64::from(quantity);
        priced.push((product.clone(), quantity));
    }
    let total = round_cents(total);

    if minimum_purchase > 0.0 && total < minimum_purchase {
        return Err(Error::validation(format!(
            "The minimum purchase is {}, the cart totals {}",
            templates::format_amount(minimum_purchase),
            templates::format_amount(total)
        )));
    }

    Ok(PricedCart {
        lines: priced,
        total,
    })
}

fn validate_customer(customer: &Customer) -> Result<()> {
    let mut missing = Vec::new();
    if customer.name.trim().is_empty() {
        missing.push("name");
    }
    if customer.phone.trim().is_empty() {
        missing.push("phone");
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "Customer {} required",
            missing.join(" and ")
        )))
    }
}

fn warn_on_client_total(client_total: Option<f64>, total: f64) {
    if let Some(client_total) = client_total {
        if (client_total - total).abs() > 0.005 {
            warn!(
                "Client total {} differs from server total {}, using the server total",
                client_total, total
            );
        }
    }
}

/// Manual checkout: persists a pending order, notifies the shop by email in the background,
/// and returns the order together with the WhatsApp link the buyer should open.
///
/// # Errors
/// Returns the pricing errors of [`price_cart`], a validation error for missing customer
/// details, or a storage error if the order could not be saved. Email failures never fail
/// the checkout; they are logged.
#[instrument(skip_all, fields(items = submission.items.len()))]
pub async fn place_order(
    store: &Store,
    mailer: Arc<dyn Mailer>,
    config: &AppConfig,
    submission: OrderSubmission,
) -> Result<PlacedOrder> {
    validate_customer(&submission.customer)?;
    let cart = price_cart(store, &submission.items, config.shop.minimum_purchase).await?;
    warn_on_client_total(submission.total, cart.total);

    let order = Order {
        id: uuid::Uuid::now_v7().to_string(),
        customer: submission.customer,
        items: cart.order_items(),
        total: cart.total,
        payment_method: submission
            .payment_method
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string()),
        date: chrono::Utc::now(),
        status: OrderStatus::Pending,
        version: 0,
    };
    let order = store.insert_order(order).await?;
    info!("Placed order {} totalling {}", order.id, order.total);

    notify_shop(mailer, config, &order);

    let text = templates::whatsapp_message(&order, &config.shop.name);
    let whatsapp_url = templates::whatsapp_url(&config.shop.whatsapp_number, &text);
    if whatsapp_url.is_none() {
        warn!("shop.whatsapp_number is not configured, no WhatsApp link returned");
    }

    Ok(PlacedOrder {
        order,
        whatsapp_url,
    })
}

/// Sends the new-order email on a background task and logs how it went.
fn notify_shop(mailer: Arc<dyn Mailer>, config: &AppConfig, order: &Order) {
    if config.email.to.trim().is_empty() {
        warn!("email.to is not configured, skipping notification for order {}", order.id);
        return;
    }

    let (subject, html) = templates::order_email(order, &config.shop.name);
    let email = Email {
        to: config.email.to.clone(),
        subject,
        html,
    };
    let order_id = order.id.clone();
    tokio::spawn(async move {
        match mailer.send(email).await {
            Ok(()) => info!("Notification for order {} sent", order_id),
            Err(e) => warn!("Notification for order {} failed: {}", order_id, e),
        }
    });
}

/// Hosted checkout: prices the cart and asks the payment gateway for a preference.
///
/// # Errors
/// Returns the pricing errors of [`price_cart`], or [`Error::ExternalService`] if the gateway
/// fails.
#[instrument(skip_all, fields(items = submission.items.len()))]
pub async fn create_preference(
    store: &Store,
    gateway: &dyn PaymentGateway,
    config: &AppConfig,
    submission: PreferenceSubmission,
) -> Result<Preference> {
    let cart = price_cart(store, &submission.items, config.shop.minimum_purchase).await?;

    let request = PreferenceRequest {
        items: cart
            .lines
            .iter()
            .map(|(product, quantity)| PreferenceItem {
                id: product.id.to_string(),
                title: product.name.clone(),
                quantity: *quantity,
                unit_price: product.effective_price(),
                currency_id: config.shop.currency.clone(),
            })
            .collect(),
        payer: submission.payer,
    };

    gateway.create_preference(&request).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;
    use std::time::Duration;

    fn line(id: i64, quantity: u32) -> CartLine {
        CartLine {
            id,
            quantity,
            name: None,
            price: None,
        }
    }

    fn priced(name: &str, price: f64) -> crate::store::NewProduct {
        crate::store::NewProduct {
            price,
            ..new_test_product(name, "panes")
        }
    }

    /// Product 1: Baguette at 500, stock 10. Product 2: Torta at 1000 with promo 800, stock 3.
    async fn catalog_store() -> Result<(tempfile::TempDir, Store)> {
        let (dir, store) = setup_json_store().await?;
        create_test_category(&store, "Panes").await?;
        store.insert_product(priced("Baguette", 500.0)).await?;
        store
            .insert_product(crate::store::NewProduct {
                promo_price: Some(800.0),
                stock: 3,
                ..priced("Torta", 1000.0)
            })
            .await?;
        Ok((dir, store))
    }

    async fn wait_for_emails(mailer: &RecordingMailer, count: usize) -> Vec<Email> {
        for _ in 0..50 {
            let sent = mailer.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        mailer.sent()
    }

    fn submission(items: Vec<CartLine>, total: Option<f64>) -> OrderSubmission {
        OrderSubmission {
            customer: test_customer(),
            items,
            total,
            payment_method: Some("Efectivo".to_string()),
        }
    }

    #[tokio::test]
    async fn test_price_cart_uses_effective_prices() -> Result<()> {
        let (_dir, store) = catalog_store().await?;
        let cart = price_cart(&store, &[line(1, 2), line(2, 1), line(1, 1)], 0.0).await?;

        assert_eq!(cart.total, 500.0 * 3.0 + 800.0);
        let items = cart.order_items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].quantity, 3);
        assert_eq!(items[1].price, 800.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_price_cart_rejections() -> Result<()> {
        let (_dir, store) = catalog_store().await?;

        assert!(matches!(price_cart(&store, &[], 0.0).await, Err(Error::Validation { .. })));
        assert!(matches!(
            price_cart(&store, &[line(1, 0)], 0.0).await,
            Err(Error::Validation { .. })
        ));
        assert!(matches!(
            price_cart(&store, &[line(99, 1)], 0.0).await,
            Err(Error::NotFound { .. })
        ));
        // Stock 3, split across two lines
        assert!(matches!(
            price_cart(&store, &[line(2, 2), line(2, 2)], 0.0).await,
            Err(Error::Validation { .. })
        ));
        assert!(matches!(
            price_cart(&store, &[line(1, 1)], 1000.0).await,
            Err(Error::Validation { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_place_order_persists_pending_snapshot() -> Result<()> {
        let (_dir, store) = catalog_store().await?;
        let mailer = Arc::new(RecordingMailer::default());
        let mut config = AppConfig::default();
        config.shop.whatsapp_number = "5491100000000".to_string();
        config.email.to = "shop@example.com".to_string();

        let placed = place_order(
            &store,
            Arc::clone(&mailer) as Arc<dyn Mailer>,
            &config,
            submission(vec![line(1, 2)], Some(1000.0)),
        )
        .await?;

        let order = &placed.order;
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total, 1000.0);
        assert_eq!(
            order.items,
            vec![OrderItem {
                id: 1,
                name: "Baguette".to_string(),
                price: 500.0,
                quantity: 2,
            }]
        );
        assert_eq!(store.list_orders().await?, vec![order.clone()]);
        assert!(placed.whatsapp_url.unwrap().starts_with("https://wa.me/5491100000000?text="));

        // A later price change does not touch the stored snapshot
        let mut product = store.get_product(1).await?.unwrap();
        product.price = 650.0;
        store.update_product(product).await?;
        assert_eq!(store.get_order(&order.id).await?.unwrap().items[0].price, 500.0);

        let sent = wait_for_emails(&mailer, 1).await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "shop@example.com");
        Ok(())
    }

    #[tokio::test]
    async fn test_place_order_ignores_client_prices() -> Result<()> {
        let (_dir, store) = catalog_store().await?;
        let mut cheap = line(2, 1);
        cheap.price = Some(1.0);

        let placed = place_order(
            &store,
            Arc::new(RecordingMailer::default()),
            &AppConfig::default(),
            submission(vec![cheap], Some(1.0)),
        )
        .await?;
        assert_eq!(placed.order.total, 800.0);
        assert!(placed.whatsapp_url.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_place_order_survives_email_failure() -> Result<()> {
        let (_dir, store) = catalog_store().await?;
        let mut config = AppConfig::default();
        config.email.to = "shop@example.com".to_string();

        let placed = place_order(
            &store,
            Arc::new(RecordingMailer::failing()),
            &config,
            submission(vec![line(1, 1)], None),
        )
        .await?;
        assert_eq!(store.get_order(&placed.order.id).await?.unwrap(), placed.order);
        Ok(())
    }

    #[tokio::test]
    async fn test_place_order_requires_customer_details() -> Result<()> {
        let (_dir, store) = catalog_store().await?;
        let mut bad = submission(vec![line(1, 1)], None);
        bad.customer.phone = "  ".to_string();

        let result = place_order(&store, Arc::new(RecordingMailer::default()), &AppConfig::default(), bad).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        assert!(store.list_orders().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_create_preference_sends_server_prices() -> Result<()> {
        let (_dir, store) = catalog_store().await?;
        let gateway = FakeGateway::default();

        let preference = create_preference(
            &store,
            &gateway,
            &AppConfig::default(),
            PreferenceSubmission {
                items: vec![line(2, 2)],
                payer: None,
            },
        )
        .await?;
        assert_eq!(preference.id, "pref-123");

        let requests = gateway.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].items[0].unit_price, 800.0);
        assert_eq!(requests[0].items[0].currency_id, "ARS");
        assert!(store.list_orders().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_create_preference_rejects_excess_quantity() -> Result<()> {
        let (_dir, store) = catalog_store().await?;
        let gateway = FakeGateway::default();

        let result = create_preference(
            &store,
            &gateway,
            &AppConfig::default(),
            PreferenceSubmission {
                items: vec![line(2, 4)],
                payer: None,
            },
        )
        .await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        assert!(gateway.requests().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_create_preference_gateway_failure() -> Result<()> {
        let (_dir, store) = catalog_store().await?;
        let result = create_preference(
            &store,
            &FakeGateway::failing(),
            &AppConfig::default(),
            PreferenceSubmission {
                items: vec![line(1, 1)],
                payer: None,
            },
        )
        .await;
        assert!(matches!(result, Err(Error::ExternalService { .. })));
        Ok(())
    }
}
