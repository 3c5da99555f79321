//! Order administration: listing and status changes.
//!
//! Orders are created only by checkout. The admin moves them along
//! `pending → processing → shipped → delivered`, or cancels a pending one; nothing else
//! about a placed order ever changes.

use crate::{
    errors::{Error, Result},
    models::{Order, OrderStatus},
    store::Store,
};
use tracing::{info, instrument};

pub async fn list_orders(store: &Store) -> Result<Vec<Order>> {
    store.list_orders().await
}

/// Retrieves an order by id.
///
/// # Errors
/// Returns [`Error::NotFound`] if no order has this id.
pub async fn get_order(store: &Store, id: &str) -> Result<Order> {
    store
        .get_order(id)
        .await?
        .ok_or_else(|| Error::not_found("Order", id))
}

/// Moves an order to `status`.
///
/// When `expected_version` is given it must match the stored version, so an admin acting on a
/// stale view gets a conflict instead of silently overriding someone else's change.
///
/// # Errors
/// - [`Error::NotFound`] if the order does not exist
/// - [`Error::Validation`] if the transition is not allowed
/// - [`Error::Conflict`] if the version check fails
#[instrument(skip(store))]
pub async fn update_order_status(
    store: &Store,
    id: &str,
    status: OrderStatus,
    expected_version: Option<u32>,
) -> Result<Order> {
    let current = get_order(store, id).await?;

    if expected_version.is_some_and(|v| v != current.version) {
        return Err(Error::Conflict {
            entity: "Order",
            id: id.to_string(),
        });
    }

    if !current.status.can_transition_to(status) {
        return Err(Error::validation(format!(
            "Cannot change order status from {} to {status}",
            current.status
        )));
    }

    let previous = current.status;
    let updated = store.update_order(Order { status, ..current }).await?;
    info!("Order {} moved from {} to {}", updated.id, previous, updated.status);
    Ok(updated)
}
