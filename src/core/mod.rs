//! Core business logic - framework-agnostic shop operations.
//!
//! Every function takes the [`Store`](crate::store::Store) (and whatever collaborator it
//! needs) explicitly, so the HTTP layer stays a thin translation of requests into these calls.

/// Category creation (slug ids) and guarded deletion
pub mod category;
/// Cart pricing, manual orders and hosted-payment preferences
pub mod checkout;
/// Contact form validation and delivery
pub mod contact;
/// Order listing and status transitions
pub mod order;
/// Product CRUD with image side effects
pub mod product;
/// Public catalog views
pub mod storefront;
