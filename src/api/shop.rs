//! Public routes: catalog reads, the contact form and both checkout flows.

use crate::{
    api::AppState,
    core::{
        checkout::{self, OrderSubmission, PlacedOrder, PreferenceSubmission},
        contact::{self, ContactMessage},
        storefront::{self, Catalog, CatalogQuery},
    },
    errors::Result,
    models::{Category, Product},
    payment::Preference,
};
use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde_json::json;
use std::sync::Arc;

type JsonBody<T> = std::result::Result<Json<T>, JsonRejection>;

pub async fn ping() -> &'static str {
    "pong"
}

pub async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    storefront::list_products(&state.store).await.map(Json)
}

pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    storefront::list_categories(&state.store).await.map(Json)
}

/// `GET /catalog?category=&q=&view=grouped|list`
pub async fn catalog(
    State(state): State<AppState>,
    query: std::result::Result<Query<CatalogQuery>, QueryRejection>,
) -> Result<Json<Catalog>> {
    let Query(query) = query?;
    storefront::catalog(&state.store, &state.config.shop.featured_category, &query)
        .await
        .map(Json)
}

pub async fn contact(
    State(state): State<AppState>,
    payload: JsonBody<ContactMessage>,
) -> Result<Json<serde_json::Value>> {
    let Json(message) = payload?;
    contact::send_contact_message(state.mailer.as_ref(), &state.config, message).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Message sent, we will get back to you soon",
    })))
}

/// `POST /api/submit-order`: the manual checkout that ends in WhatsApp.
pub async fn submit_order(
    State(state): State<AppState>,
    payload: JsonBody<OrderSubmission>,
) -> Result<(StatusCode, Json<PlacedOrder>)> {
    let Json(submission) = payload?;
    let placed = checkout::place_order(
        &state.store,
        Arc::clone(&state.mailer),
        &state.config,
        submission,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(placed)))
}

/// `POST /create-preference`: the hosted-payment checkout.
pub async fn create_preference(
    State(state): State<AppState>,
    payload: JsonBody<PreferenceSubmission>,
) -> Result<(StatusCode, Json<Preference>)> {
    let Json(submission) = payload?;
    let preference = checkout::create_preference(
        &state.store,
        state.gateway.as_ref(),
        &state.config,
        submission,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(preference)))
}
