//! Admin routes under `/api/admin`. Everything except `/verify` sits behind [`require_admin`].

use crate::{
    api::{AppState, ClientKey},
    auth::Credential,
    core::{
        category, order,
        product::{self, ImageUpload, ProductForm},
    },
    errors::{Error, Result},
    models::{Category, Order, OrderStatus, Product},
};
use axum::{
    Json,
    extract::{
        Multipart, Path, Request, State,
        multipart::MultipartError,
        rejection::JsonRejection,
    },
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
}

/// Middleware admitting only requests that pass the password gate.
pub async fn require_admin(
    State(state): State<AppState>,
    ClientKey(client): ClientKey,
    request: Request,
    next: Next,
) -> Result<Response> {
    state
        .auth
        .authorize(&client, authorization(request.headers()))
        .await?;
    Ok(next.run(request).await)
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    password: Option<String>,
}

/// `POST /api/admin/verify`: exchanges the password for a session token.
pub async fn verify(
    State(state): State<AppState>,
    ClientKey(client): ClientKey,
    payload: std::result::Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(body) = payload?;
    let session = state
        .auth
        .login(&client, body.password.as_deref())
        .await?;
    Ok(Json(json!({
        "success": true,
        "token": session.token,
        "expires_at": session.expires_at,
    }))
    .into_response())
}

/// `DELETE /api/admin/session`: revokes the bearer token the request was made with.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Json<serde_json::Value> {
    let revoked = match authorization(&headers).and_then(Credential::parse) {
        Some(Credential::Session(token)) => state.auth.logout(token).await,
        _ => false,
    };
    Json(json!({ "success": revoked }))
}

fn parse_product_id(raw: &str) -> Result<i64> {
    raw.parse()
        .map_err(|_| Error::not_found("Product", raw))
}

fn form_error(e: &MultipartError) -> Error {
    Error::validation(format!("Invalid form data: {}", e.body_text()))
}

/// Reads the product form fields and the optional `image` file part.
/// An empty file part (no file chosen in the browser) counts as no image.
async fn read_product_form(mut multipart: Multipart) -> Result<(ProductForm, Option<ImageUpload>)> {
    let mut form = ProductForm::default();
    let mut image = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| form_error(&e))? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            let file_name = field.file_name().map(str::to_string);
            let bytes = field.bytes().await.map_err(|e| form_error(&e))?;
            if !bytes.is_empty() {
                image = Some(ImageUpload {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            continue;
        }

        let slot = match name.as_str() {
            "name" => &mut form.name,
            "description" => &mut form.description,
            "price" => &mut form.price,
            "promo_price" | "promoPrice" => &mut form.promo_price,
            "stock" => &mut form.stock,
            "category" => &mut form.category,
            "version" => &mut form.version,
            _ => {
                debug!("Ignoring unknown form field '{}'", name);
                continue;
            }
        };
        *slot = Some(field.text().await.map_err(|e| form_error(&e))?);
    }

    Ok((form, image))
}

pub async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    product::list_products(&state.store).await.map(Json)
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>> {
    product::get_product(&state.store, parse_product_id(&id)?)
        .await
        .map(Json)
}

pub async fn create_product(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Product>)> {
    let (form, image) = read_product_form(multipart).await?;
    let created = product::create_product(&state.store, &state.uploads, form, image).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Product>> {
    let id = parse_product_id(&id)?;
    let (form, image) = read_product_form(multipart).await?;
    product::update_product(&state.store, &state.uploads, id, form, image)
        .await
        .map(Json)
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let removed = product::delete_product(&state.store, &state.uploads, parse_product_id(&id)?).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Product deleted",
        "product": removed,
    })))
}

pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    category::list_categories(&state.store).await.map(Json)
}

#[derive(Debug, Deserialize)]
pub struct NewCategoryRequest {
    #[serde(default)]
    name: String,
}

pub async fn create_category(
    State(state): State<AppState>,
    payload: std::result::Result<Json<NewCategoryRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Category>)> {
    let Json(body) = payload?;
    let created = category::create_category(&state.store, &body.name).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let removed = category::delete_category(&state.store, &id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Category deleted",
        "category": removed,
    })))
}

pub async fn list_orders(State(state): State<AppState>) -> Result<Json<Vec<Order>>> {
    order::list_orders(&state.store).await.map(Json)
}

#[derive(Debug, Deserialize)]
pub struct OrderStatusRequest {
    status: String,
    #[serde(default)]
    version: Option<u32>,
}

pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<OrderStatusRequest>, JsonRejection>,
) -> Result<Json<Order>> {
    let Json(body) = payload?;
    let status: OrderStatus = body.status.parse()?;
    order::update_order_status(&state.store, &id, status, body.version)
        .await
        .map(Json)
}
