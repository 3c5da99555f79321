//! Product business logic - admin create, update and delete, including the image files.
//!
//! Input arrives as raw form fields (the admin panel posts `multipart/form-data`), so parsing
//! and validation live here rather than in the HTTP layer. Image side effects are ordered
//! around the store write:
//! - a new image is written before the record is persisted, and removed again if that fails;
//! - a replaced or deleted image is removed only after the record change has been persisted.
//!
//! A failed write therefore never leaves a product pointing at a missing file.

use crate::{
    errors::{Error, Result},
    models::Product,
    store::{NewProduct, Store},
    uploads::UploadStore,
};
use tracing::{info, instrument, warn};

/// Raw text fields of the product form. `None` means the field was not sent.
#[derive(Debug, Clone, Default)]
pub struct ProductForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub promo_price: Option<String>,
    pub stock: Option<String>,
    pub category: Option<String>,
    /// Version the editor loaded; when given, the update fails if the product moved on since
    pub version: Option<String>,
}

/// An uploaded image file.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

fn parse_amount(field: &str, raw: &str) -> Result<f64> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| Error::validation(format!("{field} must be a number, got '{raw}'")))?;
    if !value.is_finite() || value < 0.0 {
        return Err(Error::validation(format!(
            "{field} must be a non-negative number, got '{raw}'"
        )));
    }
    Ok(value)
}

/// Parses the promo price field; an empty value means "no promotion".
fn parse_promo(raw: &str) -> Result<Option<f64>> {
    if raw.trim().is_empty() {
        Ok(None)
    } else {
        parse_amount("Promo price", raw).map(Some)
    }
}

fn parse_stock(raw: &str) -> Result<u32> {
    raw.trim().parse().map_err(|_| {
        Error::validation(format!("Stock must be a whole number of at least 0, got '{raw}'"))
    })
}

fn parse_version(raw: &str) -> Result<u32> {
    raw.trim()
        .parse()
        .map_err(|_| Error::validation(format!("Invalid version '{raw}'")))
}

fn required_name(raw: &str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(Error::validation("Product name cannot be empty"));
    }
    Ok(name.to_string())
}

async fn ensure_category_exists(store: &Store, id: &str) -> Result<()> {
    if store.get_category(id).await?.is_none() {
        return Err(Error::validation(format!("Category '{id}' does not exist")));
    }
    Ok(())
}

pub async fn list_products(store: &Store) -> Result<Vec<Product>> {
    store.list_products().await
}

/// Retrieves a product by id.
///
/// # Errors
/// Returns [`Error::NotFound`] if no product has this id.
pub async fn get_product(store: &Store, id: i64) -> Result<Product> {
    store
        .get_product(id)
        .await?
        .ok_or_else(|| Error::not_found("Product", id))
}

/// Creates a product from the admin form. Name, price, category and image are required;
/// stock defaults to 0.
///
/// # Errors
/// Returns a validation error, without touching storage, if any field is missing or invalid
/// or the category does not exist.
#[instrument(skip(store, uploads, form, image))]
pub async fn create_product(
    store: &Store,
    uploads: &UploadStore,
    form: ProductForm,
    image: Option<ImageUpload>,
) -> Result<Product> {
    let name = required_name(form.name.as_deref().unwrap_or_default())?;
    let price = parse_amount(
        "Price",
        form.price
            .as_deref()
            .ok_or_else(|| Error::validation("Price is required"))?,
    )?;
    let promo_price = form.promo_price.as_deref().map(parse_promo).transpose()?.flatten();
    let stock = form
        .stock
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(parse_stock)
        .transpose()?
        .unwrap_or(0);
    let category = form
        .category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| Error::validation("Category is required"))?;
    let image = image.ok_or_else(|| Error::validation("Product image is required"))?;
    ensure_category_exists(store, &category).await?;

    let image_path = uploads
        .save(image.file_name.as_deref(), &image.bytes)
        .await?;

    let new_product = NewProduct {
        name,
        description: form.description.unwrap_or_default().trim().to_string(),
        price,
        promo_price,
        stock,
        category,
        image: image_path.clone(),
    };

    match store.insert_product(new_product).await {
        Ok(product) => {
            info!("Created product {} ({})", product.id, product.name);
            Ok(product)
        }
        Err(e) => {
            warn!("Product insert failed, discarding uploaded image: {}", e);
            uploads.remove_best_effort(&image_path).await;
            Err(e)
        }
    }
}

/// Merges the supplied form fields over the stored product. Fields that were not sent keep
/// their stored value; an empty promo price clears the promotion. Without a new image the
/// stored image path is kept.
///
/// # Errors
/// - [`Error::NotFound`] if the product does not exist
/// - [`Error::Conflict`] if `form.version` is given and stale, or another write won the race
/// - [`Error::Validation`] for invalid fields or an unknown category
#[instrument(skip(store, uploads, form, image))]
pub async fn update_product(
    store: &Store,
    uploads: &UploadStore,
    id: i64,
    form: ProductForm,
    image: Option<ImageUpload>,
) -> Result<Product> {
    let current = get_product(store, id).await?;

    if let Some(raw) = form.version.as_deref().filter(|v| !v.trim().is_empty()) {
        if parse_version(raw)? != current.version {
            return Err(Error::Conflict {
                entity: "Product",
                id: id.to_string(),
            });
        }
    }

    let mut updated = current.clone();
    if let Some(name) = form.name.as_deref() {
        updated.name = required_name(name)?;
    }
    if let Some(description) = form.description {
        updated.description = description.trim().to_string();
    }
    if let Some(price) = form.price.as_deref() {
        updated.price = parse_amount("Price", price)?;
    }
    if let Some(promo) = form.promo_price.as_deref() {
        updated.promo_price = parse_promo(promo)?;
    }
    if let Some(stock) = form.stock.as_deref() {
        updated.stock = parse_stock(stock)?;
    }
    if let Some(category) = form.category.as_deref() {
        let category = category.trim();
        if category != current.category {
            ensure_category_exists(store, category).await?;
        }
        updated.category = category.to_string();
    }

    let new_image = match image {
        Some(image) => Some(
            uploads
                .save(image.file_name.as_deref(), &image.bytes)
                .await?,
        ),
        None => None,
    };
    if let Some(path) = &new_image {
        updated.image.clone_from(path);
    }

    match store.update_product(updated).await {
        Ok(product) => {
            if new_image.is_some() && current.image != product.image {
                uploads.remove_best_effort(&current.image).await;
            }
            info!("Updated product {} to version {}", product.id, product.version);
            Ok(product)
        }
        Err(e) => {
            if let Some(path) = &new_image {
                warn!("Product update failed, discarding uploaded image: {}", e);
                uploads.remove_best_effort(path).await;
            }
            Err(e)
        }
    }
}

/// Deletes a product, then its image file (best effort).
///
/// # Errors
/// Returns [`Error::NotFound`] if the product does not exist.
#[instrument(skip(store, uploads))]
pub async fn delete_product(store: &Store, uploads: &UploadStore, id: i64) -> Result<Product> {
    let removed = store.remove_product(id).await?;
    uploads.remove_best_effort(&removed.image).await;
    info!("Deleted product {} ({})", removed.id, removed.name);
    Ok(removed)
}
