//! Category business logic.
//!
//! A category's id is a slug derived from its display name: lowercased, diacritics stripped,
//! and every run of characters other than letters and digits replaced by a single `-`
//! (`"Panes Dulces"` -> `"panes-dulces"`, `"Pan/Dulce"` -> `"pan-dulce"`,
//! `"Pastelería"` -> `"pasteleria"`). Ids are unique, and a category cannot be removed while a
//! product still points at it.

use crate::{
    errors::{Error, Result},
    models::Category,
    store::Store,
};
use tracing::{info, instrument};
use unicode_normalization::UnicodeNormalization;

/// Derives the category id for a display name.
#[must_use]
pub fn slugify(name: &str) -> String {
    let folded = name
        .nfd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .collect::<String>()
        .to_lowercase();

    // Anything that is not a letter or digit separates words
    folded
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

pub async fn list_categories(store: &Store) -> Result<Vec<Category>> {
    store.list_categories().await
}

/// Creates a category named `name`.
///
/// # Errors
/// Returns a validation error if the name is blank or its slug is already taken.
#[instrument(skip(store))]
pub async fn create_category(store: &Store, name: &str) -> Result<Category> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("Category name cannot be empty"));
    }

    let id = slugify(name);
    if id.is_empty() {
        return Err(Error::validation(format!(
            "Category name '{name}' does not produce a usable id"
        )));
    }

    let category = store
        .insert_category(Category {
            id,
            name: name.to_string(),
        })
        .await?;
    info!("Created category {}", category.id);
    Ok(category)
}

/// Deletes a category that no product references.
///
/// # Errors
/// Returns a validation error if the category is still in use, or not found if it does not exist.
#[instrument(skip(store))]
pub async fn delete_category(store: &Store, id: &str) -> Result<Category> {
    let removed = store.remove_category(id).await?;
    info!("Deleted category {}", removed.id);
    Ok(removed)
}
