//! Storefront read path - the public catalog.
//!
//! `GET /products` hands the full product list to the storefront unchanged. The catalog view
//! does the storefront's filtering on the server: category filter, case-insensitive name
//! search, and either a grouped view (featured category first, then the rest by name) or a
//! flat list sorted by category and product name.

use crate::{
    errors::Result,
    models::{Category, Product},
    store::Store,
};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, collections::HashMap};

/// Category filter value meaning "every category".
pub const ALL_CATEGORIES: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogView {
    #[default]
    Grouped,
    List,
}

/// Query string of `GET /catalog`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogQuery {
    #[serde(default)]
    pub category: Option<String>,
    /// Free-text search over product names
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub view: CatalogView,
}

/// A product as shown in the storefront, with its sale state worked out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    #[serde(flatten)]
    pub product: Product,
    pub on_sale: bool,
    pub effective_price: f64,
}

impl From<Product> for CatalogEntry {
    fn from(product: Product) -> Self {
        Self {
            on_sale: product.is_on_sale(),
            effective_price: product.effective_price(),
            product,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogGroup {
    pub category: Category,
    pub products: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "lowercase")]
pub enum Catalog {
    Grouped { groups: Vec<CatalogGroup> },
    List { products: Vec<CatalogEntry> },
}

pub async fn list_products(store: &Store) -> Result<Vec<Product>> {
    store.list_products().await
}

pub async fn list_categories(store: &Store) -> Result<Vec<Category>> {
    store.list_categories().await
}

/// Loads products and categories and builds the requested catalog view.
pub async fn catalog(store: &Store, featured_category: &str, query: &CatalogQuery) -> Result<Catalog> {
    let products = store.list_products().await?;
    let categories = store.list_categories().await?;
    Ok(build_catalog(products, categories, featured_category, query))
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

/// Pure catalog construction over already-loaded collections.
///
/// In the grouped view, products whose category is unknown are left out and empty groups are
/// omitted. In the list view they sort after every known category.
#[must_use]
pub fn build_catalog(
    products: Vec<Product>,
    mut categories: Vec<Category>,
    featured_category: &str,
    query: &CatalogQuery,
) -> Catalog {
    let category_filter = query
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty() && *c != ALL_CATEGORIES);
    let needle = query
        .q
        .as_deref()
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());

    let mut matching: Vec<Product> = products
        .into_iter()
        .filter(|p| category_filter.is_none_or(|c| p.category == c))
        .filter(|p| {
            needle
                .as_deref()
                .is_none_or(|n| p.name.to_lowercase().contains(n))
        })
        .collect();
    matching.sort_by(|a, b| compare_names(&a.name, &b.name));

    match query.view {
        CatalogView::List => {
            let names: HashMap<&str, &str> = categories
                .iter()
                .map(|c| (c.id.as_str(), c.name.as_str()))
                .collect();
            matching.sort_by(|a, b| {
                match (names.get(a.category.as_str()), names.get(b.category.as_str())) {
                    (Some(x), Some(y)) => compare_names(x, y),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => a.category.cmp(&b.category),
                }
                .then_with(|| compare_names(&a.name, &b.name))
            });
            Catalog::List {
                products: matching.into_iter().map(CatalogEntry::from).collect(),
            }
        }
        CatalogView::Grouped => {
            categories.sort_by(|a, b| {
                (b.id == featured_category)
                    .cmp(&(a.id == featured_category))
                    .then_with(|| compare_names(&a.name, &b.name))
            });

            let mut by_category: HashMap<String, Vec<CatalogEntry>> = HashMap::new();
            for product in matching {
                by_category
                    .entry(product.category.clone())
                    .or_default()
                    .push(CatalogEntry::from(product));
            }

            let groups = categories
                .into_iter()
                .filter_map(|category| {
                    let products = by_category.remove(&category.id)?;
                    Some(CatalogGroup { category, products })
                })
                .collect();
            Catalog::Grouped { groups }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    #![allow(clippy::panic)]
    use super::*;

    fn category(id: &str, name: &str) -> Category {
        Category {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    fn product(id: i64, name: &str, category: &str, promo_price: Option<f64>) -> Product {
        Product {
            id,
            name: name.to_string(),
            description: String::new(),
            price: 1000.0,
            promo_price,
            stock: 5,
            category: category.to_string(),
            image: format!("productos/{id}.jpg"),
            version: 0,
        }
    }

    fn fixtures() -> (Vec<Product>, Vec<Category>) {
        (
            vec![
                product(1, "Medialunas", "facturas", None),
                product(2, "Baguette", "panes", Some(800.0)),
                product(3, "Combo desayuno", "combos", None),
                product(4, "Pan de campo", "panes", None),
                product(5, "Misterio", "sin-categoria", None),
            ],
            vec![
                category("panes", "Panes"),
                category("facturas", "Facturas"),
                category("combos", "Combos"),
                category("tortas", "Tortas"),
            ],
        )
    }

    fn names(entries: &[CatalogEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.product.name.as_str()).collect()
    }

    #[test]
    fn test_grouped_view_puts_featured_first_and_skips_empty() {
        let (products, categories) = fixtures();
        let Catalog::Grouped { groups } =
            build_catalog(products, categories, "combos", &CatalogQuery::default())
        else {
            panic!("expected grouped view");
        };

        let ids: Vec<&str> = groups.iter().map(|g| g.category.id.as_str()).collect();
        assert_eq!(ids, vec!["combos", "facturas", "panes"]);
        assert_eq!(names(&groups[2].products), vec!["Baguette", "Pan de campo"]);
        assert!(groups[2].products[0].on_sale);
        assert_eq!(groups[2].products[0].effective_price, 800.0);
    }

    #[test]
    fn test_list_view_sorted_by_category_then_name() {
        let (products, categories) = fixtures();
        let query = CatalogQuery {
            view: CatalogView::List,
            ..CatalogQuery::default()
        };
        let Catalog::List { products } = build_catalog(products, categories, "combos", &query) else {
            panic!("expected list view");
        };
        assert_eq!(
            names(&products),
            vec!["Combo desayuno", "Medialunas", "Baguette", "Pan de campo", "Misterio"]
        );
    }

    #[test]
    fn test_category_filter_and_search() {
        let (products, categories) = fixtures();
        let query = CatalogQuery {
            category: Some("panes".to_string()),
            q: Some("  CAMPO ".to_string()),
            view: CatalogView::List,
        };
        let Catalog::List { products } = build_catalog(products, categories, "combos", &query) else {
            panic!("expected list view");
        };
        assert_eq!(names(&products), vec!["Pan de campo"]);
    }

    #[test]
    fn test_all_category_means_no_filter() {
        let (products, categories) = fixtures();
        let query = CatalogQuery {
            category: Some(ALL_CATEGORIES.to_string()),
            view: CatalogView::List,
            ..CatalogQuery::default()
        };
        let Catalog::List { products } = build_catalog(products, categories, "combos", &query) else {
            panic!("expected list view");
        };
        assert_eq!(products.len(), 5);
    }

    #[test]
    fn test_catalog_serializes_flat_entries() {
        let entry = CatalogEntry::from(product(2, "Baguette", "panes", Some(800.0)));
        let json = serde_json::to_value(&entry).unwrap_or_default();
        assert_eq!(json["id"], 2);
        assert_eq!(json["on_sale"], true);
        assert_eq!(json["effective_price"], 800.0);
    }
}
