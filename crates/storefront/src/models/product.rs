//! Product catalog types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopfront_core::{Price, ProductId};

/// A product as listed in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Price,
    /// Free-text category label, e.g. "Electronics".
    pub category: String,
    pub stock: u32,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Whether at least one unit can be ordered.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// Fields for a new product row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub category: String,
    pub stock: u32,
    pub image_url: Option<String>,
}

/// Partial update of a product row. `None` leaves a column unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Price>,
    pub category: Option<String>,
    pub stock: Option<u32>,
    pub image_url: Option<String>,
}

impl ProductUpdate {
    /// Whether the update would change nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.category.is_none()
            && self.stock.is_none()
            && self.image_url.is_none()
    }
}

/// Product listing filter. Results are always newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ProductQuery {
    /// Exact category match.
    pub category: Option<String>,
    /// Case-insensitive substring over name, description and category.
    pub search: Option<String>,
    /// Maximum rows to return.
    pub limit: Option<usize>,
}

impl ProductQuery {
    /// All products.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Products in one category.
    #[must_use]
    pub fn in_category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            ..Self::default()
        }
    }

    /// Products matching a search term.
    #[must_use]
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: Some(term.into()),
            ..Self::default()
        }
    }

    /// Whether `product` satisfies the category and search filters.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        let category_ok = self
            .category
            .as_ref()
            .is_none_or(|category| &product.category == category);
        let search_ok = self.search.as_ref().is_none_or(|term| {
            let term = term.to_lowercase();
            [&product.name, &product.description, &product.category]
                .iter()
                .any(|field| field.to_lowercase().contains(&term))
        });
        category_ok && search_ok
    }
}

/// Product fields joined onto cart rows for display and totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub name: String,
    pub price: Price,
    pub image_url: Option<String>,
}

/// Product fields joined onto wishlist rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistProduct {
    pub name: String,
    pub price: Price,
    pub image_url: Option<String>,
    pub description: String,
    pub stock: u32,
}
