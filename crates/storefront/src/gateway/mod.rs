//! Remote Data Gateway ports.
//!
//! The hosted backend owns every durable row: products, carts, wishlists,
//! orders and reviews, plus auth and object storage. Managers talk to it
//! only through the traits below, one per concern, so each can be backed by
//! the live REST surface ([`RestGateway`]) or by the in-process
//! [`MemoryGateway`] in tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use shopfront_storefront::gateway::{CartGateway, RestGateway};
//!
//! let gateway = Arc::new(RestGateway::new(&config.gateway));
//! let lines = gateway.select_cart_lines(user.id).await?;
//! ```

#[cfg(any(test, feature = "test-support"))]
mod memory;
mod rest;

#[cfg(any(test, feature = "test-support"))]
pub use memory::{FailPoint, MemoryGateway};
pub use rest::RestGateway;

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;
use tokio::sync::broadcast;

use shopfront_core::{CartItemId, Email, OrderId, ProductId, UserId};

use crate::models::{
    AuthChange, AuthSession, CartLine, NewOrder, NewOrderItem, NewProduct, NewReview, Order,
    OrderLine, Product, ProductQuery, ProductReview, ProductUpdate, SignUp, WishlistLine,
};

/// Backend error code for a unique-constraint violation.
pub const UNIQUE_VIOLATION: &str = "23505";

/// Errors that can occur when talking to the hosted backend.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A row decoded but holds a value the domain rejects.
    #[error("Invalid row: {0}")]
    Decode(String),

    /// The backend rejected the request.
    #[error("Remote error: {0}")]
    Remote(RemoteError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or rejected credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),
}

impl GatewayError {
    /// Whether the backend refused a duplicate on a uniqueness constraint.
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::Remote(e) if e.code.as_deref() == Some(UNIQUE_VIOLATION))
    }

    /// The backend's error code, when it sent one.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Remote(e) => e.code.as_deref(),
            _ => None,
        }
    }
}

/// Error body returned by the backend's REST, auth or storage endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteError {
    /// HTTP status code.
    pub status: u16,
    /// Backend error code, e.g. `23505`.
    pub code: Option<String>,
    /// Human-readable message.
    pub message: String,
    /// Extra detail, e.g. the conflicting key.
    pub details: Option<String>,
    /// Suggested fix.
    pub hint: Option<String>,
}

impl RemoteError {
    /// An error with only a status and message.
    #[must_use]
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            ..Self::default()
        }
    }

    /// Attach a backend error code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(code) = &self.code {
            write!(f, " [{code}]")?;
        }
        if self.message.is_empty() {
            f.write_str(": (no error details provided)")?;
        } else {
            write!(f, ": {}", self.message)?;
        }
        if let Some(details) = &self.details {
            write!(f, " ({details})")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " hint: {hint}")?;
        }
        Ok(())
    }
}

// =============================================================================
// Ports
// =============================================================================

/// Sign-in, sign-up and the auth-state-change feed.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Exchange email and password for a session.
    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthSession, GatewayError>;

    /// Register a new account.
    async fn sign_up(&self, email: &Email, password: &SecretString)
    -> Result<SignUp, GatewayError>;

    /// End the current session.
    async fn sign_out(&self) -> Result<(), GatewayError>;

    /// The session the client currently holds, if any.
    async fn current_session(&self) -> Result<Option<AuthSession>, GatewayError>;

    /// Subscribe to auth-state changes.
    fn subscribe(&self) -> broadcast::Receiver<AuthChange>;
}

/// Product table access.
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// Products matching `query`, newest first.
    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, GatewayError>;

    /// One product by ID. Returns `NotFound` when no row matches.
    async fn get_product(&self, id: ProductId) -> Result<Product, GatewayError>;

    async fn insert_product(&self, product: &NewProduct) -> Result<Product, GatewayError>;

    async fn update_product(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, GatewayError>;

    async fn delete_product(&self, id: ProductId) -> Result<(), GatewayError>;
}

/// Cart table access. Rows are unique per `(user_id, product_id)`.
#[async_trait]
pub trait CartGateway: Send + Sync {
    /// The user's cart rows joined with product name, price and image.
    async fn select_cart_lines(&self, user: UserId) -> Result<Vec<CartLine>, GatewayError>;

    /// Insert a row, or overwrite the quantity of the existing row for the
    /// same user and product.
    async fn upsert_cart_item(
        &self,
        user: UserId,
        product: ProductId,
        quantity: u32,
    ) -> Result<(), GatewayError>;

    async fn update_cart_quantity(&self, id: CartItemId, quantity: u32)
    -> Result<(), GatewayError>;

    async fn delete_cart_item(&self, id: CartItemId) -> Result<(), GatewayError>;

    async fn delete_cart_items_for_user(&self, user: UserId) -> Result<(), GatewayError>;
}

/// Wishlist table access. A duplicate insert fails with [`UNIQUE_VIOLATION`].
#[async_trait]
pub trait WishlistGateway: Send + Sync {
    /// The user's wishlist rows joined with product display fields.
    async fn select_wishlist_lines(&self, user: UserId)
    -> Result<Vec<WishlistLine>, GatewayError>;

    async fn insert_wishlist_item(
        &self,
        user: UserId,
        product: ProductId,
    ) -> Result<(), GatewayError>;

    async fn delete_wishlist_item(
        &self,
        user: UserId,
        product: ProductId,
    ) -> Result<(), GatewayError>;

    async fn delete_wishlist_items_for_user(&self, user: UserId) -> Result<(), GatewayError>;
}

/// Order and order-item table access.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Insert an order header and return it with its generated ID.
    async fn insert_order(&self, order: &NewOrder) -> Result<Order, GatewayError>;

    /// Batch insert order lines.
    async fn insert_order_items(&self, items: &[NewOrderItem]) -> Result<(), GatewayError>;

    /// Insert the header and all lines in one all-or-nothing call.
    async fn place_order_atomic(
        &self,
        order: &NewOrder,
        lines: &[OrderLine],
    ) -> Result<Order, GatewayError>;

    /// The user's orders, newest first.
    async fn list_orders(&self, user: UserId) -> Result<Vec<Order>, GatewayError>;

    /// Lines of one order.
    async fn list_order_items(&self, order: OrderId) -> Result<Vec<NewOrderItem>, GatewayError>;
}

/// Review table access.
#[async_trait]
pub trait ReviewGateway: Send + Sync {
    /// Reviews for a product with the reviewer profile, newest first.
    async fn select_reviews(&self, product: ProductId)
    -> Result<Vec<ProductReview>, GatewayError>;

    async fn insert_review(&self, review: &NewReview) -> Result<(), GatewayError>;
}

/// Object storage for product images.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Upload `bytes` to `bucket/path`.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), GatewayError>;

    /// Public URL of an object.
    fn public_url(&self, bucket: &str, path: &str) -> String;
}

/// Every port at once, implemented by each full backend adapter.
pub trait Gateway:
    AuthGateway
    + CatalogGateway
    + CartGateway
    + WishlistGateway
    + OrderGateway
    + ReviewGateway
    + ObjectStorage
{
}

impl<T> Gateway for T where
    T: AuthGateway
        + CatalogGateway
        + CartGateway
        + WishlistGateway
        + OrderGateway
        + ReviewGateway
        + ObjectStorage
{
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_detected_by_code() {
        let err = GatewayError::Remote(
            RemoteError::new(409, "duplicate key value violates unique constraint")
                .with_code(UNIQUE_VIOLATION),
        );
        assert!(err.is_unique_violation());
        assert_eq!(err.code(), Some("23505"));

        let other = GatewayError::Remote(RemoteError::new(500, "boom").with_code("XX000"));
        assert!(!other.is_unique_violation());
        assert!(!GatewayError::NotFound("product".into()).is_unique_violation());
    }

    #[test]
    fn test_remote_error_display() {
        let mut err = RemoteError::new(409, "duplicate key").with_code("23505");
        err.details = Some("Key (user_id, product_id) already exists.".into());
        assert_eq!(
            err.to_string(),
            "HTTP 409 [23505]: duplicate key (Key (user_id, product_id) already exists.)"
        );
        assert_eq!(
            RemoteError::new(500, "").to_string(),
            "HTTP 500: (no error details provided)"
        );
    }
}
