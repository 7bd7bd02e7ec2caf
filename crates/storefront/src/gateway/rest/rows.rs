//! Wire shapes of the backend's tables and their conversion to domain
//! models.
//!
//! `numeric` columns arrive as JSON numbers and are written back as numbers.
//! Integer columns are signed on the wire; negative values are rejected
//! while decoding.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shopfront_core::{OrderStatus, PaymentMethod, Price, Rating};

use crate::gateway::{GatewayError, RemoteError};
use crate::models::{
    CartLine, NewOrder, NewOrderItem, NewProduct, NewReview, Order, OrderLine, Product,
    ProductReview, ProductSummary, ProductUpdate, ReviewerProfile, ShippingAddress, User,
    WishlistLine, WishlistProduct,
};

/// Projection for cart reads.
pub const CART_SELECT: &str = "id,user_id,product_id,quantity,products(name,price,image_url)";
/// Projection for wishlist reads.
pub const WISHLIST_SELECT: &str =
    "id,user_id,product_id,products(name,price,image_url,description,stock)";
/// Projection for review reads.
pub const REVIEW_SELECT: &str = "*,profiles:user_id(email,full_name)";

fn price(value: Decimal, column: &str) -> Result<Price, GatewayError> {
    Price::new(value).map_err(|e| GatewayError::Decode(format!("{column}: {e}")))
}

fn count(value: i64, column: &str) -> Result<u32, GatewayError> {
    u32::try_from(value)
        .map_err(|_| GatewayError::Decode(format!("{column} out of range: {value}")))
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub category: Option<String>,
    pub stock: i64,
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = GatewayError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            name: row.name,
            description: row.description.unwrap_or_default(),
            price: price(row.price, "products.price")?,
            category: row.category.unwrap_or_default(),
            stock: count(row.stock, "products.stock")?,
            image_url: row.image_url,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ProductInsert<'a> {
    pub name: &'a str,
    pub description: &'a str,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub category: &'a str,
    pub stock: u32,
    pub image_url: Option<&'a str>,
}

impl<'a> From<&'a NewProduct> for ProductInsert<'a> {
    fn from(product: &'a NewProduct) -> Self {
        Self {
            name: &product.name,
            description: &product.description,
            price: product.price.amount(),
            category: &product.category,
            stock: product.stock,
            image_url: product.image_url.as_deref(),
        }
    }
}

/// Only the columns being changed are serialized.
#[derive(Debug, Serialize)]
pub struct ProductPatch<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<&'a str>,
}

impl<'a> From<&'a ProductUpdate> for ProductPatch<'a> {
    fn from(update: &'a ProductUpdate) -> Self {
        Self {
            name: update.name.as_deref(),
            description: update.description.as_deref(),
            price: update.price.map(|p| p.amount()),
            category: update.category.as_deref(),
            stock: update.stock,
            image_url: update.image_url.as_deref(),
        }
    }
}

// =============================================================================
// Cart and wishlist
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct JoinedProductRow {
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub stock: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CartRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
    /// `None` when the product was deleted after the row was created.
    pub products: Option<JoinedProductRow>,
}

impl CartRow {
    /// Convert to a cart line, or `None` when the joined product is gone.
    pub fn into_line(self) -> Result<Option<CartLine>, GatewayError> {
        let Some(product) = self.products else {
            return Ok(None);
        };
        Ok(Some(CartLine {
            id: self.id.into(),
            user_id: self.user_id.into(),
            product_id: self.product_id.into(),
            quantity: count(self.quantity, "cart_items.quantity")?,
            product: ProductSummary {
                name: product.name,
                price: price(product.price, "products.price")?,
                image_url: product.image_url,
            },
        }))
    }
}

#[derive(Debug, Serialize)]
pub struct CartUpsert {
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub struct QuantityPatch {
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct WishlistRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub products: Option<JoinedProductRow>,
}

impl WishlistRow {
    /// Convert to a wishlist line, or `None` when the joined product is gone.
    pub fn into_line(self) -> Result<Option<WishlistLine>, GatewayError> {
        let Some(product) = self.products else {
            return Ok(None);
        };
        Ok(Some(WishlistLine {
            id: self.id.into(),
            user_id: self.user_id.into(),
            product_id: self.product_id.into(),
            product: WishlistProduct {
                name: product.name,
                price: price(product.price, "products.price")?,
                image_url: product.image_url,
                description: product.description.unwrap_or_default(),
                stock: count(product.stock.unwrap_or_default(), "products.stock")?,
            },
        }))
    }
}

#[derive(Debug, Serialize)]
pub struct WishlistInsert {
    pub user_id: Uuid,
    pub product_id: Uuid,
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct OrderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = GatewayError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            user_id: row.user_id.into(),
            total_amount: price(row.total_amount, "orders.total_amount")?,
            status: row.status,
            payment_method: row.payment_method,
            shipping_address: row.shipping_address,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct OrderInsert<'a> {
    pub user_id: Uuid,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub shipping_address: Option<&'a ShippingAddress>,
}

impl<'a> From<&'a NewOrder> for OrderInsert<'a> {
    fn from(order: &'a NewOrder) -> Self {
        Self {
            user_id: order.user_id.into(),
            total_amount: order.total_amount.amount(),
            status: order.status,
            payment_method: order.payment_method,
            shipping_address: order.shipping_address.as_ref(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderItemRow {
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

impl From<&NewOrderItem> for OrderItemRow {
    fn from(item: &NewOrderItem) -> Self {
        Self {
            order_id: item.order_id.into(),
            product_id: item.product_id.into(),
            quantity: i64::from(item.quantity),
            price: item.price.amount(),
        }
    }
}

impl TryFrom<OrderItemRow> for NewOrderItem {
    type Error = GatewayError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            order_id: row.order_id.into(),
            product_id: row.product_id.into(),
            quantity: count(row.quantity, "order_items.quantity")?,
            price: price(row.price, "order_items.price")?,
        })
    }
}

/// Arguments of the `place_order` stored function.
#[derive(Debug, Serialize)]
pub struct PlaceOrderArgs<'a> {
    #[serde(rename = "p_order")]
    pub order: OrderInsert<'a>,
    #[serde(rename = "p_items")]
    pub items: Vec<PlaceOrderLine>,
}

#[derive(Debug, Serialize)]
pub struct PlaceOrderLine {
    pub product_id: Uuid,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

impl From<&OrderLine> for PlaceOrderLine {
    fn from(line: &OrderLine) -> Self {
        Self {
            product_id: line.product_id.into(),
            quantity: line.quantity,
            price: line.price.amount(),
        }
    }
}

// =============================================================================
// Reviews
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ProfileRow {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub profiles: Option<ProfileRow>,
}

impl TryFrom<ReviewRow> for ProductReview {
    type Error = GatewayError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        let rating = Rating::new(row.rating)
            .map_err(|e| GatewayError::Decode(format!("product_reviews.rating: {e}")))?;
        let profile = row.profiles.unwrap_or_default();
        Ok(Self {
            id: row.id.into(),
            product_id: row.product_id.into(),
            user_id: row.user_id.into(),
            rating,
            comment: row.comment,
            created_at: row.created_at,
            reviewer: ReviewerProfile {
                email: profile.email,
                full_name: profile.full_name,
            },
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ReviewInsert<'a> {
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub rating: i32,
    pub comment: &'a str,
}

impl<'a> From<&'a NewReview> for ReviewInsert<'a> {
    fn from(review: &'a NewReview) -> Self {
        Self {
            product_id: review.product_id.into(),
            user_id: review.user_id.into(),
            rating: review.rating.into(),
            comment: review.comment.as_str(),
        }
    }
}

// =============================================================================
// Auth
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct AuthUserRow {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_confirmed_at: Option<DateTime<Utc>>,
}

impl From<AuthUserRow> for User {
    fn from(row: AuthUserRow) -> Self {
        Self {
            id: row.id.into(),
            email: row.email.unwrap_or_default(),
            email_verified: row.email_confirmed_at.is_some(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUserRow,
}

/// Sign-up answers with a session when confirmation is disabled and with
/// the bare user otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SignUpResponse {
    Session(TokenResponse),
    User(AuthUserRow),
}

#[derive(Debug, Serialize)]
pub struct PasswordCredentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Error body shared by the REST, auth and storage endpoints, each of which
/// names its fields slightly differently.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<serde_json::Value>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl ErrorBody {
    /// Convert to a [`RemoteError`] for an HTTP `status`.
    pub fn into_remote(self, status: u16) -> RemoteError {
        let code = self.error_code.or_else(|| match self.code {
            Some(serde_json::Value::String(code)) => Some(code),
            _ => None,
        });
        let message = self
            .message
            .or(self.msg)
            .or(self.error_description)
            .or(self.error)
            .unwrap_or_default();
        RemoteError {
            status,
            code,
            message,
            details: self.details,
            hint: self.hint,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_product_row_decodes_numeric_price() {
        let row: ProductRow = serde_json::from_str(
            r#"{"id":"6f1c1f3e-2a8e-4c57-9d8e-1d2b3c4d5e6f","name":"Mug","description":null,
                "price":12.5,"category":"Kitchen","stock":4,"image_url":null,
                "created_at":"2024-05-01T10:00:00+00:00"}"#,
        )
        .unwrap();
        let product = Product::try_from(row).unwrap();
        assert_eq!(product.price.amount(), Decimal::new(125, 1));
        assert_eq!(product.description, "");
        assert_eq!(product.stock, 4);
    }

    #[test]
    fn test_negative_stock_is_rejected() {
        let row: ProductRow = serde_json::from_str(
            r#"{"id":"6f1c1f3e-2a8e-4c57-9d8e-1d2b3c4d5e6f","name":"Mug","price":1,
                "stock":-1,"created_at":"2024-05-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert!(matches!(
            Product::try_from(row),
            Err(GatewayError::Decode(_))
        ));
    }

    #[test]
    fn test_cart_row_without_product_is_skipped() {
        let row: CartRow = serde_json::from_str(
            r#"{"id":"6f1c1f3e-2a8e-4c57-9d8e-1d2b3c4d5e6f",
                "user_id":"6f1c1f3e-2a8e-4c57-9d8e-1d2b3c4d5e60",
                "product_id":"6f1c1f3e-2a8e-4c57-9d8e-1d2b3c4d5e61",
                "quantity":2,"products":null}"#,
        )
        .unwrap();
        assert!(row.into_line().unwrap().is_none());
    }

    #[test]
    fn test_order_insert_writes_number_and_codes() {
        let order = NewOrder {
            user_id: shopfront_core::UserId::random(),
            total_amount: Price::from_cents(3650).unwrap(),
            status: OrderStatus::Pending,
            payment_method: PaymentMethod::CashOnDelivery,
            shipping_address: None,
        };
        let json = serde_json::to_value(OrderInsert::from(&order)).unwrap();
        assert_eq!(json["total_amount"], serde_json::json!(36.5));
        assert_eq!(json["status"], "pending");
        assert_eq!(json["payment_method"], "cod");
    }

    #[test]
    fn test_product_patch_skips_unchanged_columns() {
        let update = ProductUpdate {
            stock: Some(0),
            ..ProductUpdate::default()
        };
        let json = serde_json::to_string(&ProductPatch::from(&update)).unwrap();
        assert_eq!(json, r#"{"stock":0}"#);
    }

    #[test]
    fn test_sign_up_response_variants() {
        let user: SignUpResponse = serde_json::from_str(
            r#"{"id":"6f1c1f3e-2a8e-4c57-9d8e-1d2b3c4d5e6f","email":"a@b.co"}"#,
        )
        .unwrap();
        assert!(matches!(user, SignUpResponse::User(_)));

        let session: SignUpResponse = serde_json::from_str(
            r#"{"access_token":"t","user":{"id":"6f1c1f3e-2a8e-4c57-9d8e-1d2b3c4d5e6f",
                "email":"a@b.co","email_confirmed_at":"2024-05-01T10:00:00Z"}}"#,
        )
        .unwrap();
        assert!(matches!(session, SignUpResponse::Session(_)));
    }

    #[test]
    fn test_error_body_shapes() {
        let rest: ErrorBody =
            serde_json::from_str(r#"{"code":"23505","message":"dup","details":"k"}"#).unwrap();
        let rest = rest.into_remote(409);
        assert_eq!(rest.code.as_deref(), Some("23505"));
        assert_eq!(rest.details.as_deref(), Some("k"));

        let auth: ErrorBody = serde_json::from_str(
            r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#,
        )
        .unwrap();
        let auth = auth.into_remote(400);
        assert_eq!(auth.code.as_deref(), Some("invalid_credentials"));
        assert_eq!(auth.message, "Invalid login credentials");

        let legacy: ErrorBody =
            serde_json::from_str(r#"{"error":"invalid_grant","error_description":"bad"}"#)
                .unwrap();
        assert_eq!(legacy.into_remote(400).message, "bad");
    }
}
