//! Order types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopfront_core::{OrderId, OrderStatus, PaymentMethod, Price, ProductId, UserId};

use super::CartLine;

/// Shipping address snapshot stored on the order row.
///
/// Serialized in camelCase to match the JSON column written by the web
/// checkout form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

/// An order header as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub total_amount: Price,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub shipping_address: Option<ShippingAddress>,
    pub created_at: DateTime<Utc>,
}

/// Fields for a new order header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub user_id: UserId,
    pub total_amount: Price,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub shipping_address: Option<ShippingAddress>,
}

/// One line of an order before the header exists.
///
/// The unit price is captured from the cart at checkout time and never
/// follows later product price changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Price,
}

impl From<&CartLine> for OrderLine {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id,
            quantity: line.quantity,
            price: line.product.price,
        }
    }
}

/// An order line bound to its order header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Price,
}

impl NewOrderItem {
    /// Attach `line` to `order_id`.
    #[must_use]
    pub const fn for_order(order_id: OrderId, line: &OrderLine) -> Self {
        Self {
            order_id,
            product_id: line.product_id,
            quantity: line.quantity,
            price: line.price,
        }
    }
}
