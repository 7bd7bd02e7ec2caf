//! Cart and wishlist row types.

use serde::{Deserialize, Serialize};

use shopfront_core::{CartItemId, Price, ProductId, UserId, WishlistItemId};

use super::{ProductSummary, WishlistProduct};

/// A cart row joined with the product fields the cart displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: CartItemId,
    pub user_id: UserId,
    pub product_id: ProductId,
    /// Always at least 1; a zero quantity removes the row instead.
    pub quantity: u32,
    pub product: ProductSummary,
}

impl CartLine {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price.times(self.quantity)
    }
}

/// A wishlist row joined with the product fields the wishlist displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistLine {
    pub id: WishlistItemId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub product: WishlistProduct,
}
