//! Domain models for the storefront.
//!
//! These mirror the hosted backend's tables after joins and decoding; the
//! wire shapes live with the REST adapter.

mod cart;
mod order;
mod product;
mod review;
mod session;
mod user;

pub use cart::{CartLine, WishlistLine};
pub use order::{NewOrder, NewOrderItem, Order, OrderLine, ShippingAddress};
pub use product::{
    NewProduct, Product, ProductQuery, ProductSummary, ProductUpdate, WishlistProduct,
};
pub use review::{NewReview, ProductReview, ReviewerProfile};
pub use session::{AuthChange, AuthSession, SignUp};
pub use user::User;
