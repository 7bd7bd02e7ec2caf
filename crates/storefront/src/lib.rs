//! Shopfront storefront library.
//!
//! Shopper and admin operations over a hosted backend-as-a-service. The
//! backend owns every durable row, plus auth and object storage; this crate
//! keeps a local mirror of the signed-in shopper's cart and wishlist,
//! sequences checkout, and reports every outcome as a [`notice::Notice`].
//!
//! # Modules
//!
//! - [`gateway`] - Ports to the backend, with the REST adapter
//! - [`session`] - Signed-in user and the auth-change feed
//! - [`catalog`] - Cached product listings, search and detail
//! - [`cart`] / [`wishlist`] - Per-user mirrors of the backend rows
//! - [`checkout`] - Shipping validation and order placement
//! - [`reviews`] - Product reviews
//! - [`admin`] - Admin gate and product management
//! - [`state`] - [`Storefront`], everything wired together
//!
//! # Example
//!
//! ```rust,ignore
//! let config = StorefrontConfig::from_env()?;
//! let _guard = telemetry::init(&config);
//! let store = Storefront::connect(config).await;
//! store.cart().add_to_cart(product_id, 1).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod admin;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod notice;
pub mod reviews;
pub mod session;
pub mod state;
pub mod telemetry;
pub mod wishlist;

pub use config::StorefrontConfig;
pub use error::{Error, Result};
pub use state::Storefront;
