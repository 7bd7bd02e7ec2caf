//! Integration tests for Shopfront.
//!
//! The tests under `tests/` drive a full [`Storefront`] wired to the
//! in-memory gateway, so they run without a hosted backend.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopfront-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_wishlist` - Cart and wishlist row invariants across managers
//! - `checkout` - Order placement, validation and failure modes
//! - `reviews` - Review validation bounds
//! - `admin` - Admin gate and catalog writes

#![allow(clippy::missing_panics_doc)]

use std::sync::Arc;

use chrono::Utc;
use secrecy::SecretString;
use tempfile::TempDir;
use tokio::sync::broadcast;

use shopfront_core::{Price, UserId};
use shopfront_storefront::StorefrontConfig;
use shopfront_storefront::checkout::OrderPlacement;
use shopfront_storefront::config::{AdminConfig, GatewayConfig};
use shopfront_storefront::gateway::MemoryGateway;
use shopfront_storefront::models::{NewProduct, Product};
use shopfront_storefront::notice::{Notice, drain};
use shopfront_storefront::state::Storefront;

pub const SHOPPER_EMAIL: &str = "shopper@example.com";
pub const SHOPPER_PASSWORD: &str = "correct-horse-9";
pub const ADMIN_PASSWORD: &str = "panel-key-42";

/// A storefront over a fresh in-memory backend with one registered shopper.
pub struct TestContext {
    pub gateway: Arc<MemoryGateway>,
    pub store: Storefront,
    notices: broadcast::Receiver<Notice>,
    _scratch: TempDir,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_placement(OrderPlacement::Sequential).await
    }

    pub async fn with_placement(placement: OrderPlacement) -> Self {
        let scratch = TempDir::new().expect("Failed to create scratch dir");
        let mut config = StorefrontConfig::new(GatewayConfig {
            url: "http://memory.gateway".parse().expect("valid URL"),
            anon_key: SecretString::from("anon-key"),
        });
        config.order_placement = placement;
        config.admin = AdminConfig {
            password: Some(SecretString::from(ADMIN_PASSWORD)),
            flag_path: scratch.path().join("admin_access"),
        };

        let gateway = Arc::new(MemoryGateway::new());
        gateway.register_user(SHOPPER_EMAIL, SHOPPER_PASSWORD).await;
        let store = Storefront::new(config, gateway.clone()).await;
        let notices = store.notifier().subscribe();

        Self {
            gateway,
            store,
            notices,
            _scratch: scratch,
        }
    }

    /// Sign the registered shopper in and return their ID.
    pub async fn sign_in(&self) -> UserId {
        self.store
            .session()
            .sign_in(SHOPPER_EMAIL, &SecretString::from(SHOPPER_PASSWORD))
            .await
            .expect("Shopper sign-in failed")
            .id
    }

    /// Add a product priced at `cents` with `stock` units.
    pub async fn seed_product(&self, name: &str, cents: i64, stock: u32) -> Product {
        self.gateway
            .seed_product(
                NewProduct {
                    name: name.to_owned(),
                    description: format!("{name} for testing"),
                    price: Price::from_cents(cents).expect("non-negative price"),
                    category: "Test".to_owned(),
                    stock,
                    image_url: None,
                },
                Utc::now(),
            )
            .await
    }

    /// Notices emitted since the last call.
    pub fn notices(&mut self) -> Vec<Notice> {
        drain(&mut self.notices)
    }
}
