//! Cart manager.
//!
//! Local cart state mirrors the user's `cart_items` rows. Every successful
//! mutation is followed by a full re-fetch, and mutation methods return
//! only after that fetch completes, so the state a caller reads afterwards
//! is the backend's. Clearing is the one exception: it empties local state
//! directly.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, instrument};

use shopfront_core::{CartItemId, Price, ProductId, UserId};

use crate::gateway::{CartGateway, GatewayError};
use crate::models::CartLine;
use crate::notice::Notifier;
use crate::session::SessionStore;
use crate::telemetry::add_breadcrumb;

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("Please log in to add items to cart")]
    NotSignedIn,

    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    #[error("Cart error: {0}")]
    Gateway(#[from] GatewayError),
}

/// Snapshot of the cart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    /// Cart rows joined with product display fields.
    pub lines: Vec<CartLine>,
    /// Whether a fetch is in flight.
    pub loading: bool,
}

impl CartState {
    /// Sum of quantities.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Sum of price times quantity.
    #[must_use]
    pub fn total_price(&self) -> Price {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// The signed-in user's cart. Cheap to clone.
#[derive(Clone)]
pub struct CartManager {
    inner: Arc<CartInner>,
}

struct CartInner {
    gateway: Arc<dyn CartGateway>,
    session: SessionStore,
    notifier: Notifier,
    state: watch::Sender<CartState>,
}

impl CartManager {
    #[must_use]
    pub fn new(gateway: Arc<dyn CartGateway>, session: SessionStore, notifier: Notifier) -> Self {
        let (state, _) = watch::channel(CartState::default());
        Self {
            inner: Arc::new(CartInner {
                gateway,
                session,
                notifier,
                state,
            }),
        }
    }

    /// Current cart contents.
    #[must_use]
    pub fn snapshot(&self) -> CartState {
        self.inner.state.borrow().clone()
    }

    /// Watch the cart change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().loading
    }

    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.inner.state.borrow().total_items()
    }

    #[must_use]
    pub fn total_price(&self) -> Price {
        self.inner.state.borrow().total_price()
    }

    /// Replace local state with the user's cart rows.
    ///
    /// Does nothing when signed out. On failure the error is logged and
    /// the previous contents are kept.
    ///
    /// # Errors
    ///
    /// Returns the gateway error when the fetch fails.
    #[instrument(skip(self))]
    pub async fn fetch_cart_items(&self) -> Result<(), CartError> {
        let Some(user) = self.user_id() else {
            return Ok(());
        };

        self.inner.state.send_modify(|state| state.loading = true);
        let result = self.inner.gateway.select_cart_lines(user).await;
        self.inner.state.send_modify(|state| {
            state.loading = false;
            if let Ok(lines) = &result {
                state.lines.clone_from(lines);
            }
        });

        result.map(drop).map_err(|e| {
            error!(error = %e, "Error fetching cart items");
            e.into()
        })
    }

    /// Add a product, or set its quantity if it is already in the cart.
    ///
    /// The quantity replaces any existing quantity rather than adding to it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuantity` for zero and `NotSignedIn` when signed out,
    /// both before any network call, or the gateway error.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_to_cart(&self, product_id: ProductId, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }
        let Some(user) = self.user_id() else {
            self.inner.notifier.error("Please log in to add items to cart");
            return Err(CartError::NotSignedIn);
        };

        if let Err(e) = self
            .inner
            .gateway
            .upsert_cart_item(user, product_id, quantity)
            .await
        {
            error!(error = %e, "Error adding to cart");
            self.inner.notifier.error("Failed to add item to cart");
            return Err(e.into());
        }

        add_breadcrumb(
            "cart",
            "Added to cart",
            &[
                ("product_id", &product_id.to_string()),
                ("quantity", &quantity.to_string()),
            ],
        );
        self.inner.notifier.success("Item added to cart!");
        self.refresh().await;
        Ok(())
    }

    /// Set a line's quantity. Zero or below removes the line.
    ///
    /// # Errors
    ///
    /// Returns the gateway error.
    #[instrument(skip(self), fields(cart_item_id = %cart_item_id))]
    pub async fn update_quantity(
        &self,
        cart_item_id: CartItemId,
        quantity: i64,
    ) -> Result<(), CartError> {
        if quantity <= 0 {
            return self.remove_from_cart(cart_item_id).await;
        }
        let quantity = u32::try_from(quantity).map_err(|_| CartError::InvalidQuantity)?;

        if let Err(e) = self
            .inner
            .gateway
            .update_cart_quantity(cart_item_id, quantity)
            .await
        {
            error!(error = %e, "Error updating quantity");
            self.inner.notifier.error("Failed to update quantity");
            return Err(e.into());
        }

        self.refresh().await;
        Ok(())
    }

    /// Delete one line.
    ///
    /// # Errors
    ///
    /// Returns the gateway error.
    #[instrument(skip(self), fields(cart_item_id = %cart_item_id))]
    pub async fn remove_from_cart(&self, cart_item_id: CartItemId) -> Result<(), CartError> {
        if let Err(e) = self.inner.gateway.delete_cart_item(cart_item_id).await {
            error!(error = %e, "Error removing from cart");
            self.inner.notifier.error("Failed to remove item from cart");
            return Err(e.into());
        }

        add_breadcrumb(
            "cart",
            "Removed from cart",
            &[("cart_item_id", &cart_item_id.to_string())],
        );
        self.inner.notifier.success("Item removed from cart");
        self.refresh().await;
        Ok(())
    }

    /// Delete every line the user owns and empty local state.
    ///
    /// Does nothing when signed out.
    ///
    /// # Errors
    ///
    /// Returns the gateway error; local state is then left as it was.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<(), CartError> {
        let Some(user) = self.user_id() else {
            return Ok(());
        };

        if let Err(e) = self.inner.gateway.delete_cart_items_for_user(user).await {
            error!(error = %e, "Error clearing cart");
            return Err(e.into());
        }

        self.inner.state.send_modify(|state| state.lines.clear());
        add_breadcrumb("cart", "Cleared cart", &[]);
        self.inner.notifier.success("Cart cleared");
        Ok(())
    }

    /// Follow a sign-in or sign-out: load the new user's cart, or drop the
    /// previous user's lines.
    pub async fn on_user_changed(&self) {
        if self.user_id().is_some() {
            self.refresh().await;
        } else {
            self.inner.state.send_replace(CartState::default());
        }
    }

    /// Re-fetch after a mutation. Failures are already logged.
    async fn refresh(&self) {
        let _ = self.fetch_cart_items().await;
    }

    fn user_id(&self) -> Option<UserId> {
        self.inner.session.current_user().map(|user| user.id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use secrecy::SecretString;

    use super::*;
    use crate::gateway::{FailPoint, MemoryGateway};
    use crate::models::{NewProduct, Product};
    use crate::notice::{Notice, drain};

    struct Fixture {
        gateway: Arc<MemoryGateway>,
        session: SessionStore,
        notifier: Notifier,
        cart: CartManager,
    }

    async fn fixture() -> Fixture {
        let gateway = Arc::new(MemoryGateway::new());
        gateway.register_user("shopper@b.co", "pw-1").await;
        let session = SessionStore::start(gateway.clone()).await;
        let notifier = Notifier::new();
        let cart = CartManager::new(gateway.clone(), session.clone(), notifier.clone());
        Fixture {
            gateway,
            session,
            notifier,
            cart,
        }
    }

    async fn sign_in(fixture: &Fixture) {
        fixture
            .session
            .sign_in("shopper@b.co", &SecretString::from("pw-1"))
            .await
            .unwrap();
    }

    async fn product(gateway: &MemoryGateway, name: &str, cents: i64) -> Product {
        gateway
            .seed_product(
                NewProduct {
                    name: name.to_owned(),
                    description: String::new(),
                    price: Price::from_cents(cents).unwrap(),
                    category: "Misc".to_owned(),
                    stock: 10,
                    image_url: None,
                },
                Utc::now(),
            )
            .await
    }

    #[tokio::test]
    async fn test_add_requires_sign_in() {
        let f = fixture().await;
        let mut notices = f.notifier.subscribe();
        let mug = product(&f.gateway, "Mug", 500).await;
        let calls = f.gateway.call_count();

        let err = f.cart.add_to_cart(mug.id, 1).await.unwrap_err();
        assert!(matches!(err, CartError::NotSignedIn));
        assert_eq!(f.gateway.call_count(), calls);
        assert_eq!(
            drain(&mut notices),
            vec![Notice::error("Please log in to add items to cart")]
        );
    }

    #[tokio::test]
    async fn test_add_zero_is_rejected() {
        let f = fixture().await;
        sign_in(&f).await;
        let mug = product(&f.gateway, "Mug", 500).await;
        assert!(matches!(
            f.cart.add_to_cart(mug.id, 0).await,
            Err(CartError::InvalidQuantity)
        ));
    }

    #[tokio::test]
    async fn test_add_overwrites_quantity() {
        let f = fixture().await;
        sign_in(&f).await;
        let mut notices = f.notifier.subscribe();
        let mug = product(&f.gateway, "Mug", 500).await;

        f.cart.add_to_cart(mug.id, 2).await.unwrap();
        f.cart.add_to_cart(mug.id, 3).await.unwrap();

        let state = f.cart.snapshot();
        assert_eq!(state.lines.len(), 1);
        assert_eq!(state.lines[0].quantity, 3);
        assert_eq!(f.cart.total_items(), 3);
        assert!(!f.cart.is_loading());
        assert_eq!(
            drain(&mut notices),
            vec![
                Notice::success("Item added to cart!"),
                Notice::success("Item added to cart!"),
            ]
        );
    }

    #[tokio::test]
    async fn test_totals() {
        let f = fixture().await;
        sign_in(&f).await;
        let a = product(&f.gateway, "A", 1000).await;
        let b = product(&f.gateway, "B", 550).await;

        f.cart.add_to_cart(a.id, 2).await.unwrap();
        f.cart.add_to_cart(b.id, 3).await.unwrap();

        assert_eq!(f.cart.total_items(), 5);
        assert_eq!(f.cart.total_price(), Price::from_cents(3650).unwrap());
    }

    #[tokio::test]
    async fn test_failed_add_keeps_state_and_notifies() {
        let f = fixture().await;
        sign_in(&f).await;
        let mug = product(&f.gateway, "Mug", 500).await;
        f.cart.add_to_cart(mug.id, 1).await.unwrap();
        let before = f.cart.snapshot();
        let mut notices = f.notifier.subscribe();

        f.gateway.fail_on(FailPoint::UpsertCart).await;
        assert!(matches!(
            f.cart.add_to_cart(mug.id, 4).await,
            Err(CartError::Gateway(_))
        ));
        assert_eq!(f.cart.snapshot(), before);
        assert_eq!(
            drain(&mut notices),
            vec![Notice::error("Failed to add item to cart")]
        );
    }

    #[tokio::test]
    async fn test_update_to_zero_or_below_removes() {
        let f = fixture().await;
        sign_in(&f).await;
        let user = f.session.current_user().unwrap().id;
        let mug = product(&f.gateway, "Mug", 500).await;
        let pen = product(&f.gateway, "Pen", 100).await;
        f.cart.add_to_cart(mug.id, 2).await.unwrap();
        f.cart.add_to_cart(pen.id, 2).await.unwrap();

        let lines = f.cart.snapshot().lines;
        f.cart.update_quantity(lines[0].id, 0).await.unwrap();
        f.cart.update_quantity(lines[1].id, -3).await.unwrap();

        assert!(f.cart.snapshot().is_empty());
        assert_eq!(f.gateway.cart_row_count(user).await, 0);
    }

    #[tokio::test]
    async fn test_update_sets_quantity() {
        let f = fixture().await;
        sign_in(&f).await;
        let mug = product(&f.gateway, "Mug", 500).await;
        f.cart.add_to_cart(mug.id, 1).await.unwrap();
        let id = f.cart.snapshot().lines[0].id;

        f.cart.update_quantity(id, 7).await.unwrap();
        assert_eq!(f.cart.snapshot().lines[0].quantity, 7);
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_stale_state() {
        let f = fixture().await;
        sign_in(&f).await;
        let mug = product(&f.gateway, "Mug", 500).await;
        f.cart.add_to_cart(mug.id, 1).await.unwrap();

        f.gateway.fail_on(FailPoint::SelectCart).await;
        assert!(f.cart.fetch_cart_items().await.is_err());
        assert_eq!(f.cart.snapshot().lines.len(), 1);
        assert!(!f.cart.is_loading());
    }

    #[tokio::test]
    async fn test_clear_cart() {
        let f = fixture().await;
        sign_in(&f).await;
        let user = f.session.current_user().unwrap().id;
        let mug = product(&f.gateway, "Mug", 500).await;
        f.cart.add_to_cart(mug.id, 2).await.unwrap();
        let mut notices = f.notifier.subscribe();

        f.cart.clear_cart().await.unwrap();
        assert_eq!(f.cart.total_items(), 0);
        assert_eq!(f.cart.total_price(), Price::ZERO);
        assert_eq!(f.gateway.cart_row_count(user).await, 0);
        assert_eq!(drain(&mut notices), vec![Notice::success("Cart cleared")]);
    }

    #[tokio::test]
    async fn test_failed_clear_is_silent_and_keeps_lines() {
        let f = fixture().await;
        sign_in(&f).await;
        let mug = product(&f.gateway, "Mug", 500).await;
        f.cart.add_to_cart(mug.id, 2).await.unwrap();
        let mut notices = f.notifier.subscribe();

        f.gateway.fail_on(FailPoint::ClearCart).await;
        assert!(f.cart.clear_cart().await.is_err());
        assert_eq!(f.cart.total_items(), 2);
        assert!(drain(&mut notices).is_empty());
    }

    #[tokio::test]
    async fn test_signed_out_fetch_and_clear_are_noops() {
        let f = fixture().await;
        let calls = f.gateway.call_count();
        f.cart.fetch_cart_items().await.unwrap();
        f.cart.clear_cart().await.unwrap();
        assert_eq!(f.gateway.call_count(), calls);
    }

    #[tokio::test]
    async fn test_sign_out_drops_lines() {
        let f = fixture().await;
        sign_in(&f).await;
        let mug = product(&f.gateway, "Mug", 500).await;
        f.cart.add_to_cart(mug.id, 2).await.unwrap();

        f.session.sign_out().await;
        f.cart.on_user_changed().await;
        assert!(f.cart.snapshot().is_empty());
    }
}
