//! Wishlist manager.
//!
//! Same shape as the cart without quantities. A product can be saved once
//! per user; saving it again reports [`WishlistError::AlreadyInWishlist`]
//! rather than a generic failure.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, instrument};

use shopfront_core::{ProductId, UserId};

use crate::gateway::{GatewayError, WishlistGateway};
use crate::models::WishlistLine;
use crate::notice::Notifier;
use crate::session::SessionStore;
use crate::telemetry::add_breadcrumb;

/// Errors from wishlist operations.
#[derive(Debug, Error)]
pub enum WishlistError {
    #[error("Please log in to add items to wishlist")]
    NotSignedIn,

    #[error("Item already in wishlist")]
    AlreadyInWishlist,

    #[error("Wishlist error: {0}")]
    Gateway(#[from] GatewayError),
}

/// Snapshot of the wishlist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WishlistState {
    pub lines: Vec<WishlistLine>,
    pub loading: bool,
}

impl WishlistState {
    /// Whether `product_id` is saved, judged from this snapshot only.
    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.lines.iter().any(|line| line.product_id == product_id)
    }
}

/// The signed-in user's wishlist. Cheap to clone.
#[derive(Clone)]
pub struct WishlistManager {
    inner: Arc<WishlistInner>,
}

struct WishlistInner {
    gateway: Arc<dyn WishlistGateway>,
    session: SessionStore,
    notifier: Notifier,
    state: watch::Sender<WishlistState>,
}

impl WishlistManager {
    #[must_use]
    pub fn new(
        gateway: Arc<dyn WishlistGateway>,
        session: SessionStore,
        notifier: Notifier,
    ) -> Self {
        let (state, _) = watch::channel(WishlistState::default());
        Self {
            inner: Arc::new(WishlistInner {
                gateway,
                session,
                notifier,
                state,
            }),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> WishlistState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<WishlistState> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().loading
    }

    /// Local check against the last fetched rows. May be stale until the
    /// next fetch.
    #[must_use]
    pub fn is_in_wishlist(&self, product_id: ProductId) -> bool {
        self.inner.state.borrow().contains(product_id)
    }

    /// Replace local state with the user's wishlist rows.
    ///
    /// # Errors
    ///
    /// Returns the gateway error; the previous contents are kept.
    #[instrument(skip(self))]
    pub async fn fetch_wishlist_items(&self) -> Result<(), WishlistError> {
        let Some(user) = self.user_id() else {
            return Ok(());
        };

        self.inner.state.send_modify(|state| state.loading = true);
        let result = self.inner.gateway.select_wishlist_lines(user).await;
        self.inner.state.send_modify(|state| {
            state.loading = false;
            if let Ok(lines) = &result {
                state.lines.clone_from(lines);
            }
        });

        result.map(drop).map_err(|e| {
            error!(error = %e, "Error fetching wishlist items");
            e.into()
        })
    }

    /// Save a product.
    ///
    /// # Errors
    ///
    /// Returns `NotSignedIn` before any network call, `AlreadyInWishlist`
    /// when the product is already saved, or the gateway error.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_to_wishlist(&self, product_id: ProductId) -> Result<(), WishlistError> {
        let Some(user) = self.user_id() else {
            self.inner
                .notifier
                .error("Please log in to add items to wishlist");
            return Err(WishlistError::NotSignedIn);
        };

        match self.inner.gateway.insert_wishlist_item(user, product_id).await {
            Ok(()) => {}
            Err(e) if e.is_unique_violation() => {
                self.inner.notifier.error("Item already in wishlist");
                return Err(WishlistError::AlreadyInWishlist);
            }
            Err(e) => {
                error!(error = %e, "Error adding to wishlist");
                self.inner.notifier.error("Failed to add item to wishlist");
                return Err(e.into());
            }
        }

        add_breadcrumb(
            "wishlist",
            "Added to wishlist",
            &[("product_id", &product_id.to_string())],
        );
        self.inner.notifier.success("Item added to wishlist!");
        self.refresh().await;
        Ok(())
    }

    /// Remove a saved product. Does nothing when signed out.
    ///
    /// # Errors
    ///
    /// Returns the gateway error.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_from_wishlist(&self, product_id: ProductId) -> Result<(), WishlistError> {
        let Some(user) = self.user_id() else {
            return Ok(());
        };

        if let Err(e) = self.inner.gateway.delete_wishlist_item(user, product_id).await {
            error!(error = %e, "Error removing from wishlist");
            self.inner
                .notifier
                .error("Failed to remove item from wishlist");
            return Err(e.into());
        }

        add_breadcrumb(
            "wishlist",
            "Removed from wishlist",
            &[("product_id", &product_id.to_string())],
        );
        self.inner.notifier.success("Item removed from wishlist");
        self.refresh().await;
        Ok(())
    }

    /// Remove every saved product and empty local state.
    ///
    /// # Errors
    ///
    /// Returns the gateway error; local state is then left as it was.
    #[instrument(skip(self))]
    pub async fn clear_wishlist(&self) -> Result<(), WishlistError> {
        let Some(user) = self.user_id() else {
            return Ok(());
        };

        if let Err(e) = self.inner.gateway.delete_wishlist_items_for_user(user).await {
            error!(error = %e, "Error clearing wishlist");
            return Err(e.into());
        }

        self.inner.state.send_modify(|state| state.lines.clear());
        self.inner.notifier.success("Wishlist cleared");
        Ok(())
    }

    /// Follow a sign-in or sign-out.
    pub async fn on_user_changed(&self) {
        if self.user_id().is_some() {
            self.refresh().await;
        } else {
            self.inner.state.send_replace(WishlistState::default());
        }
    }

    async fn refresh(&self) {
        let _ = self.fetch_wishlist_items().await;
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
    use shopfront_core::Price;

    use super::*;
    use crate::gateway::{FailPoint, MemoryGateway};
    use crate::models::{NewProduct, Product};
    use crate::notice::{Notice, drain};

    async fn setup() -> (Arc<MemoryGateway>, SessionStore, Notifier, WishlistManager) {
        let gateway = Arc::new(MemoryGateway::new());
        gateway.register_user("shopper@b.co", "pw-1").await;
        let session = SessionStore::start(gateway.clone()).await;
        let notifier = Notifier::new();
        let wishlist = WishlistManager::new(gateway.clone(), session.clone(), notifier.clone());
        (gateway, session, notifier, wishlist)
    }

    async fn lamp(gateway: &MemoryGateway) -> Product {
        gateway
            .seed_product(
                NewProduct {
                    name: "Lamp".to_owned(),
                    description: "Brass desk lamp".to_owned(),
                    price: Price::from_cents(4500).unwrap(),
                    category: "Home".to_owned(),
                    stock: 2,
                    image_url: None,
                },
                Utc::now(),
            )
            .await
    }

    #[tokio::test]
    async fn test_add_requires_sign_in() {
        let (gateway, _, notifier, wishlist) = setup().await;
        let product = lamp(&gateway).await;
        let mut notices = notifier.subscribe();

        assert!(matches!(
            wishlist.add_to_wishlist(product.id).await,
            Err(WishlistError::NotSignedIn)
        ));
        assert_eq!(
            drain(&mut notices),
            vec![Notice::error("Please log in to add items to wishlist")]
        );
    }

    #[tokio::test]
    async fn test_duplicate_add_is_distinct() {
        let (gateway, session, notifier, wishlist) = setup().await;
        session
            .sign_in("shopper@b.co", &SecretString::from("pw-1"))
            .await
            .unwrap();
        let user = session.current_user().unwrap().id;
        let product = lamp(&gateway).await;
        let mut notices = notifier.subscribe();

        wishlist.add_to_wishlist(product.id).await.unwrap();
        assert!(wishlist.is_in_wishlist(product.id));
        assert!(matches!(
            wishlist.add_to_wishlist(product.id).await,
            Err(WishlistError::AlreadyInWishlist)
        ));

        assert_eq!(gateway.wishlist_row_count(user).await, 1);
        assert_eq!(
            drain(&mut notices),
            vec![
                Notice::success("Item added to wishlist!"),
                Notice::error("Item already in wishlist"),
            ]
        );
    }

    #[tokio::test]
    async fn test_other_failures_are_generic() {
        let (gateway, session, notifier, wishlist) = setup().await;
        session
            .sign_in("shopper@b.co", &SecretString::from("pw-1"))
            .await
            .unwrap();
        let product = lamp(&gateway).await;
        let mut notices = notifier.subscribe();

        gateway.fail_on(FailPoint::InsertWishlist).await;
        assert!(matches!(
            wishlist.add_to_wishlist(product.id).await,
            Err(WishlistError::Gateway(_))
        ));
        assert_eq!(
            drain(&mut notices),
            vec![Notice::error("Failed to add item to wishlist")]
        );
    }

    #[tokio::test]
    async fn test_remove_by_product_and_clear() {
        let (gateway, session, _, wishlist) = setup().await;
        session
            .sign_in("shopper@b.co", &SecretString::from("pw-1"))
            .await
            .unwrap();
        let product = lamp(&gateway).await;

        wishlist.add_to_wishlist(product.id).await.unwrap();
        wishlist.remove_from_wishlist(product.id).await.unwrap();
        assert!(!wishlist.is_in_wishlist(product.id));

        wishlist.add_to_wishlist(product.id).await.unwrap();
        wishlist.clear_wishlist().await.unwrap();
        assert!(wishlist.snapshot().lines.is_empty());
    }

    #[tokio::test]
    async fn test_is_in_wishlist_is_local() {
        let (gateway, session, _, wishlist) = setup().await;
        session
            .sign_in("shopper@b.co", &SecretString::from("pw-1"))
            .await
            .unwrap();
        let user = session.current_user().unwrap().id;
        let product = lamp(&gateway).await;

        // A row added behind the manager's back is not seen until a fetch
        gateway.insert_wishlist_item(user, product.id).await.unwrap();
        assert!(!wishlist.is_in_wishlist(product.id));
        wishlist.fetch_wishlist_items().await.unwrap();
        assert!(wishlist.is_in_wishlist(product.id));
    }

    #[tokio::test]
    async fn test_signed_out_remove_is_silent_noop() {
        let (gateway, _, notifier, wishlist) = setup().await;
        let mut notices = notifier.subscribe();
        let calls = gateway.call_count();
        wishlist
            .remove_from_wishlist(ProductId::random())
            .await
            .unwrap();
        assert_eq!(gateway.call_count(), calls);
        assert!(drain(&mut notices).is_empty());
    }
}
