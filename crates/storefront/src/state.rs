//! The storefront bundle a front end holds for the whole process.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::admin::{AdminGate, ProductAdmin};
use crate::cart::CartManager;
use crate::catalog::Catalog;
use crate::checkout::Checkout;
use crate::config::StorefrontConfig;
use crate::gateway::{Gateway, RestGateway};
use crate::notice::Notifier;
use crate::reviews::ProductReviews;
use crate::session::SessionStore;
use crate::wishlist::WishlistManager;

/// Every manager wired to one gateway and one session.
///
/// Cheaply cloneable via `Arc`. Cart and wishlist follow the session: a
/// sign-in loads them and a sign-out empties them.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: StorefrontConfig,
    notifier: Notifier,
    session: SessionStore,
    catalog: Catalog,
    cart: CartManager,
    wishlist: WishlistManager,
    checkout: Checkout,
    reviews: ProductReviews,
    admin_gate: AdminGate,
    product_admin: ProductAdmin,
    follower: JoinHandle<()>,
}

impl Drop for StorefrontInner {
    fn drop(&mut self) {
        self.follower.abort();
    }
}

impl Storefront {
    /// Connect to the hosted backend named in `config`.
    pub async fn connect(config: StorefrontConfig) -> Self {
        let gateway = Arc::new(RestGateway::new(&config.gateway));
        Self::new(config, gateway).await
    }

    /// Wire every manager to `gateway`, load the current session and, when
    /// signed in, the cart and wishlist.
    pub async fn new<G: Gateway + 'static>(config: StorefrontConfig, gateway: Arc<G>) -> Self {
        let notifier = Notifier::new();
        let session = SessionStore::start(gateway.clone()).await;
        let catalog = Catalog::new(gateway.clone(), config.catalog_cache_ttl);
        let cart = CartManager::new(gateway.clone(), session.clone(), notifier.clone());
        let wishlist = WishlistManager::new(gateway.clone(), session.clone(), notifier.clone());
        let checkout = Checkout::new(
            gateway.clone(),
            cart.clone(),
            session.clone(),
            notifier.clone(),
            config.order_placement,
            config.default_country.clone(),
        );
        let reviews = ProductReviews::new(gateway.clone(), session.clone(), notifier.clone());
        let admin_gate = AdminGate::new(config.admin.clone(), notifier.clone());
        let product_admin = ProductAdmin::new(
            gateway.clone(),
            gateway,
            catalog.clone(),
            notifier.clone(),
            config.product_image_bucket.clone(),
        );

        cart.on_user_changed().await;
        wishlist.on_user_changed().await;
        let follower = tokio::spawn(follow_session(
            session.clone(),
            cart.clone(),
            wishlist.clone(),
        ));

        Self {
            inner: Arc::new(StorefrontInner {
                config,
                notifier,
                session,
                catalog,
                cart,
                wishlist,
                checkout,
                reviews,
                admin_gate,
                product_admin,
                follower,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    #[must_use]
    pub fn cart(&self) -> &CartManager {
        &self.inner.cart
    }

    #[must_use]
    pub fn wishlist(&self) -> &WishlistManager {
        &self.inner.wishlist
    }

    #[must_use]
    pub fn checkout(&self) -> &Checkout {
        &self.inner.checkout
    }

    #[must_use]
    pub fn reviews(&self) -> &ProductReviews {
        &self.inner.reviews
    }

    #[must_use]
    pub fn admin_gate(&self) -> &AdminGate {
        &self.inner.admin_gate
    }

    #[must_use]
    pub fn product_admin(&self) -> &ProductAdmin {
        &self.inner.product_admin
    }
}

/// Reload or reset cart and wishlist whenever the signed-in user changes.
async fn follow_session(session: SessionStore, cart: CartManager, wishlist: WishlistManager) {
    let mut users = session.subscribe();
    let mut current = users.borrow_and_update().as_ref().map(|user| user.id);
    while users.changed().await.is_ok() {
        let next = users.borrow_and_update().as_ref().map(|user| user.id);
        if next == current {
            continue;
        }
        debug!(?next, "Signed-in user changed; syncing cart and wishlist");
        current = next;
        cart.on_user_changed().await;
        wishlist.on_user_changed().await;
    }
}
