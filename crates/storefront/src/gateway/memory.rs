//! In-process gateway for tests.
//!
//! Keeps every table in memory and honours the same contracts as the live
//! backend: cart rows are unique per `(user, product)` with upsert
//! overwriting the quantity, a duplicate wishlist insert fails with
//! [`UNIQUE_VIOLATION`], rows referencing a missing product or order fail
//! with a foreign-key error, and listings come back newest first.
//!
//! Any operation can be made to fail with [`MemoryGateway::fail_on`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{Mutex, broadcast};

use shopfront_core::{
    CartItemId, Email, OrderId, ProductId, ReviewId, UserId, WishlistItemId,
};

use super::{
    AuthGateway, CartGateway, CatalogGateway, GatewayError, ObjectStorage, OrderGateway,
    RemoteError, ReviewGateway, UNIQUE_VIOLATION, WishlistGateway,
};
use crate::models::{
    AuthChange, AuthSession, CartLine, NewOrder, NewOrderItem, NewProduct, NewReview, Order,
    OrderLine, Product, ProductQuery, ProductReview, ProductSummary, ProductUpdate,
    ReviewerProfile, SignUp, User, WishlistLine, WishlistProduct,
};

/// Backend error code for a foreign-key violation.
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// An operation that can be forced to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    SignIn,
    SignUp,
    SignOut,
    CurrentSession,
    ListProducts,
    GetProduct,
    InsertProduct,
    UpdateProduct,
    DeleteProduct,
    SelectCart,
    UpsertCart,
    UpdateCartQuantity,
    DeleteCartItem,
    ClearCart,
    SelectWishlist,
    InsertWishlist,
    DeleteWishlist,
    ClearWishlist,
    InsertOrder,
    InsertOrderItems,
    PlaceOrderAtomic,
    ListOrders,
    SelectReviews,
    InsertReview,
    Upload,
}

struct Account {
    user: User,
    password: String,
}

struct CartRow {
    id: CartItemId,
    user_id: UserId,
    product_id: ProductId,
    quantity: u32,
}

struct WishlistRow {
    id: WishlistItemId,
    user_id: UserId,
    product_id: ProductId,
}

struct StoredProduct {
    seq: u64,
    product: Product,
}

struct StoredReview {
    seq: u64,
    review: NewReview,
    id: ReviewId,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    seq: u64,
    accounts: HashMap<String, Account>,
    session: Option<AuthSession>,
    products: Vec<StoredProduct>,
    cart_items: Vec<CartRow>,
    wishlist_items: Vec<WishlistRow>,
    orders: Vec<(u64, Order)>,
    order_items: Vec<NewOrderItem>,
    reviews: Vec<StoredReview>,
    objects: HashMap<String, Vec<u8>>,
}

impl Tables {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn product(&self, id: ProductId) -> Option<&Product> {
        self.products
            .iter()
            .map(|stored| &stored.product)
            .find(|product| product.id == id)
    }

    fn require_product(&self, id: ProductId) -> Result<&Product, GatewayError> {
        self.product(id)
            .ok_or_else(|| foreign_key(&format!("product {id} does not exist")))
    }

    fn profile(&self, user: UserId) -> ReviewerProfile {
        ReviewerProfile {
            email: self
                .accounts
                .values()
                .find(|account| account.user.id == user)
                .map(|account| account.user.email.clone()),
            full_name: None,
        }
    }
}

fn foreign_key(details: &str) -> GatewayError {
    let mut error = RemoteError::new(409, "insert or update violates foreign key constraint")
        .with_code(FOREIGN_KEY_VIOLATION);
    error.details = Some(details.to_owned());
    GatewayError::Remote(error)
}

/// In-memory implementation of every gateway port.
#[derive(Clone)]
pub struct MemoryGateway {
    inner: Arc<MemoryGatewayInner>,
}

struct MemoryGatewayInner {
    tables: Mutex<Tables>,
    failures: Mutex<HashSet<FailPoint>>,
    confirm_email: AtomicBool,
    calls: AtomicUsize,
    auth_events: broadcast::Sender<AuthChange>,
    base_url: String,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGateway {
    #[must_use]
    pub fn new() -> Self {
        let (auth_events, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(MemoryGatewayInner {
                tables: Mutex::new(Tables::default()),
                failures: Mutex::new(HashSet::new()),
                confirm_email: AtomicBool::new(false),
                calls: AtomicUsize::new(0),
                auth_events,
                base_url: "http://memory.gateway".to_owned(),
            }),
        }
    }

    // =========================================================================
    // Test controls
    // =========================================================================

    /// Make every later call of `point` fail with a remote error.
    pub async fn fail_on(&self, point: FailPoint) {
        self.inner.failures.lock().await.insert(point);
    }

    /// Undo [`Self::fail_on`].
    pub async fn recover(&self, point: FailPoint) {
        self.inner.failures.lock().await.remove(&point);
    }

    /// Require email confirmation on sign-up instead of signing in.
    pub fn require_email_confirmation(&self, required: bool) {
        self.inner.confirm_email.store(required, Ordering::SeqCst);
    }

    /// Number of port calls made so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    /// Create a confirmed account without signing in.
    pub async fn register_user(&self, email: &str, password: &str) -> User {
        let user = User {
            id: UserId::random(),
            email: email.to_owned(),
            email_verified: true,
        };
        self.inner.tables.lock().await.accounts.insert(
            email.to_owned(),
            Account {
                user: user.clone(),
                password: password.to_owned(),
            },
        );
        user
    }

    /// Publish an auth change as if it came from another client.
    pub fn emit(&self, change: AuthChange) {
        let _ = self.inner.auth_events.send(change);
    }

    /// Insert a product with an explicit creation time.
    pub async fn seed_product(&self, product: NewProduct, created_at: DateTime<Utc>) -> Product {
        let mut tables = self.inner.tables.lock().await;
        let product = Product {
            id: ProductId::random(),
            name: product.name,
            description: product.description,
            price: product.price,
            category: product.category,
            stock: product.stock,
            image_url: product.image_url,
            created_at,
        };
        let seq = tables.next_seq();
        tables.products.push(StoredProduct {
            seq,
            product: product.clone(),
        });
        product
    }

    /// Every order row, oldest first.
    pub async fn orders(&self) -> Vec<Order> {
        let tables = self.inner.tables.lock().await;
        tables.orders.iter().map(|(_, order)| order.clone()).collect()
    }

    /// Every order-item row.
    pub async fn order_items(&self) -> Vec<NewOrderItem> {
        self.inner.tables.lock().await.order_items.clone()
    }

    /// Number of cart rows a user owns.
    pub async fn cart_row_count(&self, user: UserId) -> usize {
        let tables = self.inner.tables.lock().await;
        tables.cart_items.iter().filter(|row| row.user_id == user).count()
    }

    /// Number of wishlist rows a user owns.
    pub async fn wishlist_row_count(&self, user: UserId) -> usize {
        let tables = self.inner.tables.lock().await;
        tables
            .wishlist_items
            .iter()
            .filter(|row| row.user_id == user)
            .count()
    }

    /// Stored object bytes.
    pub async fn object(&self, bucket: &str, path: &str) -> Option<Vec<u8>> {
        let tables = self.inner.tables.lock().await;
        tables.objects.get(&format!("{bucket}/{path}")).cloned()
    }

    /// Count the call and apply any injected failure.
    async fn enter(&self, point: FailPoint) -> Result<(), GatewayError> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.failures.lock().await.contains(&point) {
            return Err(GatewayError::Remote(
                RemoteError::new(503, format!("injected failure: {point:?}")).with_code("PGRST000"),
            ));
        }
        Ok(())
    }

    /// The signed-in user's ID, if any.
    pub async fn signed_in_user(&self) -> Option<UserId> {
        let tables = self.inner.tables.lock().await;
        tables.session.as_ref().map(|session| session.user.id)
    }

    fn session_for(user: &User) -> AuthSession {
        AuthSession {
            access_token: SecretString::from(format!("memory-token-{}", user.id)),
            refresh_token: None,
            expires_at: None,
            user: user.clone(),
        }
    }
}

#[async_trait]
impl AuthGateway for MemoryGateway {
    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthSession, GatewayError> {
        self.enter(FailPoint::SignIn).await?;
        let session = {
            let mut tables = self.inner.tables.lock().await;
            let account = tables
                .accounts
                .get(email.as_str())
                .filter(|account| account.password == password.expose_secret())
                .ok_or_else(|| GatewayError::Unauthorized("Invalid login credentials".into()))?;
            let session = Self::session_for(&account.user);
            tables.session = Some(session.clone());
            session
        };
        self.emit(AuthChange::SignedIn(session.user.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<SignUp, GatewayError> {
        self.enter(FailPoint::SignUp).await?;
        let confirm = self.inner.confirm_email.load(Ordering::SeqCst);
        let outcome = {
            let mut tables = self.inner.tables.lock().await;
            if tables.accounts.contains_key(email.as_str()) {
                return Err(GatewayError::Remote(
                    RemoteError::new(422, "User already registered").with_code("user_already_exists"),
                ));
            }
            let user = User {
                id: UserId::random(),
                email: email.as_str().to_owned(),
                email_verified: !confirm,
            };
            tables.accounts.insert(
                email.as_str().to_owned(),
                Account {
                    user: user.clone(),
                    password: password.expose_secret().to_owned(),
                },
            );
            if confirm {
                SignUp::ConfirmationRequired(user)
            } else {
                let session = Self::session_for(&user);
                tables.session = Some(session.clone());
                SignUp::SignedIn(session)
            }
        };
        if let SignUp::SignedIn(session) = &outcome {
            self.emit(AuthChange::SignedIn(session.user.clone()));
        }
        Ok(outcome)
    }

    async fn sign_out(&self) -> Result<(), GatewayError> {
        let result = self.enter(FailPoint::SignOut).await;
        self.inner.tables.lock().await.session = None;
        self.emit(AuthChange::SignedOut);
        result
    }

    async fn current_session(&self) -> Result<Option<AuthSession>, GatewayError> {
        self.enter(FailPoint::CurrentSession).await?;
        Ok(self.inner.tables.lock().await.session.clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.inner.auth_events.subscribe()
    }
}

#[async_trait]
impl CatalogGateway for MemoryGateway {
    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, GatewayError> {
        self.enter(FailPoint::ListProducts).await?;
        let tables = self.inner.tables.lock().await;
        let mut matching: Vec<&StoredProduct> = tables
            .products
            .iter()
            .filter(|stored| query.matches(&stored.product))
            .collect();
        matching.sort_by(|a, b| {
            (b.product.created_at, b.seq).cmp(&(a.product.created_at, a.seq))
        });
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(matching
            .into_iter()
            .take(limit)
            .map(|stored| stored.product.clone())
            .collect())
    }

    async fn get_product(&self, id: ProductId) -> Result<Product, GatewayError> {
        self.enter(FailPoint::GetProduct).await?;
        let tables = self.inner.tables.lock().await;
        tables
            .product(id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("Product not found: {id}")))
    }

    async fn insert_product(&self, product: &NewProduct) -> Result<Product, GatewayError> {
        self.enter(FailPoint::InsertProduct).await?;
        Ok(self.seed_product(product.clone(), Utc::now()).await)
    }

    async fn update_product(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, GatewayError> {
        self.enter(FailPoint::UpdateProduct).await?;
        let mut tables = self.inner.tables.lock().await;
        let product = tables
            .products
            .iter_mut()
            .map(|stored| &mut stored.product)
            .find(|product| product.id == id)
            .ok_or_else(|| GatewayError::NotFound(format!("Product not found: {id}")))?;
        if let Some(name) = &update.name {
            product.name.clone_from(name);
        }
        if let Some(description) = &update.description {
            product.description.clone_from(description);
        }
        if let Some(price) = update.price {
            product.price = price;
        }
        if let Some(category) = &update.category {
            product.category.clone_from(category);
        }
        if let Some(stock) = update.stock {
            product.stock = stock;
        }
        if let Some(image_url) = &update.image_url {
            product.image_url = Some(image_url.clone());
        }
        Ok(product.clone())
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), GatewayError> {
        self.enter(FailPoint::DeleteProduct).await?;
        let mut tables = self.inner.tables.lock().await;
        tables.products.retain(|stored| stored.product.id != id);
        Ok(())
    }
}

#[async_trait]
impl CartGateway for MemoryGateway {
    async fn select_cart_lines(&self, user: UserId) -> Result<Vec<CartLine>, GatewayError> {
        self.enter(FailPoint::SelectCart).await?;
        let tables = self.inner.tables.lock().await;
        Ok(tables
            .cart_items
            .iter()
            .filter(|row| row.user_id == user)
            .filter_map(|row| {
                let product = tables.product(row.product_id)?;
                Some(CartLine {
                    id: row.id,
                    user_id: row.user_id,
                    product_id: row.product_id,
                    quantity: row.quantity,
                    product: ProductSummary {
                        name: product.name.clone(),
                        price: product.price,
                        image_url: product.image_url.clone(),
                    },
                })
            })
            .collect())
    }

    async fn upsert_cart_item(
        &self,
        user: UserId,
        product: ProductId,
        quantity: u32,
    ) -> Result<(), GatewayError> {
        self.enter(FailPoint::UpsertCart).await?;
        let mut tables = self.inner.tables.lock().await;
        tables.require_product(product)?;
        if let Some(row) = tables
            .cart_items
            .iter_mut()
            .find(|row| row.user_id == user && row.product_id == product)
        {
            row.quantity = quantity;
        } else {
            tables.cart_items.push(CartRow {
                id: CartItemId::random(),
                user_id: user,
                product_id: product,
                quantity,
            });
        }
        Ok(())
    }

    async fn update_cart_quantity(&self, id: CartItemId, quantity: u32) -> Result<(), GatewayError> {
        self.enter(FailPoint::UpdateCartQuantity).await?;
        let mut tables = self.inner.tables.lock().await;
        if let Some(row) = tables.cart_items.iter_mut().find(|row| row.id == id) {
            row.quantity = quantity;
        }
        Ok(())
    }

    async fn delete_cart_item(&self, id: CartItemId) -> Result<(), GatewayError> {
        self.enter(FailPoint::DeleteCartItem).await?;
        self.inner
            .tables
            .lock()
            .await
            .cart_items
            .retain(|row| row.id != id);
        Ok(())
    }

    async fn delete_cart_items_for_user(&self, user: UserId) -> Result<(), GatewayError> {
        self.enter(FailPoint::ClearCart).await?;
        self.inner
            .tables
            .lock()
            .await
            .cart_items
            .retain(|row| row.user_id != user);
        Ok(())
    }
}

#[async_trait]
impl WishlistGateway for MemoryGateway {
    async fn select_wishlist_lines(&self, user: UserId) -> Result<Vec<WishlistLine>, GatewayError> {
        self.enter(FailPoint::SelectWishlist).await?;
        let tables = self.inner.tables.lock().await;
        Ok(tables
            .wishlist_items
            .iter()
            .filter(|row| row.user_id == user)
            .filter_map(|row| {
                let product = tables.product(row.product_id)?;
                Some(WishlistLine {
                    id: row.id,
                    user_id: row.user_id,
                    product_id: row.product_id,
                    product: WishlistProduct {
                        name: product.name.clone(),
                        price: product.price,
                        image_url: product.image_url.clone(),
                        description: product.description.clone(),
                        stock: product.stock,
                    },
                })
            })
            .collect())
    }

    async fn insert_wishlist_item(&self, user: UserId, product: ProductId) -> Result<(), GatewayError> {
        self.enter(FailPoint::InsertWishlist).await?;
        let mut tables = self.inner.tables.lock().await;
        tables.require_product(product)?;
        if tables
            .wishlist_items
            .iter()
            .any(|row| row.user_id == user && row.product_id == product)
        {
            let mut error = RemoteError::new(
                409,
                "duplicate key value violates unique constraint \"wishlist_items_user_id_product_id_key\"",
            )
            .with_code(UNIQUE_VIOLATION);
            error.details = Some(format!(
                "Key (user_id, product_id)=({user}, {product}) already exists."
            ));
            return Err(GatewayError::Remote(error));
        }
        tables.wishlist_items.push(WishlistRow {
            id: WishlistItemId::random(),
            user_id: user,
            product_id: product,
        });
        Ok(())
    }

    async fn delete_wishlist_item(&self, user: UserId, product: ProductId) -> Result<(), GatewayError> {
        self.enter(FailPoint::DeleteWishlist).await?;
        self.inner
            .tables
            .lock()
            .await
            .wishlist_items
            .retain(|row| !(row.user_id == user && row.product_id == product));
        Ok(())
    }

    async fn delete_wishlist_items_for_user(&self, user: UserId) -> Result<(), GatewayError> {
        self.enter(FailPoint::ClearWishlist).await?;
        self.inner
            .tables
            .lock()
            .await
            .wishlist_items
            .retain(|row| row.user_id != user);
        Ok(())
    }
}

impl MemoryGateway {
    fn store_order(tables: &mut Tables, order: &NewOrder) -> Order {
        let stored = Order {
            id: OrderId::random(),
            user_id: order.user_id,
            total_amount: order.total_amount,
            status: order.status,
            payment_method: order.payment_method,
            shipping_address: order.shipping_address.clone(),
            created_at: Utc::now(),
        };
        let seq = tables.next_seq();
        tables.orders.push((seq, stored.clone()));
        stored
    }
}

#[async_trait]
impl OrderGateway for MemoryGateway {
    async fn insert_order(&self, order: &NewOrder) -> Result<Order, GatewayError> {
        self.enter(FailPoint::InsertOrder).await?;
        let mut tables = self.inner.tables.lock().await;
        Ok(Self::store_order(&mut tables, order))
    }

    async fn insert_order_items(&self, items: &[NewOrderItem]) -> Result<(), GatewayError> {
        self.enter(FailPoint::InsertOrderItems).await?;
        let mut tables = self.inner.tables.lock().await;
        // A batch insert is all-or-nothing on its own
        for item in items {
            if !tables.orders.iter().any(|(_, order)| order.id == item.order_id) {
                return Err(foreign_key(&format!("order {} does not exist", item.order_id)));
            }
            tables.require_product(item.product_id)?;
        }
        tables.order_items.extend_from_slice(items);
        Ok(())
    }

    async fn place_order_atomic(
        &self,
        order: &NewOrder,
        lines: &[OrderLine],
    ) -> Result<Order, GatewayError> {
        self.enter(FailPoint::PlaceOrderAtomic).await?;
        let mut tables = self.inner.tables.lock().await;
        for line in lines {
            tables.require_product(line.product_id)?;
        }
        let stored = Self::store_order(&mut tables, order);
        tables.order_items.extend(
            lines
                .iter()
                .map(|line| NewOrderItem::for_order(stored.id, line)),
        );
        Ok(stored)
    }

    async fn list_orders(&self, user: UserId) -> Result<Vec<Order>, GatewayError> {
        self.enter(FailPoint::ListOrders).await?;
        let tables = self.inner.tables.lock().await;
        let mut orders: Vec<&(u64, Order)> = tables
            .orders
            .iter()
            .filter(|(_, order)| order.user_id == user)
            .collect();
        orders.sort_by(|(a_seq, a), (b_seq, b)| (b.created_at, b_seq).cmp(&(a.created_at, a_seq)));
        Ok(orders.into_iter().map(|(_, order)| order.clone()).collect())
    }

    async fn list_order_items(&self, order: OrderId) -> Result<Vec<NewOrderItem>, GatewayError> {
        self.enter(FailPoint::ListOrders).await?;
        let tables = self.inner.tables.lock().await;
        Ok(tables
            .order_items
            .iter()
            .filter(|item| item.order_id == order)
            .copied()
            .collect())
    }
}

#[async_trait]
impl ReviewGateway for MemoryGateway {
    async fn select_reviews(&self, product: ProductId) -> Result<Vec<ProductReview>, GatewayError> {
        self.enter(FailPoint::SelectReviews).await?;
        let tables = self.inner.tables.lock().await;
        let mut reviews: Vec<&StoredReview> = tables
            .reviews
            .iter()
            .filter(|stored| stored.review.product_id == product)
            .collect();
        reviews.sort_by(|a, b| (b.created_at, b.seq).cmp(&(a.created_at, a.seq)));
        Ok(reviews
            .into_iter()
            .map(|stored| ProductReview {
                id: stored.id,
                product_id: stored.review.product_id,
                user_id: stored.review.user_id,
                rating: stored.review.rating,
                comment: stored.review.comment.as_str().to_owned(),
                created_at: stored.created_at,
                reviewer: tables.profile(stored.review.user_id),
            })
            .collect())
    }

    async fn insert_review(&self, review: &NewReview) -> Result<(), GatewayError> {
        self.enter(FailPoint::InsertReview).await?;
        let mut tables = self.inner.tables.lock().await;
        tables.require_product(review.product_id)?;
        let seq = tables.next_seq();
        tables.reviews.push(StoredReview {
            seq,
            review: review.clone(),
            id: ReviewId::random(),
            created_at: Utc::now(),
        });
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for MemoryGateway {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), GatewayError> {
        self.enter(FailPoint::Upload).await?;
        let mut tables = self.inner.tables.lock().await;
        let key = format!("{bucket}/{path}");
        if tables.objects.contains_key(&key) {
            return Err(GatewayError::Remote(
                RemoteError::new(400, "The resource already exists").with_code("Duplicate"),
            ));
        }
        tables.objects.insert(key, bytes);
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{bucket}/{path}",
            self.inner.base_url
        )
    }
}
