//! Checkout sequencer.
//!
//! Turns the current cart into an order. Two placement modes exist:
//!
//! - [`OrderPlacement::Sequential`] inserts the order header, then the
//!   batch of order lines, as two separate calls. If the second call fails
//!   the header stays behind with no lines and nothing is rolled back.
//! - [`OrderPlacement::Atomic`] hands header and lines to one
//!   all-or-nothing backend call.
//!
//! Either way the cart is cleared only after the order and all its lines
//! exist, and a failed clear does not undo or fail the checkout.

mod shipping;

pub use shipping::{DEFAULT_COUNTRY, ShippingField, ShippingForm, ShippingFormError};

use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, instrument, warn};

use shopfront_core::{OrderId, OrderStatus, PaymentMethod, Price, UserId};

use crate::cart::CartManager;
use crate::gateway::{GatewayError, OrderGateway};
use crate::models::{NewOrder, NewOrderItem, Order, OrderLine, ShippingAddress};
use crate::notice::Notifier;
use crate::session::SessionStore;
use crate::telemetry::add_breadcrumb;

const FAILURE_NOTICE: &str = "Failed to place order. Please try again.";

/// Errors from checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Please log in to place an order")]
    NotSignedIn,

    #[error("Your cart is empty")]
    EmptyCart,

    #[error(transparent)]
    InvalidShipping(#[from] ShippingFormError),

    #[error("Payment method '{0}' is not available yet. Please choose cash on delivery.")]
    PaymentMethodUnavailable(PaymentMethod),

    #[error("Checkout error: {0}")]
    Gateway(#[from] GatewayError),
}

/// How an order header and its lines reach the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderPlacement {
    /// Header insert, then line insert. A failed line insert leaves the
    /// header in place.
    #[default]
    Sequential,
    /// One backend call that stores header and lines together or not at all.
    Atomic,
}

/// Unrecognized `OrderPlacement` name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown order placement '{0}' (expected 'sequential' or 'atomic')")]
pub struct UnknownPlacement(pub String);

impl FromStr for OrderPlacement {
    type Err = UnknownPlacement;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "atomic" => Ok(Self::Atomic),
            _ => Err(UnknownPlacement(s.to_owned())),
        }
    }
}

impl std::fmt::Display for OrderPlacement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sequential => f.write_str("sequential"),
            Self::Atomic => f.write_str("atomic"),
        }
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderReceipt {
    pub order: Order,
    pub items: Vec<NewOrderItem>,
    /// False when the order was stored but emptying the cart failed.
    pub cart_cleared: bool,
}

/// Places orders from the cart. Cheap to clone.
#[derive(Clone)]
pub struct Checkout {
    inner: Arc<CheckoutInner>,
}

struct CheckoutInner {
    orders: Arc<dyn OrderGateway>,
    cart: CartManager,
    session: SessionStore,
    notifier: Notifier,
    placement: OrderPlacement,
    default_country: String,
}

impl Checkout {
    #[must_use]
    pub fn new(
        orders: Arc<dyn OrderGateway>,
        cart: CartManager,
        session: SessionStore,
        notifier: Notifier,
        placement: OrderPlacement,
        default_country: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(CheckoutInner {
                orders,
                cart,
                session,
                notifier,
                placement,
                default_country: default_country.into(),
            }),
        }
    }

    #[must_use]
    pub fn placement(&self) -> OrderPlacement {
        self.inner.placement
    }

    /// A form pre-filled with the signed-in shopper's email.
    #[must_use]
    pub fn blank_form(&self) -> ShippingForm {
        self.inner
            .session
            .current_user()
            .map_or_else(ShippingForm::default, |user| ShippingForm::for_email(user.email))
    }

    /// Validate `form` and place a pending order for the current cart.
    ///
    /// # Errors
    ///
    /// `NotSignedIn`, `EmptyCart`, `InvalidShipping` and
    /// `PaymentMethodUnavailable` are returned before any network call.
    /// `Gateway` means the order or its lines could not be stored; the cart
    /// is then left untouched.
    #[instrument(skip(self, form), fields(payment = %payment))]
    pub async fn place_order(
        &self,
        form: &ShippingForm,
        payment: PaymentMethod,
    ) -> Result<OrderReceipt, CheckoutError> {
        let (user, lines, total) = self.preflight()?;
        let address = form.validate(&self.inner.default_country).map_err(|e| {
            self.inner.notifier.error(e.to_string());
            CheckoutError::from(e)
        })?;
        self.check_payment(payment)?;

        self.place(user, &lines, total, OrderStatus::Pending, Some(address), payment)
            .await
    }

    /// Place an already-completed order with no shipping snapshot.
    ///
    /// # Errors
    ///
    /// Same as [`Checkout::place_order`] without the shipping checks.
    #[instrument(skip(self), fields(payment = %payment))]
    pub async fn place_order_without_shipping(
        &self,
        payment: PaymentMethod,
    ) -> Result<OrderReceipt, CheckoutError> {
        let (user, lines, total) = self.preflight()?;
        self.check_payment(payment)?;

        self.place(user, &lines, total, OrderStatus::Completed, None, payment)
            .await
    }

    /// The signed-in shopper's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `NotSignedIn` or the gateway error.
    pub async fn order_history(&self) -> Result<Vec<Order>, CheckoutError> {
        let user = self.user_id().ok_or(CheckoutError::NotSignedIn)?;
        self.inner.orders.list_orders(user).await.map_err(|e| {
            error!(error = %e, "Error fetching orders");
            e.into()
        })
    }

    /// Lines of one of the shopper's orders.
    ///
    /// # Errors
    ///
    /// Returns `NotSignedIn` or the gateway error.
    pub async fn order_items(&self, order_id: OrderId) -> Result<Vec<NewOrderItem>, CheckoutError> {
        if self.user_id().is_none() {
            return Err(CheckoutError::NotSignedIn);
        }
        Ok(self.inner.orders.list_order_items(order_id).await?)
    }

    /// Checks that need no network: a user and a non-empty cart. Returns the
    /// lines and total captured from the cart at this moment.
    fn preflight(&self) -> Result<(UserId, Vec<OrderLine>, Price), CheckoutError> {
        let Some(user) = self.user_id() else {
            self.inner.notifier.error("Please log in to place an order");
            return Err(CheckoutError::NotSignedIn);
        };

        let cart = self.inner.cart.snapshot();
        if cart.is_empty() {
            self.inner.notifier.error("Your cart is empty");
            return Err(CheckoutError::EmptyCart);
        }

        let lines = cart.lines.iter().map(OrderLine::from).collect();
        Ok((user, lines, cart.total_price()))
    }

    fn check_payment(&self, payment: PaymentMethod) -> Result<(), CheckoutError> {
        if payment.is_available() {
            return Ok(());
        }
        let err = CheckoutError::PaymentMethodUnavailable(payment);
        self.inner.notifier.error(err.to_string());
        Err(err)
    }

    async fn place(
        &self,
        user: UserId,
        lines: &[OrderLine],
        total: Price,
        status: OrderStatus,
        shipping_address: Option<ShippingAddress>,
        payment: PaymentMethod,
    ) -> Result<OrderReceipt, CheckoutError> {
        let new_order = NewOrder {
            user_id: user,
            total_amount: total,
            status,
            payment_method: payment,
            shipping_address,
        };

        let (order, items) = match self.store(&new_order, lines).await {
            Ok(stored) => stored,
            Err(e) => {
                error!(error = %e, "Checkout error");
                self.inner.notifier.error(FAILURE_NOTICE);
                return Err(e.into());
            }
        };

        let cart_cleared = match self.inner.cart.clear_cart().await {
            Ok(()) => true,
            Err(e) => {
                warn!(order_id = %order.id, error = %e, "Order placed but the cart could not be cleared");
                false
            }
        };

        add_breadcrumb(
            "checkout",
            "Order placed",
            &[
                ("order_id", &order.id.to_string()),
                ("total", &order.total_amount.to_string()),
            ],
        );
        info!(order_id = %order.id, items = items.len(), "Order placed");
        self.inner.notifier.success(success_message(payment));

        Ok(OrderReceipt {
            order,
            items,
            cart_cleared,
        })
    }

    async fn store(
        &self,
        new_order: &NewOrder,
        lines: &[OrderLine],
    ) -> Result<(Order, Vec<NewOrderItem>), GatewayError> {
        match self.inner.placement {
            OrderPlacement::Sequential => {
                let order = self.inner.orders.insert_order(new_order).await?;
                let items: Vec<NewOrderItem> = lines
                    .iter()
                    .map(|line| NewOrderItem::for_order(order.id, line))
                    .collect();
                if let Err(e) = self.inner.orders.insert_order_items(&items).await {
                    error!(order_id = %order.id, "Order header stored without its lines");
                    return Err(e);
                }
                Ok((order, items))
            }
            OrderPlacement::Atomic => {
                let order = self.inner.orders.place_order_atomic(new_order, lines).await?;
                let items = lines
                    .iter()
                    .map(|line| NewOrderItem::for_order(order.id, line))
                    .collect();
                Ok((order, items))
            }
        }
    }

    fn user_id(&self) -> Option<UserId> {
        self.inner.session.current_user().map(|user| user.id)
    }
}

const fn success_message(payment: PaymentMethod) -> &'static str {
    match payment {
        PaymentMethod::CashOnDelivery => "Order placed successfully! Pay on delivery.",
        PaymentMethod::Online => "Order placed successfully!",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use secrecy::SecretString;

    use super::*;
    use crate::gateway::{FailPoint, MemoryGateway};
    use crate::models::NewProduct;
    use crate::notice::{Notice, drain};

    struct Harness {
        gateway: Arc<MemoryGateway>,
        session: SessionStore,
        notifier: Notifier,
        cart: CartManager,
        checkout: Checkout,
    }

    async fn harness(placement: OrderPlacement) -> Harness {
        let gateway = Arc::new(MemoryGateway::new());
        gateway.register_user("shopper@b.co", "pw-1").await;
        let session = SessionStore::start(gateway.clone()).await;
        let notifier = Notifier::new();
        let cart = CartManager::new(gateway.clone(), session.clone(), notifier.clone());
        let checkout = Checkout::new(
            gateway.clone(),
            cart.clone(),
            session.clone(),
            notifier.clone(),
            placement,
            DEFAULT_COUNTRY,
        );
        Harness {
            gateway,
            session,
            notifier,
            cart,
            checkout,
        }
    }

    impl Harness {
        async fn sign_in(&self) -> UserId {
            self.session
                .sign_in("shopper@b.co", &SecretString::from("pw-1"))
                .await
                .unwrap()
                .id
        }

        /// Two lines: 2 x 12.50 and 1 x 11.50.
        async fn fill_cart(&self) {
            for (name, cents, quantity) in [("Mug", 1250, 2), ("Tea", 1150, 1)] {
                let product = self
                    .gateway
                    .seed_product(
                        NewProduct {
                            name: name.to_owned(),
                            description: String::new(),
                            price: Price::from_cents(cents).unwrap(),
                            category: "Kitchen".to_owned(),
                            stock: 10,
                            image_url: None,
                        },
                        Utc::now(),
                    )
                    .await;
                self.cart.add_to_cart(product.id, quantity).await.unwrap();
            }
        }
    }

    fn form() -> ShippingForm {
        ShippingForm {
            full_name: "Asha Rao".into(),
            email: "asha@example.com".into(),
            phone: "(123) 456-7890".into(),
            address: "12 MG Road".into(),
            city: "Pune".into(),
            state: "MH".into(),
            zip_code: "411001".into(),
            country: String::new(),
        }
    }

    #[test]
    fn test_placement_from_str() {
        assert_eq!("atomic".parse::<OrderPlacement>().unwrap(), OrderPlacement::Atomic);
        assert_eq!(
            " Sequential ".parse::<OrderPlacement>().unwrap(),
            OrderPlacement::Sequential
        );
        assert!("eventually".parse::<OrderPlacement>().is_err());
        assert_eq!(OrderPlacement::default(), OrderPlacement::Sequential);
    }

    #[tokio::test]
    async fn test_sequential_checkout_places_order_and_clears_cart() {
        let h = harness(OrderPlacement::Sequential).await;
        let user = h.sign_in().await;
        h.fill_cart().await;
        let mut notices = h.notifier.subscribe();

        let receipt = h
            .checkout
            .place_order(&form(), PaymentMethod::CashOnDelivery)
            .await
            .unwrap();

        assert!(receipt.cart_cleared);
        assert_eq!(receipt.order.status, OrderStatus::Pending);
        assert_eq!(receipt.order.total_amount, Price::from_cents(3650).unwrap());
        assert_eq!(
            receipt.order.shipping_address.as_ref().unwrap().country,
            "India"
        );
        assert_eq!(h.gateway.orders().await.len(), 1);
        assert_eq!(h.gateway.order_items().await.len(), 2);
        assert_eq!(h.gateway.cart_row_count(user).await, 0);
        assert!(h.cart.snapshot().is_empty());
        assert_eq!(
            drain(&mut notices),
            vec![
                Notice::success("Cart cleared"),
                Notice::success("Order placed successfully! Pay on delivery."),
            ]
        );
    }

    #[tokio::test]
    async fn test_line_failure_leaves_orphan_header_and_cart() {
        let h = harness(OrderPlacement::Sequential).await;
        let user = h.sign_in().await;
        h.fill_cart().await;
        let before = h.cart.snapshot();
        let mut notices = h.notifier.subscribe();

        h.gateway.fail_on(FailPoint::InsertOrderItems).await;
        let result = h
            .checkout
            .place_order(&form(), PaymentMethod::CashOnDelivery)
            .await;

        assert!(matches!(result, Err(CheckoutError::Gateway(_))));
        assert_eq!(h.gateway.orders().await.len(), 1);
        assert!(h.gateway.order_items().await.is_empty());
        assert_eq!(h.gateway.cart_row_count(user).await, 2);
        assert_eq!(h.cart.snapshot(), before);
        assert_eq!(drain(&mut notices), vec![Notice::error(FAILURE_NOTICE)]);
    }

    #[tokio::test]
    async fn test_atomic_failure_stores_nothing() {
        let h = harness(OrderPlacement::Atomic).await;
        let user = h.sign_in().await;
        h.fill_cart().await;

        h.gateway.fail_on(FailPoint::PlaceOrderAtomic).await;
        assert!(
            h.checkout
                .place_order(&form(), PaymentMethod::CashOnDelivery)
                .await
                .is_err()
        );
        assert!(h.gateway.orders().await.is_empty());
        assert_eq!(h.gateway.cart_row_count(user).await, 2);

        h.gateway.recover(FailPoint::PlaceOrderAtomic).await;
        let receipt = h
            .checkout
            .place_order(&form(), PaymentMethod::CashOnDelivery)
            .await
            .unwrap();
        assert_eq!(receipt.items.len(), 2);
        assert_eq!(h.gateway.order_items().await.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_clear_does_not_fail_checkout() {
        let h = harness(OrderPlacement::Sequential).await;
        h.sign_in().await;
        h.fill_cart().await;

        h.gateway.fail_on(FailPoint::ClearCart).await;
        let receipt = h
            .checkout
            .place_order(&form(), PaymentMethod::CashOnDelivery)
            .await
            .unwrap();
        assert!(!receipt.cart_cleared);
        assert_eq!(h.gateway.order_items().await.len(), 2);
    }

    #[tokio::test]
    async fn test_rejections_happen_before_network() {
        let h = harness(OrderPlacement::Sequential).await;

        assert!(matches!(
            h.checkout
                .place_order(&form(), PaymentMethod::CashOnDelivery)
                .await,
            Err(CheckoutError::NotSignedIn)
        ));

        h.sign_in().await;
        assert!(matches!(
            h.checkout
                .place_order(&form(), PaymentMethod::CashOnDelivery)
                .await,
            Err(CheckoutError::EmptyCart)
        ));

        h.fill_cart().await;
        let calls = h.gateway.call_count();
        let mut notices = h.notifier.subscribe();

        let mut bad = form();
        bad.phone = "12345".into();
        assert!(matches!(
            h.checkout.place_order(&bad, PaymentMethod::CashOnDelivery).await,
            Err(CheckoutError::InvalidShipping(ShippingFormError::InvalidPhone))
        ));
        assert!(matches!(
            h.checkout.place_order(&form(), PaymentMethod::Online).await,
            Err(CheckoutError::PaymentMethodUnavailable(PaymentMethod::Online))
        ));

        assert_eq!(h.gateway.call_count(), calls);
        assert!(h.gateway.orders().await.is_empty());
        let notices = drain(&mut notices);
        assert_eq!(
            notices[0],
            Notice::error("Please enter a valid 10-digit phone number")
        );
        assert_eq!(notices.len(), 2);
    }

    #[tokio::test]
    async fn test_without_shipping_is_completed() {
        let h = harness(OrderPlacement::Sequential).await;
        h.sign_in().await;
        h.fill_cart().await;

        let receipt = h
            .checkout
            .place_order_without_shipping(PaymentMethod::CashOnDelivery)
            .await
            .unwrap();
        assert_eq!(receipt.order.status, OrderStatus::Completed);
        assert!(receipt.order.shipping_address.is_none());
    }

    #[tokio::test]
    async fn test_prices_are_snapshotted() {
        let h = harness(OrderPlacement::Sequential).await;
        h.sign_in().await;
        h.fill_cart().await;

        let receipt = h
            .checkout
            .place_order(&form(), PaymentMethod::CashOnDelivery)
            .await
            .unwrap();
        let mut prices: Vec<Price> = receipt.items.iter().map(|item| item.price).collect();
        prices.sort();
        assert_eq!(
            prices,
            vec![Price::from_cents(1150).unwrap(), Price::from_cents(1250).unwrap()]
        );

        let stored = h.checkout.order_items(receipt.order.id).await.unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn test_order_history_newest_first() {
        let h = harness(OrderPlacement::Sequential).await;
        h.sign_in().await;

        h.fill_cart().await;
        let first = h
            .checkout
            .place_order(&form(), PaymentMethod::CashOnDelivery)
            .await
            .unwrap();
        h.fill_cart().await;
        let second = h
            .checkout
            .place_order_without_shipping(PaymentMethod::CashOnDelivery)
            .await
            .unwrap();

        let history = h.checkout.order_history().await.unwrap();
        let ids: Vec<OrderId> = history.iter().map(|order| order.id).collect();
        assert_eq!(ids, vec![second.order.id, first.order.id]);
    }

    #[tokio::test]
    async fn test_blank_form_prefills_email() {
        let h = harness(OrderPlacement::Sequential).await;
        assert!(h.checkout.blank_form().email.is_empty());
        h.sign_in().await;
        assert_eq!(h.checkout.blank_form().email, "shopper@b.co");
    }
}
