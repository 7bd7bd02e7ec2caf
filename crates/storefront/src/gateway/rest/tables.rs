//! Table ports over `/rest/v1`.

use async_trait::async_trait;
use reqwest::Method;
use tracing::{instrument, warn};

use shopfront_core::{CartItemId, OrderId, ProductId, UserId};

use super::RestGateway;
use super::query::TableQuery;
use super::rows::{
    CART_SELECT, CartRow, CartUpsert, OrderInsert, OrderItemRow, OrderRow, PlaceOrderArgs,
    PlaceOrderLine, ProductInsert, ProductPatch, ProductRow, QuantityPatch, REVIEW_SELECT,
    ReviewInsert, ReviewRow, WISHLIST_SELECT, WishlistInsert, WishlistRow,
};
use crate::gateway::{
    CartGateway, CatalogGateway, GatewayError, OrderGateway, ReviewGateway, WishlistGateway,
};
use crate::models::{
    CartLine, NewOrder, NewOrderItem, NewProduct, NewReview, Order, OrderLine, Product,
    ProductQuery, ProductReview, ProductUpdate, WishlistLine,
};

const PRODUCTS: &str = "rest/v1/products";
const CART_ITEMS: &str = "rest/v1/cart_items";
const WISHLIST_ITEMS: &str = "rest/v1/wishlist_items";
const ORDERS: &str = "rest/v1/orders";
const ORDER_ITEMS: &str = "rest/v1/order_items";
const PRODUCT_REVIEWS: &str = "rest/v1/product_reviews";
const PLACE_ORDER: &str = "rest/v1/rpc/place_order";

const RETURN_ROW: &str = "return=representation";
const MERGE_DUPLICATES: &str = "resolution=merge-duplicates,return=minimal";

impl RestGateway {
    async fn table(&self, method: Method, table: &str, query: &TableQuery) -> reqwest::RequestBuilder {
        self.request(method, table).await.query(query.params())
    }
}

/// Decode joined rows, dropping those whose product no longer exists.
fn joined<R, L>(
    rows: Vec<R>,
    table: &str,
    into_line: impl Fn(R) -> Result<Option<L>, GatewayError>,
) -> Result<Vec<L>, GatewayError> {
    let mut lines = Vec::with_capacity(rows.len());
    for row in rows {
        match into_line(row)? {
            Some(line) => lines.push(line),
            None => warn!(table, "Skipping row whose product no longer exists"),
        }
    }
    Ok(lines)
}

#[async_trait]
impl CatalogGateway for RestGateway {
    #[instrument(skip(self))]
    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, GatewayError> {
        let mut filter = TableQuery::select("*");
        if let Some(category) = &query.category {
            filter = filter.eq("category", category);
        }
        if let Some(term) = &query.search {
            filter = filter.any_ilike(&["name", "description", "category"], term);
        }
        filter = filter.order_desc("created_at");
        if let Some(limit) = query.limit {
            filter = filter.limit(limit);
        }

        let rows: Vec<ProductRow> = self
            .execute(self.table(Method::GET, PRODUCTS, &filter).await)
            .await?;
        rows.into_iter().map(Product::try_from).collect()
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn get_product(&self, id: ProductId) -> Result<Product, GatewayError> {
        let filter = TableQuery::select("*").eq("id", id).limit(1);
        let row: ProductRow = self
            .execute_single(
                self.table(Method::GET, PRODUCTS, &filter).await,
                &format!("Product not found: {id}"),
            )
            .await?;
        Product::try_from(row)
    }

    #[instrument(skip(self, product), fields(name = %product.name))]
    async fn insert_product(&self, product: &NewProduct) -> Result<Product, GatewayError> {
        let request = self
            .request(Method::POST, PRODUCTS)
            .await
            .header("Prefer", RETURN_ROW)
            .json(&ProductInsert::from(product));
        let row: ProductRow = self.execute_single(request, "inserted product").await?;
        Product::try_from(row)
    }

    #[instrument(skip(self, update), fields(product_id = %id))]
    async fn update_product(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, GatewayError> {
        let request = self
            .table(Method::PATCH, PRODUCTS, &TableQuery::filter().eq("id", id))
            .await
            .header("Prefer", RETURN_ROW)
            .json(&ProductPatch::from(update));
        let row: ProductRow = self
            .execute_single(request, &format!("Product not found: {id}"))
            .await?;
        Product::try_from(row)
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn delete_product(&self, id: ProductId) -> Result<(), GatewayError> {
        let filter = TableQuery::filter().eq("id", id);
        self.execute_empty(self.table(Method::DELETE, PRODUCTS, &filter).await)
            .await
    }
}

#[async_trait]
impl CartGateway for RestGateway {
    #[instrument(skip(self), fields(user_id = %user))]
    async fn select_cart_lines(&self, user: UserId) -> Result<Vec<CartLine>, GatewayError> {
        let filter = TableQuery::select(CART_SELECT)
            .eq("user_id", user)
            .order_asc("created_at");
        let rows: Vec<CartRow> = self
            .execute(self.table(Method::GET, CART_ITEMS, &filter).await)
            .await?;
        joined(rows, "cart_items", CartRow::into_line)
    }

    #[instrument(skip(self), fields(user_id = %user, product_id = %product))]
    async fn upsert_cart_item(
        &self,
        user: UserId,
        product: ProductId,
        quantity: u32,
    ) -> Result<(), GatewayError> {
        let request = self
            .table(
                Method::POST,
                CART_ITEMS,
                &TableQuery::filter().on_conflict("user_id,product_id"),
            )
            .await
            .header("Prefer", MERGE_DUPLICATES)
            .json(&CartUpsert {
                user_id: user.into(),
                product_id: product.into(),
                quantity,
            });
        self.execute_empty(request).await
    }

    #[instrument(skip(self), fields(cart_item_id = %id))]
    async fn update_cart_quantity(&self, id: CartItemId, quantity: u32) -> Result<(), GatewayError> {
        let request = self
            .table(Method::PATCH, CART_ITEMS, &TableQuery::filter().eq("id", id))
            .await
            .json(&QuantityPatch { quantity });
        self.execute_empty(request).await
    }

    #[instrument(skip(self), fields(cart_item_id = %id))]
    async fn delete_cart_item(&self, id: CartItemId) -> Result<(), GatewayError> {
        let filter = TableQuery::filter().eq("id", id);
        self.execute_empty(self.table(Method::DELETE, CART_ITEMS, &filter).await)
            .await
    }

    #[instrument(skip(self), fields(user_id = %user))]
    async fn delete_cart_items_for_user(&self, user: UserId) -> Result<(), GatewayError> {
        let filter = TableQuery::filter().eq("user_id", user);
        self.execute_empty(self.table(Method::DELETE, CART_ITEMS, &filter).await)
            .await
    }
}

#[async_trait]
impl WishlistGateway for RestGateway {
    #[instrument(skip(self), fields(user_id = %user))]
    async fn select_wishlist_lines(&self, user: UserId) -> Result<Vec<WishlistLine>, GatewayError> {
        let filter = TableQuery::select(WISHLIST_SELECT)
            .eq("user_id", user)
            .order_asc("created_at");
        let rows: Vec<WishlistRow> = self
            .execute(self.table(Method::GET, WISHLIST_ITEMS, &filter).await)
            .await?;
        joined(rows, "wishlist_items", WishlistRow::into_line)
    }

    #[instrument(skip(self), fields(user_id = %user, product_id = %product))]
    async fn insert_wishlist_item(&self, user: UserId, product: ProductId) -> Result<(), GatewayError> {
        let request = self
            .request(Method::POST, WISHLIST_ITEMS)
            .await
            .json(&WishlistInsert {
                user_id: user.into(),
                product_id: product.into(),
            });
        self.execute_empty(request).await
    }

    #[instrument(skip(self), fields(user_id = %user, product_id = %product))]
    async fn delete_wishlist_item(&self, user: UserId, product: ProductId) -> Result<(), GatewayError> {
        let filter = TableQuery::filter()
            .eq("user_id", user)
            .eq("product_id", product);
        self.execute_empty(self.table(Method::DELETE, WISHLIST_ITEMS, &filter).await)
            .await
    }

    #[instrument(skip(self), fields(user_id = %user))]
    async fn delete_wishlist_items_for_user(&self, user: UserId) -> Result<(), GatewayError> {
        let filter = TableQuery::filter().eq("user_id", user);
        self.execute_empty(self.table(Method::DELETE, WISHLIST_ITEMS, &filter).await)
            .await
    }
}

#[async_trait]
impl OrderGateway for RestGateway {
    #[instrument(skip(self, order), fields(user_id = %order.user_id))]
    async fn insert_order(&self, order: &NewOrder) -> Result<Order, GatewayError> {
        let request = self
            .request(Method::POST, ORDERS)
            .await
            .header("Prefer", RETURN_ROW)
            .json(&OrderInsert::from(order));
        let row: OrderRow = self.execute_single(request, "inserted order").await?;
        Order::try_from(row)
    }

    #[instrument(skip(self, items), fields(count = items.len()))]
    async fn insert_order_items(&self, items: &[NewOrderItem]) -> Result<(), GatewayError> {
        let rows: Vec<OrderItemRow> = items.iter().map(OrderItemRow::from).collect();
        let request = self.request(Method::POST, ORDER_ITEMS).await.json(&rows);
        self.execute_empty(request).await
    }

    #[instrument(skip(self, order, lines), fields(user_id = %order.user_id, count = lines.len()))]
    async fn place_order_atomic(
        &self,
        order: &NewOrder,
        lines: &[OrderLine],
    ) -> Result<Order, GatewayError> {
        let args = PlaceOrderArgs {
            order: OrderInsert::from(order),
            items: lines.iter().map(PlaceOrderLine::from).collect(),
        };
        let request = self.request(Method::POST, PLACE_ORDER).await.json(&args);
        let row: OrderRow = self.execute(request).await?;
        Order::try_from(row)
    }

    #[instrument(skip(self), fields(user_id = %user))]
    async fn list_orders(&self, user: UserId) -> Result<Vec<Order>, GatewayError> {
        let filter = TableQuery::select("*")
            .eq("user_id", user)
            .order_desc("created_at");
        let rows: Vec<OrderRow> = self
            .execute(self.table(Method::GET, ORDERS, &filter).await)
            .await?;
        rows.into_iter().map(Order::try_from).collect()
    }

    #[instrument(skip(self), fields(order_id = %order))]
    async fn list_order_items(&self, order: OrderId) -> Result<Vec<NewOrderItem>, GatewayError> {
        let filter = TableQuery::select("order_id,product_id,quantity,price").eq("order_id", order);
        let rows: Vec<OrderItemRow> = self
            .execute(self.table(Method::GET, ORDER_ITEMS, &filter).await)
            .await?;
        rows.into_iter().map(NewOrderItem::try_from).collect()
    }
}

#[async_trait]
impl ReviewGateway for RestGateway {
    #[instrument(skip(self), fields(product_id = %product))]
    async fn select_reviews(&self, product: ProductId) -> Result<Vec<ProductReview>, GatewayError> {
        let filter = TableQuery::select(REVIEW_SELECT)
            .eq("product_id", product)
            .order_desc("created_at");
        let rows: Vec<ReviewRow> = self
            .execute(self.table(Method::GET, PRODUCT_REVIEWS, &filter).await)
            .await?;
        rows.into_iter().map(ProductReview::try_from).collect()
    }

    #[instrument(skip(self, review), fields(product_id = %review.product_id))]
    async fn insert_review(&self, review: &NewReview) -> Result<(), GatewayError> {
        let request = self
            .request(Method::POST, PRODUCT_REVIEWS)
            .await
            .json(&ReviewInsert::from(review));
        self.execute_empty(request).await
    }
}
