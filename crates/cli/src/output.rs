//! Terminal rendering. Results go to stdout, notices and errors to stderr.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use shopfront_storefront::cart::CartState;
use shopfront_storefront::checkout::OrderReceipt;
use shopfront_storefront::models::{Order, Product, ProductReview, WishlistLine};
use shopfront_storefront::notice::Notice;

pub fn notice(notice: &Notice) {
    eprintln!("{notice}");
}

pub fn error(message: &str) {
    eprintln!("[error] {message}");
}

pub fn line(text: &str) {
    println!("{text}");
}

pub fn products(products: &[Product]) {
    if products.is_empty() {
        println!("No products found.");
        return;
    }
    for product in products {
        let stock = if product.in_stock() {
            format!("{} in stock", product.stock)
        } else {
            "out of stock".to_string()
        };
        println!(
            "{}  {:<32} {:>10}  {:<16} {}",
            product.id, product.name, product.price.to_string(), product.category, stock
        );
    }
}

pub fn product(product: &Product) {
    println!("{}", product.name);
    println!("  id:       {}", product.id);
    println!("  price:    {}", product.price);
    println!("  category: {}", product.category);
    println!("  stock:    {}", product.stock);
    if let Some(url) = &product.image_url {
        println!("  image:    {url}");
    }
    if !product.description.is_empty() {
        println!();
        println!("{}", product.description);
    }
}

pub fn cart(state: &CartState) {
    if state.is_empty() {
        println!("Your cart is empty.");
        return;
    }
    for line in &state.lines {
        println!(
            "{}  {:<32} {:>4} x {:>10} = {:>10}",
            line.id,
            line.product.name,
            line.quantity,
            line.product.price.to_string(),
            line.line_total().to_string()
        );
    }
    println!("Items: {}  Total: {}", state.total_items(), state.total_price());
}

pub fn wishlist(lines: &[WishlistLine]) {
    if lines.is_empty() {
        println!("Your wishlist is empty.");
        return;
    }
    for line in lines {
        println!(
            "{}  {:<32} {:>10}",
            line.product_id,
            line.product.name,
            line.product.price.to_string()
        );
    }
}

pub fn receipt(receipt: &OrderReceipt) {
    println!(
        "Order {} ({}) total {} via {}",
        receipt.order.id, receipt.order.status, receipt.order.total_amount, receipt.order.payment_method
    );
    for item in &receipt.items {
        println!("  {} x {} @ {}", item.quantity, item.product_id, item.price);
    }
    if !receipt.cart_cleared {
        println!("Note: the order was placed but your cart could not be emptied.");
    }
}

pub fn orders(orders: &[Order]) {
    if orders.is_empty() {
        println!("No orders yet.");
        return;
    }
    for order in orders {
        println!(
            "{}  {}  {:<9} {:>10}  {}",
            order.id,
            order.created_at.format("%Y-%m-%d"),
            order.status.to_string(),
            order.total_amount.to_string(),
            order.payment_method
        );
    }
}

pub fn reviews(reviews: &[ProductReview]) {
    if reviews.is_empty() {
        println!("No reviews for this product yet.");
        return;
    }
    for review in reviews {
        let stars = review.rating.value();
        println!(
            "{} {}{}  {}",
            review.display_name(),
            "*".repeat(usize::from(stars)),
            "-".repeat(usize::from(5_u8.saturating_sub(stars))),
            review.created_at.format("%Y-%m-%d")
        );
        println!("  {}", review.comment);
    }
}
