//! Subcommand handlers. Each returns the storefront's unified error so
//! `main` can report it in one place.

pub mod account;
pub mod admin;
pub mod cart;
pub mod checkout;
pub mod products;
pub mod reviews;
pub mod wishlist;
