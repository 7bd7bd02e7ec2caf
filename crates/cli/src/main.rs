//! Shopfront CLI - browse, shop and manage products from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Browse without signing in
//! shop-cli products list
//! shop-cli products search lamp
//!
//! # Shop as a signed-in user
//! export SHOPFRONT_EMAIL=me@example.com SHOPFRONT_PASSWORD=...
//! shop-cli cart add 6f1c... -q 2
//! shop-cli checkout --full-name "Asha Rao" --email me@example.com \
//!     --phone 9876543210 --address "12 MG Road" --city Pune --state MH --zip 411001
//!
//! # Admin
//! shop-cli admin login <password>
//! shop-cli admin create-product --name Lamp --price 45.00 --category Home --stock 3
//! ```
//!
//! Connection settings come from the environment (see
//! `shopfront_storefront::config`). Notices are printed to stderr and
//! results to stdout.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use secrecy::SecretString;
use tracing::debug;

use shopfront_core::{CartItemId, PaymentMethod, ProductId};
use shopfront_storefront::notice::{NoticeLevel, drain};
use shopfront_storefront::{Storefront, StorefrontConfig, telemetry};

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "shop-cli")]
#[command(author, version, about = "Shopfront storefront CLI")]
struct Cli {
    /// Account email; commands that need a shopper sign in with it
    #[arg(long, global = true, env = "SHOPFRONT_EMAIL")]
    email: Option<String>,

    /// Account password
    #[arg(long, global = true, env = "SHOPFRONT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse the catalog
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage the wishlist
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
    /// Place an order for the current cart
    Checkout(CheckoutArgs),
    /// List past orders
    Orders,
    /// Read or write product reviews
    Reviews {
        #[command(subcommand)]
        action: ReviewsAction,
    },
    /// Create an account with --email and --password
    Signup,
    /// Admin panel
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum ProductsAction {
    /// All products, newest first
    List,
    /// Distinct categories
    Categories,
    /// Products in one category
    Category { name: String },
    /// Search name, description and category
    Search { term: String },
    /// One product in detail
    Show { id: ProductId },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart lines and totals
    Show,
    /// Add a product, replacing any quantity already in the cart
    Add {
        id: ProductId,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line's quantity; zero or less removes it
    Update {
        item_id: CartItemId,
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line
    Remove { item_id: CartItemId },
    /// Remove every line
    Clear,
}

#[derive(Subcommand)]
enum WishlistAction {
    /// Show saved products
    Show,
    /// Save a product
    Add { id: ProductId },
    /// Remove a saved product
    Remove { id: ProductId },
    /// Remove every saved product
    Clear,
}

#[derive(Args)]
struct CheckoutArgs {
    #[arg(long)]
    full_name: Option<String>,
    /// Contact email; defaults to the account email
    #[arg(long = "contact-email")]
    contact_email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    city: Option<String>,
    #[arg(long)]
    state: Option<String>,
    #[arg(long)]
    zip: Option<String>,
    #[arg(long)]
    country: Option<String>,
    /// `cod` or `online`
    #[arg(long, default_value = "cod")]
    payment: PaymentMethod,
    /// Place a completed order without a shipping address
    #[arg(long)]
    no_shipping: bool,
}

#[derive(Subcommand)]
enum ReviewsAction {
    /// Reviews of a product, newest first
    List { id: ProductId },
    /// Review a product
    Add {
        id: ProductId,
        #[arg(short, long, allow_negative_numbers = true)]
        rating: i32,
        #[arg(short, long)]
        comment: String,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Unlock the admin commands
    Login { admin_password: String },
    /// Lock the admin commands again
    Logout,
    /// Add a product
    CreateProduct {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, allow_negative_numbers = true)]
        price: Decimal,
        #[arg(long, default_value = "")]
        category: String,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        stock: i64,
        #[arg(long)]
        image_url: Option<String>,
    },
    /// Change fields of a product
    UpdateProduct {
        id: ProductId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        price: Option<Decimal>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        stock: Option<i64>,
    },
    /// Delete a product
    DeleteProduct { id: ProductId },
    /// Upload a product image and attach it
    UploadImage {
        id: ProductId,
        file: std::path::PathBuf,
        /// Defaults to a guess from the file extension
        #[arg(long)]
        content_type: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            output::error(&format!("Configuration error: {e}"));
            return ExitCode::FAILURE;
        }
    };
    let _sentry_guard = telemetry::init(&config);

    let store = Storefront::connect(config).await;
    debug!(
        restored_session = store.session().is_signed_in(),
        "Storefront connected"
    );
    let mut notices = store.notifier().subscribe();

    let result = run(&store, cli).await;

    let shown = drain(&mut notices);
    for notice in &shown {
        output::notice(notice);
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            e.report();
            // The managers already told the shopper what went wrong
            if !shown.iter().any(|n| n.level == NoticeLevel::Error) {
                output::error(&e.user_message());
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(store: &Storefront, cli: Cli) -> shopfront_storefront::Result<()> {
    let credentials = cli
        .email
        .zip(cli.password)
        .map(|(email, password)| (email, SecretString::from(password)));

    match cli.command {
        Commands::Signup => commands::account::signup(store, credentials.as_ref()).await,
        Commands::Products { action } => commands::products::run(store, action).await,
        Commands::Admin { action } => commands::admin::run(store, action).await,
        command => {
            commands::account::sign_in(store, credentials.as_ref()).await?;
            match command {
                Commands::Cart { action } => commands::cart::run(store, action).await,
                Commands::Wishlist { action } => commands::wishlist::run(store, action).await,
                Commands::Checkout(args) => commands::checkout::run(store, args).await,
                Commands::Orders => commands::account::orders(store).await,
                Commands::Reviews { action } => commands::reviews::run(store, action).await,
                Commands::Signup | Commands::Products { .. } | Commands::Admin { .. } => Ok(()),
            }
        }
    }
}
