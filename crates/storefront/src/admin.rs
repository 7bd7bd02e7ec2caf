//! Admin panel access and product management.
//!
//! [`AdminGate`] checks a shared password and persists an "access granted"
//! flag to a local file so later runs stay unlocked. It only hides the
//! admin surface: the backend enforces its own row-level rules on every
//! write, whatever this gate says.
//!
//! [`ProductAdmin`] operations take an [`AdminCapability`], which can only be
//! obtained from the gate.

use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use shopfront_core::{Price, ProductId};

use crate::catalog::Catalog;
use crate::config::AdminConfig;
use crate::gateway::{CatalogGateway, GatewayError, ObjectStorage};
use crate::models::{NewProduct, Product, ProductUpdate};
use crate::notice::Notifier;

const FLAG_VALUE: &str = "true";

/// Errors from the admin gate and product management.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Admin access is not configured")]
    NotConfigured,

    #[error("Invalid admin password")]
    InvalidPassword,

    #[error("Admin access required")]
    AccessRequired,

    #[error("Could not persist admin access: {0}")]
    Flag(#[from] std::io::Error),

    #[error("{0}")]
    InvalidProduct(String),

    #[error("Admin error: {0}")]
    Gateway(#[from] GatewayError),
}

/// Proof that the admin gate was passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminCapability {
    _granted: (),
}

/// Password gate for the admin panel.
#[derive(Clone)]
pub struct AdminGate {
    config: Arc<AdminConfig>,
    notifier: Notifier,
}

impl AdminGate {
    #[must_use]
    pub fn new(config: AdminConfig, notifier: Notifier) -> Self {
        Self {
            config: Arc::new(config),
            notifier,
        }
    }

    /// Check `password` and persist the access flag.
    ///
    /// # Errors
    ///
    /// Returns `NotConfigured` when no admin password is set,
    /// `InvalidPassword` on mismatch, or `Flag` when the flag file cannot be
    /// written.
    #[instrument(skip(self, password))]
    pub async fn login(&self, password: &SecretString) -> Result<AdminCapability, AdminError> {
        let Some(expected) = &self.config.password else {
            warn!("Admin login attempted with no admin password configured");
            self.notifier.error("Admin access is not configured");
            return Err(AdminError::NotConfigured);
        };

        if !constant_time_compare(expected.expose_secret(), password.expose_secret()) {
            warn!("Invalid admin password");
            self.notifier.error("Invalid admin password");
            return Err(AdminError::InvalidPassword);
        }

        write_flag(&self.config.flag_path).await?;
        info!("Admin access granted");
        self.notifier.success("Admin access granted!");
        Ok(AdminCapability { _granted: () })
    }

    /// The capability granted by an earlier login, if the flag is still set.
    pub async fn capability(&self) -> Option<AdminCapability> {
        match tokio::fs::read_to_string(&self.config.flag_path).await {
            Ok(contents) if contents.trim() == FLAG_VALUE => Some(AdminCapability { _granted: () }),
            Ok(_) => None,
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!(error = %e, path = %self.config.flag_path.display(), "Could not read admin flag");
                None
            }
        }
    }

    /// Like [`AdminGate::capability`], as an error when access was never
    /// granted.
    ///
    /// # Errors
    ///
    /// Returns `AccessRequired` when the flag is not set.
    pub async fn require(&self) -> Result<AdminCapability, AdminError> {
        self.capability().await.ok_or(AdminError::AccessRequired)
    }

    /// Clear the persisted flag. Clearing an absent flag succeeds.
    ///
    /// # Errors
    ///
    /// Returns `Flag` when the file exists but cannot be removed.
    pub async fn revoke(&self) -> Result<(), AdminError> {
        match tokio::fs::remove_file(&self.config.flag_path).await {
            Ok(()) => {
                info!("Admin access revoked");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

async fn write_flag(path: &Path) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, FLAG_VALUE).await
}

/// Constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

/// Product form input before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductInput {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    pub stock: i64,
    pub image_url: Option<String>,
}

impl ProductInput {
    /// Validate into a row to insert.
    ///
    /// # Errors
    ///
    /// Returns `InvalidProduct` for a blank name, a negative price or a
    /// negative stock count.
    pub fn validate(&self) -> Result<NewProduct, AdminError> {
        Ok(NewProduct {
            name: validate_name(&self.name)?,
            description: self.description.trim().to_owned(),
            price: validate_price(self.price)?,
            category: self.category.trim().to_owned(),
            stock: validate_stock(self.stock)?,
            image_url: self.image_url.clone(),
        })
    }
}

fn validate_name(name: &str) -> Result<String, AdminError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AdminError::InvalidProduct("Product name is required".into()));
    }
    Ok(name.to_owned())
}

fn validate_price(price: Decimal) -> Result<Price, AdminError> {
    Price::new(price).map_err(|_| AdminError::InvalidProduct("Price cannot be negative".into()))
}

fn validate_stock(stock: i64) -> Result<u32, AdminError> {
    if stock < 0 {
        return Err(AdminError::InvalidProduct("Stock cannot be negative".into()));
    }
    u32::try_from(stock).map_err(|_| AdminError::InvalidProduct("Stock is too large".into()))
}

/// Product create, update, delete and image upload. Every successful write
/// invalidates the catalog cache.
#[derive(Clone)]
pub struct ProductAdmin {
    inner: Arc<ProductAdminInner>,
}

struct ProductAdminInner {
    products: Arc<dyn CatalogGateway>,
    storage: Arc<dyn ObjectStorage>,
    catalog: Catalog,
    notifier: Notifier,
    image_bucket: String,
}

impl ProductAdmin {
    #[must_use]
    pub fn new(
        products: Arc<dyn CatalogGateway>,
        storage: Arc<dyn ObjectStorage>,
        catalog: Catalog,
        notifier: Notifier,
        image_bucket: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(ProductAdminInner {
                products,
                storage,
                catalog,
                notifier,
                image_bucket: image_bucket.into(),
            }),
        }
    }

    /// # Errors
    ///
    /// Returns `InvalidProduct` before any network call, or the gateway
    /// error.
    #[instrument(skip(self, _capability, input), fields(name = %input.name))]
    pub async fn create_product(
        &self,
        _capability: &AdminCapability,
        input: &ProductInput,
    ) -> Result<Product, AdminError> {
        let new_product = input.validate()?;
        let product = self
            .inner
            .products
            .insert_product(&new_product)
            .await
            .map_err(|e| self.failed("Failed to add product", e))?;

        self.inner.catalog.invalidate();
        info!(product_id = %product.id, "Product created");
        self.inner.notifier.success("Product added successfully!");
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `InvalidProduct` for an empty update or a blank name, or the
    /// gateway error.
    #[instrument(skip(self, _capability, update), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        _capability: &AdminCapability,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, AdminError> {
        if update.is_empty() {
            return Err(AdminError::InvalidProduct("Nothing to update".into()));
        }
        let mut update = update.clone();
        if let Some(name) = &update.name {
            update.name = Some(validate_name(name)?);
        }

        let product = self
            .inner
            .products
            .update_product(id, &update)
            .await
            .map_err(|e| self.failed("Failed to update product", e))?;

        self.inner.catalog.invalidate();
        self.inner.notifier.success("Product updated successfully!");
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns the gateway error.
    #[instrument(skip(self, _capability), fields(product_id = %id))]
    pub async fn delete_product(
        &self,
        _capability: &AdminCapability,
        id: ProductId,
    ) -> Result<(), AdminError> {
        self.inner
            .products
            .delete_product(id)
            .await
            .map_err(|e| self.failed("Failed to delete product", e))?;

        self.inner.catalog.invalidate();
        self.inner.notifier.success("Product deleted");
        Ok(())
    }

    /// Upload an image to the product-image bucket and store its public URL
    /// on the product.
    ///
    /// Objects are written under a fresh name, so a failed URL update leaves
    /// an unreferenced object rather than overwriting a live one.
    ///
    /// # Errors
    ///
    /// Returns `InvalidProduct` for an empty file, or the gateway error.
    #[instrument(skip(self, _capability, bytes), fields(product_id = %id, size = bytes.len()))]
    pub async fn upload_image(
        &self,
        _capability: &AdminCapability,
        id: ProductId,
        file_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<Product, AdminError> {
        if bytes.is_empty() {
            return Err(AdminError::InvalidProduct("Image file is empty".into()));
        }

        let path = object_path(id, file_name);
        self.inner
            .storage
            .upload(&self.inner.image_bucket, &path, bytes, content_type)
            .await
            .map_err(|e| self.failed("Failed to upload image", e))?;

        let url = self.inner.storage.public_url(&self.inner.image_bucket, &path);
        let update = ProductUpdate {
            image_url: Some(url),
            ..ProductUpdate::default()
        };
        let product = self
            .inner
            .products
            .update_product(id, &update)
            .await
            .map_err(|e| self.failed("Failed to update product image", e))?;

        self.inner.catalog.invalidate();
        self.inner.notifier.success("Image uploaded");
        Ok(product)
    }

    fn failed(&self, notice: &str, e: GatewayError) -> AdminError {
        error!(error = %e, "{notice}");
        self.inner.notifier.error(notice);
        e.into()
    }
}

/// `<product id>/<random>.<ext>`, keeping the uploaded file's extension.
fn object_path(id: ProductId, file_name: &str) -> String {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(str::to_ascii_lowercase);
    match extension {
        Some(ext) => format!("{id}/{}.{ext}", Uuid::new_v4()),
        None => format!("{id}/{}", Uuid::new_v4()),
    }
}
