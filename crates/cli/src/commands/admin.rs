//! Admin panel commands.
//!
//! `login` persists an access flag (see `SHOPFRONT_ADMIN_FLAG_PATH`), so
//! later product commands run without the password until `logout`.

use std::path::Path;

use secrecy::SecretString;

use shopfront_core::Price;
use shopfront_storefront::admin::{AdminCapability, AdminError, ProductInput};
use shopfront_storefront::models::ProductUpdate;
use shopfront_storefront::{Result, Storefront};

use crate::AdminAction;
use crate::output;

pub async fn run(store: &Storefront, action: AdminAction) -> Result<()> {
    let gate = store.admin_gate();
    let admin = store.product_admin();

    match action {
        AdminAction::Login { admin_password } => {
            gate.login(&SecretString::from(admin_password)).await?;
        }
        AdminAction::Logout => {
            gate.revoke().await?;
            output::line("Admin access revoked.");
        }
        AdminAction::CreateProduct {
            name,
            description,
            price,
            category,
            stock,
            image_url,
        } => {
            let capability = capability(store).await?;
            let input = ProductInput {
                name,
                description,
                price,
                category,
                stock,
                image_url,
            };
            output::product(&admin.create_product(&capability, &input).await?);
        }
        AdminAction::UpdateProduct {
            id,
            name,
            description,
            price,
            category,
            stock,
        } => {
            let capability = capability(store).await?;
            let update = ProductUpdate {
                name,
                description,
                price: price
                    .map(Price::new)
                    .transpose()
                    .map_err(|_| AdminError::InvalidProduct("Price cannot be negative".into()))?,
                category,
                stock: stock
                    .map(u32::try_from)
                    .transpose()
                    .map_err(|_| AdminError::InvalidProduct("Stock cannot be negative".into()))?,
                image_url: None,
            };
            output::product(&admin.update_product(&capability, id, &update).await?);
        }
        AdminAction::DeleteProduct { id } => {
            let capability = capability(store).await?;
            admin.delete_product(&capability, id).await?;
        }
        AdminAction::UploadImage {
            id,
            file,
            content_type,
        } => {
            let capability = capability(store).await?;
            let bytes = tokio::fs::read(&file).await.map_err(|e| {
                AdminError::InvalidProduct(format!("Cannot read {}: {e}", file.display()))
            })?;
            let file_name = file
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("image");
            let content_type = content_type.unwrap_or_else(|| guess_content_type(&file).to_owned());
            let product = admin
                .upload_image(&capability, id, file_name, bytes, &content_type)
                .await?;
            output::product(&product);
        }
    }
    Ok(())
}

async fn capability(store: &Storefront) -> Result<AdminCapability> {
    let capability = store.admin_gate().require().await.inspect_err(|_| {
        output::error("Run `shop-cli admin login <password>` first.");
    })?;
    Ok(capability)
}

fn guess_content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
