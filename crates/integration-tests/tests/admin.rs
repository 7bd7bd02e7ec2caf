//! Admin gate and catalog writes.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;
use secrecy::SecretString;

use shopfront_integration_tests::{ADMIN_PASSWORD, TestContext};
use shopfront_storefront::admin::{AdminError, ProductInput};
use shopfront_storefront::models::ProductUpdate;
use shopfront_storefront::notice::Notice;

fn lamp() -> ProductInput {
    ProductInput {
        name: "Brass Lamp".into(),
        description: "Warm light".into(),
        price: Decimal::new(1999, 2),
        category: "Lighting".into(),
        stock: 7,
        image_url: None,
    }
}

#[tokio::test]
async fn gate_persists_until_revoked() {
    let mut ctx = TestContext::new().await;
    let gate = ctx.store.admin_gate().clone();

    assert!(matches!(gate.require().await, Err(AdminError::AccessRequired)));
    assert!(matches!(
        gate.login(&SecretString::from("guess")).await,
        Err(AdminError::InvalidPassword)
    ));
    assert!(gate.capability().await.is_none());

    gate.login(&SecretString::from(ADMIN_PASSWORD)).await.unwrap();
    assert!(gate.capability().await.is_some());
    assert_eq!(
        ctx.notices(),
        vec![
            Notice::error("Invalid admin password"),
            Notice::success("Admin access granted!"),
        ]
    );

    gate.revoke().await.unwrap();
    assert!(gate.capability().await.is_none());
    gate.revoke().await.unwrap();
}

#[tokio::test]
async fn writes_are_visible_through_cached_catalog() {
    let ctx = TestContext::new().await;
    ctx.seed_product("Candle", 500, 3).await;
    let catalog = ctx.store.catalog();
    let admin = ctx.store.product_admin();

    assert_eq!(catalog.home().await.unwrap().len(), 1);

    let capability = ctx
        .store
        .admin_gate()
        .login(&SecretString::from(ADMIN_PASSWORD))
        .await
        .unwrap();
    let created = admin.create_product(&capability, &lamp()).await.unwrap();
    assert_eq!(catalog.home().await.unwrap().len(), 2);

    let update = ProductUpdate {
        stock: Some(0),
        ..ProductUpdate::default()
    };
    admin
        .update_product(&capability, created.id, &update)
        .await
        .unwrap();
    assert_eq!(catalog.product(created.id).await.unwrap().stock, 0);

    admin.delete_product(&capability, created.id).await.unwrap();
    assert_eq!(catalog.home().await.unwrap().len(), 1);
}

#[tokio::test]
async fn uploaded_image_becomes_product_url() {
    let ctx = TestContext::new().await;
    let capability = ctx
        .store
        .admin_gate()
        .login(&SecretString::from(ADMIN_PASSWORD))
        .await
        .unwrap();
    let admin = ctx.store.product_admin();
    let product = admin.create_product(&capability, &lamp()).await.unwrap();

    let updated = admin
        .upload_image(&capability, product.id, "lamp.png", vec![1, 2, 3], "image/png")
        .await
        .unwrap();

    let url = updated.image_url.unwrap();
    let (_, path) = url.split_once("/object/public/product-images/").unwrap();
    assert!(path.starts_with(&product.id.to_string()));
    assert!(path.ends_with(".png"));
    assert_eq!(
        ctx.gateway.object("product-images", path).await,
        Some(vec![1, 2, 3])
    );
}

#[tokio::test]
async fn invalid_input_is_rejected_before_backend() {
    let ctx = TestContext::new().await;
    let capability = ctx
        .store
        .admin_gate()
        .login(&SecretString::from(ADMIN_PASSWORD))
        .await
        .unwrap();
    let calls = ctx.gateway.call_count();

    let mut input = lamp();
    input.name = "   ".into();
    assert!(matches!(
        ctx.store.product_admin().create_product(&capability, &input).await,
        Err(AdminError::InvalidProduct(_))
    ));
    input = lamp();
    input.stock = -1;
    assert!(ctx.store.product_admin().create_product(&capability, &input).await.is_err());

    assert_eq!(ctx.gateway.call_count(), calls);
}
