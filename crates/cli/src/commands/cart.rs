use shopfront_storefront::{Result, Storefront};

use crate::CartAction;
use crate::output;

pub async fn run(store: &Storefront, action: CartAction) -> Result<()> {
    let cart = store.cart();
    match action {
        CartAction::Show => {
            cart.fetch_cart_items().await?;
        }
        CartAction::Add { id, quantity } => cart.add_to_cart(id, quantity).await?,
        CartAction::Update { item_id, quantity } => cart.update_quantity(item_id, quantity).await?,
        CartAction::Remove { item_id } => cart.remove_from_cart(item_id).await?,
        CartAction::Clear => cart.clear_cart().await?,
    }
    output::cart(&cart.snapshot());
    Ok(())
}
