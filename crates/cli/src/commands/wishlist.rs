use shopfront_storefront::{Result, Storefront};

use crate::WishlistAction;
use crate::output;

pub async fn run(store: &Storefront, action: WishlistAction) -> Result<()> {
    let wishlist = store.wishlist();
    match action {
        WishlistAction::Show => wishlist.fetch_wishlist_items().await?,
        WishlistAction::Add { id } => wishlist.add_to_wishlist(id).await?,
        WishlistAction::Remove { id } => wishlist.remove_from_wishlist(id).await?,
        WishlistAction::Clear => wishlist.clear_wishlist().await?,
    }
    output::wishlist(&wishlist.snapshot().lines);
    Ok(())
}
