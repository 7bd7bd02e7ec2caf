use shopfront_storefront::{Result, Storefront};

use crate::ProductsAction;
use crate::output;

pub async fn run(store: &Storefront, action: ProductsAction) -> Result<()> {
    let catalog = store.catalog();
    match action {
        ProductsAction::List => output::products(&catalog.home().await?),
        ProductsAction::Categories => {
            for category in catalog.categories().await?.iter() {
                output::line(category);
            }
        }
        ProductsAction::Category { name } => output::products(&catalog.category(&name).await?),
        ProductsAction::Search { term } => output::products(&catalog.search(&term).await?),
        ProductsAction::Show { id } => output::product(&catalog.product(id).await?),
    }
    Ok(())
}
