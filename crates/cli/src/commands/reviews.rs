use shopfront_storefront::reviews::ReviewDraft;
use shopfront_storefront::{Result, Storefront};

use crate::ReviewsAction;
use crate::output;

pub async fn run(store: &Storefront, action: ReviewsAction) -> Result<()> {
    let reviews = store.reviews();
    match action {
        ReviewsAction::List { id } => {
            reviews.fetch_reviews(id).await?;
        }
        ReviewsAction::Add {
            id,
            rating,
            comment,
        } => {
            let mut draft = ReviewDraft::new(rating, comment);
            reviews.submit_review(id, &mut draft).await?;
        }
    }
    output::reviews(&reviews.snapshot().reviews);
    Ok(())
}
