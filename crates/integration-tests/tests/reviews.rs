//! Review submission bounds.

#![allow(clippy::unwrap_used)]

use shopfront_integration_tests::TestContext;
use shopfront_storefront::reviews::{ReviewDraft, ReviewError};

#[tokio::test]
async fn rating_and_comment_bounds() {
    let ctx = TestContext::new().await;
    ctx.sign_in().await;
    let product = ctx.seed_product("Lamp", 4500, 2).await;
    let reviews = ctx.store.reviews();

    for rating in [0, 6] {
        let mut draft = ReviewDraft::new(rating, "Nice lamp");
        assert!(matches!(
            reviews.submit_review(product.id, &mut draft).await,
            Err(ReviewError::InvalidRating(_))
        ));
    }
    for comment in ["a".repeat(4), "a".repeat(501)] {
        let mut draft = ReviewDraft::new(3, comment);
        assert!(matches!(
            reviews.submit_review(product.id, &mut draft).await,
            Err(ReviewError::InvalidComment(_))
        ));
    }
    assert!(reviews.fetch_reviews(product.id).await.unwrap().is_empty());

    for rating in [1, 5] {
        let mut draft = ReviewDraft::new(rating, "Nice lamp");
        reviews.submit_review(product.id, &mut draft).await.unwrap();
    }

    let listed = reviews.fetch_reviews(product.id).await.unwrap();
    let ratings: Vec<i32> = listed.iter().map(|r| r.rating.into()).collect();
    assert_eq!(ratings, vec![5, 1]);
}

#[tokio::test]
async fn same_user_may_review_repeatedly() {
    let ctx = TestContext::new().await;
    ctx.sign_in().await;
    let product = ctx.seed_product("Lamp", 4500, 2).await;

    for _ in 0..3 {
        let mut draft = ReviewDraft::new(4, "Still good");
        ctx.store
            .reviews()
            .submit_review(product.id, &mut draft)
            .await
            .unwrap();
    }
    assert_eq!(ctx.store.reviews().snapshot().reviews.len(), 3);
}
