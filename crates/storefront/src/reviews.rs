//! Product reviews.
//!
//! Reviews are append-only: there is no edit or delete, and a shopper may
//! review the same product any number of times.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info, instrument};

use shopfront_core::{ProductId, Rating, RatingError, ReviewComment, ReviewCommentError};

use crate::gateway::{GatewayError, ReviewGateway};
use crate::models::{NewReview, ProductReview};
use crate::notice::Notifier;
use crate::session::SessionStore;

/// Errors from review operations.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Log in to add a review")]
    NotSignedIn,

    #[error("Rating must be between 1 and 5")]
    InvalidRating(#[from] RatingError),

    #[error("Review must be between 5 and 500 characters")]
    InvalidComment(#[from] ReviewCommentError),

    #[error("Review error: {0}")]
    Gateway(#[from] GatewayError),
}

/// The review input form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewDraft {
    pub rating: i32,
    pub comment: String,
}

impl Default for ReviewDraft {
    fn default() -> Self {
        Self {
            rating: Rating::default().into(),
            comment: String::new(),
        }
    }
}

impl ReviewDraft {
    #[must_use]
    pub fn new(rating: i32, comment: impl Into<String>) -> Self {
        Self {
            rating,
            comment: comment.into(),
        }
    }
}

/// Reviews of the product currently on display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewsState {
    pub product_id: Option<ProductId>,
    pub reviews: Vec<ProductReview>,
    pub loading: bool,
}

/// Lists and submits reviews. Cheap to clone.
#[derive(Clone)]
pub struct ProductReviews {
    inner: Arc<ReviewsInner>,
}

struct ReviewsInner {
    gateway: Arc<dyn ReviewGateway>,
    session: SessionStore,
    notifier: Notifier,
    state: watch::Sender<ReviewsState>,
}

impl ProductReviews {
    #[must_use]
    pub fn new(gateway: Arc<dyn ReviewGateway>, session: SessionStore, notifier: Notifier) -> Self {
        let (state, _) = watch::channel(ReviewsState::default());
        Self {
            inner: Arc::new(ReviewsInner {
                gateway,
                session,
                notifier,
                state,
            }),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> ReviewsState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ReviewsState> {
        self.inner.state.subscribe()
    }

    /// Load the reviews of `product_id`, newest first.
    ///
    /// On failure the list is emptied rather than left showing another
    /// product's reviews.
    ///
    /// # Errors
    ///
    /// Returns the gateway error.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn fetch_reviews(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ProductReview>, ReviewError> {
        self.inner.state.send_modify(|state| {
            state.product_id = Some(product_id);
            state.loading = true;
        });

        let result = self.inner.gateway.select_reviews(product_id).await;
        let reviews = result.as_ref().map_or_else(|_| Vec::new(), Clone::clone);
        self.inner.state.send_modify(|state| {
            // A later fetch for another product owns the state now
            if state.product_id == Some(product_id) {
                state.reviews = reviews;
                state.loading = false;
            }
        });

        result.map_err(|e| {
            error!(error = %e, "Error fetching reviews");
            self.inner.notifier.error("Failed to fetch reviews");
            e.into()
        })
    }

    /// Validate and store a review, then reload the list and reset `draft`.
    ///
    /// # Errors
    ///
    /// `NotSignedIn`, `InvalidRating` and `InvalidComment` are returned
    /// before any network call and leave `draft` as typed. `Gateway` means
    /// the insert failed.
    #[instrument(skip(self, draft), fields(product_id = %product_id, rating = draft.rating))]
    pub async fn submit_review(
        &self,
        product_id: ProductId,
        draft: &mut ReviewDraft,
    ) -> Result<(), ReviewError> {
        let review = match self.validate(product_id, draft) {
            Ok(review) => review,
            Err(e) => {
                self.inner.notifier.error(e.to_string());
                return Err(e);
            }
        };

        if let Err(e) = self.inner.gateway.insert_review(&review).await {
            error!(error = %e, "Error submitting review");
            self.inner.notifier.error("Failed to submit review");
            return Err(e.into());
        }

        info!("Review submitted");
        self.inner.notifier.success("Review submitted!");
        *draft = ReviewDraft::default();
        let _ = self.fetch_reviews(product_id).await;
        Ok(())
    }

    fn validate(&self, product_id: ProductId, draft: &ReviewDraft) -> Result<NewReview, ReviewError> {
        let user = self
            .inner
            .session
            .current_user()
            .ok_or(ReviewError::NotSignedIn)?;
        Ok(NewReview {
            product_id,
            user_id: user.id,
            rating: Rating::new(draft.rating)?,
            comment: ReviewComment::parse(&draft.comment)?,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use secrecy::SecretString;
    use shopfront_core::Price;

    use super::*;
    use crate::gateway::{FailPoint, MemoryGateway};
    use crate::models::NewProduct;
    use crate::notice::{Notice, drain};

    async fn setup() -> (Arc<MemoryGateway>, SessionStore, Notifier, ProductReviews, ProductId) {
        let gateway = Arc::new(MemoryGateway::new());
        gateway.register_user("critic@b.co", "pw-1").await;
        let product = gateway
            .seed_product(
                NewProduct {
                    name: "Kettle".to_owned(),
                    description: "Steel kettle".to_owned(),
                    price: Price::from_cents(2999).unwrap(),
                    category: "Kitchen".to_owned(),
                    stock: 4,
                    image_url: None,
                },
                Utc::now(),
            )
            .await;
        let session = SessionStore::start(gateway.clone()).await;
        let notifier = Notifier::new();
        let reviews = ProductReviews::new(gateway.clone(), session.clone(), notifier.clone());
        (gateway, session, notifier, reviews, product.id)
    }

    async fn sign_in(session: &SessionStore) {
        session
            .sign_in("critic@b.co", &SecretString::from("pw-1"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_submit_requires_sign_in() {
        let (gateway, _, notifier, reviews, product) = setup().await;
        let mut notices = notifier.subscribe();
        let calls = gateway.call_count();

        let mut draft = ReviewDraft::new(4, "Solid kettle");
        assert!(matches!(
            reviews.submit_review(product, &mut draft).await,
            Err(ReviewError::NotSignedIn)
        ));
        assert_eq!(gateway.call_count(), calls);
        assert_eq!(drain(&mut notices), vec![Notice::error("Log in to add a review")]);
    }

    #[tokio::test]
    async fn test_rating_bounds() {
        let (gateway, session, _, reviews, product) = setup().await;
        sign_in(&session).await;
        let calls = gateway.call_count();

        for rating in [0, 6] {
            let mut draft = ReviewDraft::new(rating, "Fine kettle");
            assert!(matches!(
                reviews.submit_review(product, &mut draft).await,
                Err(ReviewError::InvalidRating(_))
            ));
            assert_eq!(draft.rating, rating);
        }
        assert_eq!(gateway.call_count(), calls);

        for rating in [1, 5] {
            let mut draft = ReviewDraft::new(rating, "Fine kettle");
            reviews.submit_review(product, &mut draft).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_comment_bounds() {
        let (_, session, notifier, reviews, product) = setup().await;
        sign_in(&session).await;
        let mut notices = notifier.subscribe();

        for comment in ["abcd".to_owned(), "x".repeat(501)] {
            let mut draft = ReviewDraft::new(3, comment);
            assert!(matches!(
                reviews.submit_review(product, &mut draft).await,
                Err(ReviewError::InvalidComment(_))
            ));
        }
        assert_eq!(
            drain(&mut notices),
            vec![
                Notice::error("Review must be between 5 and 500 characters"),
                Notice::error("Review must be between 5 and 500 characters"),
            ]
        );

        let mut draft = ReviewDraft::new(3, "x".repeat(500));
        reviews.submit_review(product, &mut draft).await.unwrap();
    }

    #[tokio::test]
    async fn test_submit_refetches_and_resets_draft() {
        let (_, session, notifier, reviews, product) = setup().await;
        sign_in(&session).await;
        let mut notices = notifier.subscribe();

        let mut draft = ReviewDraft::new(2, "Whistle is too loud");
        reviews.submit_review(product, &mut draft).await.unwrap();
        let mut draft = ReviewDraft::new(4, "Boils fast though");
        reviews.submit_review(product, &mut draft).await.unwrap();

        assert_eq!(draft, ReviewDraft::default());
        let state = reviews.snapshot();
        assert_eq!(state.product_id, Some(product));
        assert!(!state.loading);
        let comments: Vec<&str> = state.reviews.iter().map(|r| r.comment.as_str()).collect();
        assert_eq!(comments, vec!["Boils fast though", "Whistle is too loud"]);
        assert_eq!(state.reviews[0].display_name(), "critic@b.co");
        assert_eq!(
            drain(&mut notices),
            vec![
                Notice::success("Review submitted!"),
                Notice::success("Review submitted!"),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_insert_keeps_draft() {
        let (gateway, session, notifier, reviews, product) = setup().await;
        sign_in(&session).await;
        let mut notices = notifier.subscribe();

        gateway.fail_on(FailPoint::InsertReview).await;
        let mut draft = ReviewDraft::new(5, "Lovely kettle");
        assert!(matches!(
            reviews.submit_review(product, &mut draft).await,
            Err(ReviewError::Gateway(_))
        ));
        assert_eq!(draft.comment, "Lovely kettle");
        assert_eq!(drain(&mut notices), vec![Notice::error("Failed to submit review")]);
    }

    #[tokio::test]
    async fn test_failed_fetch_empties_list() {
        let (gateway, session, notifier, reviews, product) = setup().await;
        sign_in(&session).await;
        let mut draft = ReviewDraft::new(5, "Lovely kettle");
        reviews.submit_review(product, &mut draft).await.unwrap();
        assert_eq!(reviews.snapshot().reviews.len(), 1);
        let mut notices = notifier.subscribe();

        gateway.fail_on(FailPoint::SelectReviews).await;
        assert!(reviews.fetch_reviews(product).await.is_err());
        assert!(reviews.snapshot().reviews.is_empty());
        assert_eq!(drain(&mut notices), vec![Notice::error("Failed to fetch reviews")]);
    }
}
