//! Product review types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopfront_core::{ProductId, Rating, ReviewComment, ReviewId, UserId};

/// Minimal profile projection joined onto each review.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerProfile {
    pub email: Option<String>,
    pub full_name: Option<String>,
}

/// A review as listed under a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductReview {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub rating: Rating,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub reviewer: ReviewerProfile,
}

impl ProductReview {
    /// Name shown next to the review: full name, then email, then "Anonymous".
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.reviewer
            .full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .or(self.reviewer.email.as_deref())
            .unwrap_or("Anonymous")
    }
}

/// A validated review ready to insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReview {
    pub product_id: ProductId,
    pub user_id: UserId,
    pub rating: Rating,
    pub comment: ReviewComment,
}
