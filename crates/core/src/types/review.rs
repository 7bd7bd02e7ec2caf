//! Validated review input.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Rating`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RatingError {
    /// The value is outside 1..=5.
    #[error("rating must be between {min} and {max} (got {0})", min = Rating::MIN, max = Rating::MAX)]
    OutOfRange(i32),
}

/// A star rating from 1 to 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Rating(u8);

impl Rating {
    /// Lowest accepted rating.
    pub const MIN: i32 = 1;
    /// Highest accepted rating.
    pub const MAX: i32 = 5;

    /// Create a rating.
    ///
    /// # Errors
    ///
    /// Returns `RatingError::OutOfRange` for values outside 1..=5.
    pub fn new(value: i32) -> Result<Self, RatingError> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(RatingError::OutOfRange(value));
        }
        u8::try_from(value)
            .map(Self)
            .map_err(|_| RatingError::OutOfRange(value))
    }

    /// The number of stars.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }
}

impl Default for Rating {
    /// New review forms start at five stars.
    fn default() -> Self {
        Self(5)
    }
}

impl TryFrom<i32> for Rating {
    type Error = RatingError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for i32 {
    fn from(rating: Rating) -> Self {
        Self::from(rating.0)
    }
}

/// Renders as filled and empty stars, e.g. `★★★☆☆`.
impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filled = usize::from(self.0);
        write!(f, "{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
    }
}

/// Errors that can occur when constructing a [`ReviewComment`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ReviewCommentError {
    /// Fewer characters than the minimum.
    #[error("review must be at least {min} characters (got {actual})")]
    TooShort {
        /// Minimum length.
        min: usize,
        /// Length supplied.
        actual: usize,
    },
    /// More characters than the maximum.
    #[error("review must be at most {max} characters (got {actual})")]
    TooLong {
        /// Maximum length.
        max: usize,
        /// Length supplied.
        actual: usize,
    },
}

/// Review body text between 5 and 500 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewComment(String);

impl ReviewComment {
    /// Minimum length in characters.
    pub const MIN_LENGTH: usize = 5;
    /// Maximum length in characters.
    pub const MAX_LENGTH: usize = 500;

    /// Validate a comment. Length is counted in characters, not bytes.
    ///
    /// # Errors
    ///
    /// Returns `TooShort` or `TooLong` when outside 5..=500 characters.
    pub fn parse(s: &str) -> Result<Self, ReviewCommentError> {
        let actual = s.chars().count();
        if actual < Self::MIN_LENGTH {
            return Err(ReviewCommentError::TooShort {
                min: Self::MIN_LENGTH,
                actual,
            });
        }
        if actual > Self::MAX_LENGTH {
            return Err(ReviewCommentError::TooLong {
                max: Self::MAX_LENGTH,
                actual,
            });
        }
        Ok(Self(s.to_owned()))
    }

    /// The comment text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds() {
        assert_eq!(Rating::new(0), Err(RatingError::OutOfRange(0)));
        assert_eq!(Rating::new(6), Err(RatingError::OutOfRange(6)));
        assert_eq!(Rating::new(1).unwrap().value(), 1);
        assert_eq!(Rating::new(5).unwrap().value(), 5);
    }

    #[test]
    fn test_rating_stars() {
        assert_eq!(Rating::new(3).unwrap().to_string(), "★★★☆☆");
    }

    #[test]
    fn test_rating_deserialize_validates() {
        assert!(serde_json::from_str::<Rating>("4").is_ok());
        assert!(serde_json::from_str::<Rating>("9").is_err());
    }

    #[test]
    fn test_comment_bounds() {
        assert!(matches!(
            ReviewComment::parse("abcd"),
            Err(ReviewCommentError::TooShort { actual: 4, .. })
        ));
        assert!(ReviewComment::parse("abcde").is_ok());
        assert!(ReviewComment::parse(&"x".repeat(500)).is_ok());
        assert!(matches!(
            ReviewComment::parse(&"x".repeat(501)),
            Err(ReviewCommentError::TooLong { actual: 501, .. })
        ));
    }

    #[test]
    fn test_comment_counts_characters() {
        assert!(ReviewComment::parse("héllo").is_ok());
    }
}
