//! Phone number type for shipping contacts.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`PhoneNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneNumberError {
    /// The input does not reduce to exactly ten digits.
    #[error("phone number must contain exactly {expected} digits (got {actual})")]
    DigitCount {
        /// Required digit count.
        expected: usize,
        /// Digits found in the input.
        actual: usize,
    },
}

/// A ten-digit phone number.
///
/// Formatting characters are stripped on parse, so `(123) 456-7890` and
/// `123.456.7890` both become `1234567890`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Number of digits a phone number must reduce to.
    pub const DIGITS: usize = 10;

    /// Parse a phone number, ignoring every non-digit character.
    ///
    /// # Errors
    ///
    /// Returns `PhoneNumberError::DigitCount` unless exactly ten digits remain.
    pub fn parse(s: &str) -> Result<Self, PhoneNumberError> {
        let digits: String = s.chars().filter(char::is_ascii_digit).collect();
        if digits.len() != Self::DIGITS {
            return Err(PhoneNumberError::DigitCount {
                expected: Self::DIGITS,
                actual: digits.len(),
            });
        }
        Ok(Self(digits))
    }

    /// The bare digits.
    #[must_use]
    pub fn digits(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_formatted_number_passes() {
        let phone = PhoneNumber::parse("(123) 456-7890").unwrap();
        assert_eq!(phone.digits(), "1234567890");
    }

    #[test]
    fn test_short_number_fails() {
        assert_eq!(
            PhoneNumber::parse("12345"),
            Err(PhoneNumberError::DigitCount {
                expected: 10,
                actual: 5
            })
        );
    }

    #[test]
    fn test_country_prefix_is_too_long() {
        assert!(PhoneNumber::parse("+1 123 456 7890").is_err());
    }
}
