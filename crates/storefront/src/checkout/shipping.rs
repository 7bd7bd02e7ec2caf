//! Shipping form validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use shopfront_core::{Email, PhoneNumber};

use crate::models::ShippingAddress;

/// Country used when the form leaves it blank and nothing is configured.
pub const DEFAULT_COUNTRY: &str = "India";

/// A shipping form failed validation. Display is the message shown to the
/// shopper.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShippingFormError {
    #[error("Please fill in {}", .0.label())]
    Missing(ShippingField),

    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("Please enter a valid 10-digit phone number")]
    InvalidPhone,
}

/// The required fields, in the order they are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShippingField {
    FullName,
    Email,
    Phone,
    Address,
    City,
    State,
    ZipCode,
}

impl ShippingField {
    pub const REQUIRED: [Self; 7] = [
        Self::FullName,
        Self::Email,
        Self::Phone,
        Self::Address,
        Self::City,
        Self::State,
        Self::ZipCode,
    ];

    /// Lower-case words used in messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::FullName => "full name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Address => "address",
            Self::City => "city",
            Self::State => "state",
            Self::ZipCode => "zip code",
        }
    }
}

/// Raw shipping form input as typed by the shopper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShippingForm {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

impl ShippingForm {
    /// A blank form with the email pre-filled, as offered to a signed-in
    /// shopper.
    #[must_use]
    pub fn for_email(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Self::default()
        }
    }

    fn field(&self, field: ShippingField) -> &str {
        match field {
            ShippingField::FullName => &self.full_name,
            ShippingField::Email => &self.email,
            ShippingField::Phone => &self.phone,
            ShippingField::Address => &self.address,
            ShippingField::City => &self.city,
            ShippingField::State => &self.state,
            ShippingField::ZipCode => &self.zip_code,
        }
    }

    /// Check the form and produce the address snapshot stored on the order.
    ///
    /// Stops at the first failure. A blank country becomes
    /// `default_country`.
    ///
    /// # Errors
    ///
    /// Returns the first missing field, then an invalid email, then an
    /// invalid phone number.
    pub fn validate(&self, default_country: &str) -> Result<ShippingAddress, ShippingFormError> {
        if let Some(missing) = ShippingField::REQUIRED
            .into_iter()
            .find(|&field| self.field(field).trim().is_empty())
        {
            return Err(ShippingFormError::Missing(missing));
        }

        let email = Email::parse(self.email.trim()).map_err(|_| ShippingFormError::InvalidEmail)?;
        PhoneNumber::parse(&self.phone).map_err(|_| ShippingFormError::InvalidPhone)?;

        let country = match self.country.trim() {
            "" => default_country.to_owned(),
            country => country.to_owned(),
        };

        Ok(ShippingAddress {
            full_name: self.full_name.trim().to_owned(),
            email: email.into_inner(),
            phone: self.phone.trim().to_owned(),
            address: self.address.trim().to_owned(),
            city: self.city.trim().to_owned(),
            state: self.state.trim().to_owned(),
            zip_code: self.zip_code.trim().to_owned(),
            country,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn filled() -> ShippingForm {
        ShippingForm {
            full_name: "Asha Rao".into(),
            email: "asha@example.com".into(),
            phone: "(123) 456-7890".into(),
            address: "12 MG Road".into(),
            city: "Pune".into(),
            state: "MH".into(),
            zip_code: "411001".into(),
            country: String::new(),
        }
    }

    #[test]
    fn test_valid_form_defaults_country() {
        let address = filled().validate(DEFAULT_COUNTRY).unwrap();
        assert_eq!(address.country, "India");
        assert_eq!(address.phone, "(123) 456-7890");
        assert_eq!(address.full_name, "Asha Rao");
    }

    #[test]
    fn test_explicit_country_kept() {
        let mut form = filled();
        form.country = "Nepal".into();
        assert_eq!(form.validate(DEFAULT_COUNTRY).unwrap().country, "Nepal");
    }

    #[test]
    fn test_first_missing_field_reported() {
        let mut form = filled();
        form.city = "  ".into();
        form.zip_code = String::new();
        let err = form.validate(DEFAULT_COUNTRY).unwrap_err();
        assert_eq!(err, ShippingFormError::Missing(ShippingField::City));
        assert_eq!(err.to_string(), "Please fill in city");

        let err = ShippingForm::default().validate(DEFAULT_COUNTRY).unwrap_err();
        assert_eq!(err.to_string(), "Please fill in full name");

        let mut form = filled();
        form.zip_code = String::new();
        assert_eq!(
            form.validate(DEFAULT_COUNTRY).unwrap_err().to_string(),
            "Please fill in zip code"
        );
    }

    #[test]
    fn test_email_checked_before_phone() {
        let mut form = filled();
        form.email = "asha.example.com".into();
        form.phone = "12345".into();
        assert_eq!(
            form.validate(DEFAULT_COUNTRY).unwrap_err(),
            ShippingFormError::InvalidEmail
        );

        form.email = "asha@example".into();
        assert_eq!(
            form.validate(DEFAULT_COUNTRY).unwrap_err(),
            ShippingFormError::InvalidEmail
        );
    }

    #[test]
    fn test_phone_must_reduce_to_ten_digits() {
        let mut form = filled();
        form.phone = "12345".into();
        let err = form.validate(DEFAULT_COUNTRY).unwrap_err();
        assert_eq!(err.to_string(), "Please enter a valid 10-digit phone number");

        form.phone = "+91 98765 43210".into();
        assert_eq!(
            form.validate(DEFAULT_COUNTRY).unwrap_err(),
            ShippingFormError::InvalidPhone
        );

        form.phone = "123.456.7890".into();
        assert!(form.validate(DEFAULT_COUNTRY).is_ok());
    }

    #[test]
    fn test_form_serde_camel_case() {
        let form: ShippingForm =
            serde_json::from_str(r#"{"fullName":"A","zipCode":"1"}"#).unwrap();
        assert_eq!(form.full_name, "A");
        assert_eq!(form.zip_code, "1");
        assert!(form.country.is_empty());
    }
}
