//! Unified error handling with Sentry integration.
//!
//! Every module error rolls up into [`Error`]. Front ends show
//! [`Error::user_message`] and call [`Error::report`] so that backend
//! failures reach Sentry while shopper mistakes do not.

use thiserror::Error;

use crate::admin::AdminError;
use crate::cart::CartError;
use crate::catalog::CatalogError;
use crate::checkout::CheckoutError;
use crate::config::ConfigError;
use crate::gateway::GatewayError;
use crate::reviews::ReviewError;
use crate::session::SessionError;
use crate::wishlist::WishlistError;

/// Storefront-level error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Wishlist(#[from] WishlistError),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Review(#[from] ReviewError),

    #[error(transparent)]
    Admin(#[from] AdminError),
}

impl Error {
    /// The gateway failure underneath, if this is one.
    #[must_use]
    pub const fn gateway(&self) -> Option<&GatewayError> {
        match self {
            Self::Session(SessionError::Gateway(e))
            | Self::Catalog(CatalogError::Gateway(e))
            | Self::Cart(CartError::Gateway(e))
            | Self::Wishlist(WishlistError::Gateway(e))
            | Self::Checkout(CheckoutError::Gateway(e))
            | Self::Review(ReviewError::Gateway(e))
            | Self::Admin(AdminError::Gateway(e)) => Some(e),
            _ => None,
        }
    }

    /// Whether the failure is ours or the backend's rather than the
    /// shopper's.
    #[must_use]
    pub const fn is_server_side(&self) -> bool {
        match self {
            Self::Config(_) | Self::Admin(AdminError::Flag(_)) => true,
            _ => match self.gateway() {
                Some(e) => is_server_side(e),
                None => false,
            },
        }
    }

    /// Text safe to show the shopper. Backend details stay in the logs.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self.gateway() {
            Some(GatewayError::Unauthorized(_)) => match self {
                Self::Session(_) => "Invalid email or password".to_string(),
                _ => "Your session has expired. Please log in again.".to_string(),
            },
            Some(GatewayError::RateLimited(secs)) => {
                format!("Too many requests. Please try again in {secs} seconds.")
            }
            Some(GatewayError::NotFound(_)) => "Not found".to_string(),
            Some(_) => "Something went wrong. Please try again.".to_string(),
            None => self.to_string(),
        }
    }

    /// Log the error, and capture it to Sentry when it is server-side.
    pub fn report(&self) {
        if self.is_server_side() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Storefront error"
            );
        } else {
            tracing::debug!(error = %self, "Rejected request");
        }
    }
}

const fn is_server_side(error: &GatewayError) -> bool {
    match error {
        GatewayError::Http(_) | GatewayError::Parse(_) | GatewayError::Decode(_) => true,
        GatewayError::Remote(remote) => remote.status >= 500,
        GatewayError::NotFound(_)
        | GatewayError::Unauthorized(_)
        | GatewayError::RateLimited(_) => false,
    }
}

/// Result type alias for [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::RemoteError;

    #[test]
    fn test_validation_errors_are_shown_verbatim() {
        let err = Error::from(CartError::NotSignedIn);
        assert!(!err.is_server_side());
        assert_eq!(err.user_message(), "Please log in to add items to cart");

        let err = Error::from(ReviewError::NotSignedIn);
        assert_eq!(err.user_message(), "Log in to add a review");
    }

    #[test]
    fn test_backend_failures_are_hidden() {
        let err = Error::from(CheckoutError::Gateway(GatewayError::Remote(RemoteError::new(
            503,
            "upstream connect error",
        ))));
        assert!(err.is_server_side());
        assert_eq!(err.user_message(), "Something went wrong. Please try again.");
    }

    #[test]
    fn test_client_side_remote_errors() {
        let err = Error::from(WishlistError::Gateway(GatewayError::Remote(
            RemoteError::new(409, "duplicate key").with_code("23505"),
        )));
        assert!(!err.is_server_side());

        let err = Error::from(SessionError::Gateway(GatewayError::Unauthorized(
            "Invalid login credentials".into(),
        )));
        assert!(!err.is_server_side());
        assert_eq!(err.user_message(), "Invalid email or password");

        let err = Error::from(CartError::Gateway(GatewayError::RateLimited(30)));
        assert_eq!(
            err.user_message(),
            "Too many requests. Please try again in 30 seconds."
        );
    }

    #[test]
    fn test_config_errors_are_server_side() {
        let err = Error::from(ConfigError::MissingEnvVar("SHOPFRONT_GATEWAY_URL".into()));
        assert!(err.is_server_side());
        assert_eq!(
            err.user_message(),
            "Configuration error: Missing environment variable: SHOPFRONT_GATEWAY_URL"
        );
    }
}
