//! User domain types.
//!
//! Users are issued by the hosted backend's auth service; nothing here is
//! stored locally.

use serde::{Deserialize, Serialize};

use shopfront_core::UserId;

/// A signed-in shopper as reported by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Auth-service user ID. Scopes every cart, wishlist and order row.
    pub id: UserId,
    /// Email address the account was registered with.
    pub email: String,
    /// Whether the address has been confirmed.
    pub email_verified: bool,
}
