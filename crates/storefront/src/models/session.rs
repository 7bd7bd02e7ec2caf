//! Auth-session types exchanged with the hosted backend.

use chrono::{DateTime, Utc};
use secrecy::SecretString;

use super::User;

/// An authenticated session.
///
/// The access token is sent as the bearer credential so the backend's
/// row-level policies scope reads and writes to `user`.
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// Bearer token for data requests.
    pub access_token: SecretString,
    /// Token used by the backend client to mint a new access token.
    pub refresh_token: Option<SecretString>,
    /// When the access token stops being accepted.
    pub expires_at: Option<DateTime<Utc>>,
    /// The signed-in user.
    pub user: User,
}

/// Result of a sign-up request.
#[derive(Debug, Clone)]
pub enum SignUp {
    /// The account was created and signed in immediately.
    SignedIn(AuthSession),
    /// The account was created but must confirm its email first.
    ConfirmationRequired(User),
}

impl SignUp {
    /// The user created by the sign-up.
    #[must_use]
    pub const fn user(&self) -> &User {
        match self {
            Self::SignedIn(session) => &session.user,
            Self::ConfirmationRequired(user) => user,
        }
    }
}

/// An entry on the auth-state-change feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthChange {
    /// A session was established.
    SignedIn(User),
    /// The session ended.
    SignedOut,
    /// The session's user record changed (e.g. email confirmed).
    UserUpdated(User),
}

impl AuthChange {
    /// The user the session now belongs to, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        match self {
            Self::SignedIn(user) | Self::UserUpdated(user) => Some(user),
            Self::SignedOut => None,
        }
    }
}
