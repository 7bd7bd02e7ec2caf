//! Session store.
//!
//! Holds the signed-in user for the whole process. Two writers feed the
//! same `watch` channel: a background task following the gateway's
//! auth-change feed, and the one-off session fetch made at start-up. Both
//! converge on the backend's session, so whichever lands last wins.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use shopfront_core::{Email, EmailError};

use crate::gateway::{AuthGateway, GatewayError};
use crate::models::{AuthChange, SignUp, User};
use crate::telemetry::{clear_sentry_user, set_sentry_user};

/// Errors from sign-in and sign-up.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("Password is required")]
    MissingPassword,

    #[error("Auth error: {0}")]
    Gateway(#[from] GatewayError),
}

/// Process-wide authentication state. Cheap to clone.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    auth: Arc<dyn AuthGateway>,
    state: Arc<watch::Sender<Option<User>>>,
    listener: JoinHandle<()>,
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

impl SessionStore {
    /// Subscribe to the auth feed and load the current session.
    ///
    /// A failed initial fetch is logged and leaves the store signed out;
    /// the feed still updates it later.
    pub async fn start(auth: Arc<dyn AuthGateway>) -> Self {
        let (sender, _) = watch::channel(None);
        let state = Arc::new(sender);
        let listener = tokio::spawn(follow_auth_changes(auth.subscribe(), Arc::clone(&state)));

        match auth.current_session().await {
            Ok(session) => {
                state.send_replace(session.map(|s| s.user));
            }
            Err(e) => warn!(error = %e, "Failed to load current session"),
        }

        Self {
            inner: Arc::new(SessionInner {
                auth,
                state,
                listener,
            }),
        }
    }

    /// The signed-in user, if any.
    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.inner.state.borrow().is_some()
    }

    /// Whether the signed-in user has confirmed their email.
    #[must_use]
    pub fn is_email_verified(&self) -> bool {
        self.inner
            .state
            .borrow()
            .as_ref()
            .is_some_and(|user| user.email_verified)
    }

    /// Watch the signed-in user change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.inner.state.subscribe()
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEmail` or `MissingPassword` before any network call,
    /// or `Gateway` when the backend rejects the credentials.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &SecretString) -> Result<User, SessionError> {
        let email = Email::parse(email)?;
        if password.expose_secret().is_empty() {
            return Err(SessionError::MissingPassword);
        }

        let session = self.inner.auth.sign_in(&email, password).await?;
        let user = session.user;
        self.inner.state.send_replace(Some(user.clone()));
        set_sentry_user(&user.id, Some(&user.email));
        info!(user_id = %user.id, "Signed in");
        Ok(user)
    }

    /// Register a new account.
    ///
    /// When the backend requires email confirmation the user is returned
    /// but stays signed out.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEmail` or `MissingPassword` before any network call,
    /// or `Gateway` when the backend rejects the sign-up.
    #[instrument(skip(self, password))]
    pub async fn sign_up(&self, email: &str, password: &SecretString) -> Result<User, SessionError> {
        let email = Email::parse(email)?;
        if password.expose_secret().is_empty() {
            return Err(SessionError::MissingPassword);
        }

        match self.inner.auth.sign_up(&email, password).await? {
            SignUp::SignedIn(session) => {
                let user = session.user;
                self.inner.state.send_replace(Some(user.clone()));
                set_sentry_user(&user.id, Some(&user.email));
                info!(user_id = %user.id, "Signed up and signed in");
                Ok(user)
            }
            SignUp::ConfirmationRequired(user) => {
                info!(user_id = %user.id, "Signed up, awaiting email confirmation");
                Ok(user)
            }
        }
    }

    /// Sign out. Never fails: a backend error is logged and the local
    /// session is cleared regardless.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) {
        if let Err(e) = self.inner.auth.sign_out().await {
            warn!(error = %e, "Sign-out request failed; clearing local session anyway");
        }
        self.inner.state.send_replace(None);
        clear_sentry_user();
    }
}

async fn follow_auth_changes(
    mut feed: broadcast::Receiver<AuthChange>,
    state: Arc<watch::Sender<Option<User>>>,
) {
    loop {
        match feed.recv().await {
            Ok(change) => {
                debug!(?change, "Auth state changed");
                state.send_replace(change.user().cloned());
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Auth feed lagged; waiting for the next change");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::gateway::{FailPoint, MemoryGateway};

    fn password(s: &str) -> SecretString {
        SecretString::from(s)
    }

    #[tokio::test]
    async fn test_start_loads_existing_session() {
        let gateway = Arc::new(MemoryGateway::new());
        gateway.register_user("a@b.co", "pw-1").await;
        gateway
            .sign_in(&Email::parse("a@b.co").unwrap(), &password("pw-1"))
            .await
            .unwrap();

        let store = SessionStore::start(gateway).await;
        assert!(store.is_signed_in());
        assert_eq!(store.current_user().unwrap().email, "a@b.co");
    }

    #[tokio::test]
    async fn test_start_survives_failed_fetch() {
        let gateway = Arc::new(MemoryGateway::new());
        gateway.fail_on(FailPoint::CurrentSession).await;
        let store = SessionStore::start(gateway).await;
        assert!(!store.is_signed_in());
    }

    #[tokio::test]
    async fn test_sign_in_updates_state() {
        let gateway = Arc::new(MemoryGateway::new());
        let user = gateway.register_user("a@b.co", "pw-1").await;
        let store = SessionStore::start(gateway).await;

        let signed_in = store.sign_in("a@b.co", &password("pw-1")).await.unwrap();
        assert_eq!(signed_in, user);
        assert!(store.is_signed_in());
        assert!(store.is_email_verified());
    }

    #[tokio::test]
    async fn test_sign_in_validates_before_network() {
        let gateway = Arc::new(MemoryGateway::new());
        let store = SessionStore::start(gateway.clone()).await;
        let calls = gateway.call_count();

        assert!(matches!(
            store.sign_in("not-an-email", &password("pw")).await,
            Err(SessionError::InvalidEmail(_))
        ));
        assert!(matches!(
            store.sign_in("a@b.co", &password("")).await,
            Err(SessionError::MissingPassword)
        ));
        assert_eq!(gateway.call_count(), calls);
    }

    #[tokio::test]
    async fn test_sign_in_rejects_bad_password() {
        let gateway = Arc::new(MemoryGateway::new());
        gateway.register_user("a@b.co", "pw-1").await;
        let store = SessionStore::start(gateway).await;

        let err = store.sign_in("a@b.co", &password("wrong")).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Gateway(GatewayError::Unauthorized(_))
        ));
        assert!(!store.is_signed_in());
    }

    #[tokio::test]
    async fn test_sign_up_with_confirmation_stays_signed_out() {
        let gateway = Arc::new(MemoryGateway::new());
        gateway.require_email_confirmation(true);
        let store = SessionStore::start(gateway).await;

        let user = store.sign_up("new@b.co", &password("pw-1")).await.unwrap();
        assert!(!user.email_verified);
        assert!(!store.is_signed_in());
    }

    #[tokio::test]
    async fn test_sign_out_clears_even_on_failure() {
        let gateway = Arc::new(MemoryGateway::new());
        gateway.register_user("a@b.co", "pw-1").await;
        let store = SessionStore::start(gateway.clone()).await;
        store.sign_in("a@b.co", &password("pw-1")).await.unwrap();

        gateway.fail_on(FailPoint::SignOut).await;
        store.sign_out().await;
        assert!(!store.is_signed_in());
        assert!(store.current_user().is_none());
    }

    #[tokio::test]
    async fn test_auth_feed_updates_state() {
        let gateway = Arc::new(MemoryGateway::new());
        let store = SessionStore::start(gateway.clone()).await;
        let mut watcher = store.subscribe();

        let user = User {
            id: shopfront_core::UserId::random(),
            email: "other@b.co".into(),
            email_verified: false,
        };
        gateway.emit(AuthChange::SignedIn(user.clone()));
        watcher.changed().await.unwrap();
        assert_eq!(store.current_user(), Some(user));

        gateway.emit(AuthChange::SignedOut);
        watcher.changed().await.unwrap();
        assert!(!store.is_signed_in());
    }
}
