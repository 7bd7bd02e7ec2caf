//! Auth port over `/auth/v1`.
//!
//! The gateway keeps the current session in memory, swaps it into the
//! bearer header of later requests and publishes every change on the
//! auth-change feed. Expired access tokens are refreshed here, so callers
//! never see refresh logic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, instrument, warn};

use shopfront_core::Email;

use super::RestGateway;
use super::rows::{PasswordCredentials, SignUpResponse, TokenResponse};
use crate::gateway::{AuthGateway, GatewayError};
use crate::models::{AuthChange, AuthSession, SignUp, User};

const TOKEN: &str = "auth/v1/token";
const SIGNUP: &str = "auth/v1/signup";
const LOGOUT: &str = "auth/v1/logout";

#[derive(Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

impl From<TokenResponse> for AuthSession {
    fn from(token: TokenResponse) -> Self {
        Self {
            access_token: SecretString::from(token.access_token),
            refresh_token: token.refresh_token.map(SecretString::from),
            expires_at: token
                .expires_at
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
            user: User::from(token.user),
        }
    }
}

impl RestGateway {
    /// Store `session` and announce it.
    async fn establish(&self, session: AuthSession, change: AuthChange) {
        *self.inner.session.write().await = Some(session);
        // No subscribers is fine
        let _ = self.inner.auth_events.send(change);
    }

    async fn refresh(&self, refresh_token: &SecretString) -> Result<AuthSession, GatewayError> {
        let request = self
            .request(Method::POST, TOKEN)
            .await
            .query(&[("grant_type", "refresh_token")])
            .json(&RefreshGrant {
                refresh_token: refresh_token.expose_secret(),
            });
        let token: TokenResponse = self.execute(request).await?;
        Ok(AuthSession::from(token))
    }
}

fn is_expired(session: &AuthSession) -> bool {
    session
        .expires_at
        .is_some_and(|expires_at| expires_at <= Utc::now())
}

#[async_trait]
impl AuthGateway for RestGateway {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthSession, GatewayError> {
        let request = self
            .request(Method::POST, TOKEN)
            .await
            .query(&[("grant_type", "password")])
            .json(&PasswordCredentials {
                email: email.as_str(),
                password: password.expose_secret(),
            });
        let token: TokenResponse = self.execute(request).await?;
        let session = AuthSession::from(token);
        self.establish(session.clone(), AuthChange::SignedIn(session.user.clone()))
            .await;
        Ok(session)
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<SignUp, GatewayError> {
        let request = self.request(Method::POST, SIGNUP).await.json(&PasswordCredentials {
            email: email.as_str(),
            password: password.expose_secret(),
        });
        match self.execute::<SignUpResponse>(request).await? {
            SignUpResponse::Session(token) => {
                let session = AuthSession::from(token);
                self.establish(session.clone(), AuthChange::SignedIn(session.user.clone()))
                    .await;
                Ok(SignUp::SignedIn(session))
            }
            SignUpResponse::User(user) => Ok(SignUp::ConfirmationRequired(User::from(user))),
        }
    }

    #[instrument(skip(self))]
    async fn sign_out(&self) -> Result<(), GatewayError> {
        if self.inner.session.read().await.is_none() {
            return Ok(());
        }
        // Build the request while the user's token is still the bearer
        let request = self.request(Method::POST, LOGOUT).await;
        let result = self.execute_empty(request).await;

        // The local session ends even when the backend call fails
        *self.inner.session.write().await = None;
        let _ = self.inner.auth_events.send(AuthChange::SignedOut);
        result
    }

    #[instrument(skip(self))]
    async fn current_session(&self) -> Result<Option<AuthSession>, GatewayError> {
        let Some(session) = self.inner.session.read().await.clone() else {
            return Ok(None);
        };
        if !is_expired(&session) {
            return Ok(Some(session));
        }
        let Some(refresh_token) = session.refresh_token.as_ref() else {
            warn!("Session expired without a refresh token");
            *self.inner.session.write().await = None;
            let _ = self.inner.auth_events.send(AuthChange::SignedOut);
            return Ok(None);
        };

        debug!("Refreshing expired access token");
        let refreshed = self.refresh(refresh_token).await?;
        let change = AuthChange::UserUpdated(refreshed.user.clone());
        self.establish(refreshed.clone(), change).await;
        Ok(Some(refreshed))
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.inner.auth_events.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_token_response_to_session() {
        let token: TokenResponse = serde_json::from_str(
            r#"{"access_token":"abc","refresh_token":"def","expires_at":1714557600,
                "user":{"id":"6f1c1f3e-2a8e-4c57-9d8e-1d2b3c4d5e6f","email":"a@b.co",
                "email_confirmed_at":null}}"#,
        )
        .unwrap();
        let session = AuthSession::from(token);
        assert_eq!(session.access_token.expose_secret(), "abc");
        assert_eq!(session.user.email, "a@b.co");
        assert!(!session.user.email_verified);
        assert_eq!(
            session.expires_at.unwrap().to_rfc3339(),
            "2024-05-01T10:00:00+00:00"
        );
        assert!(is_expired(&session));
    }
}
