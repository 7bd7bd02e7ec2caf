//! REST adapter for the hosted backend.
//!
//! Tables are served under `/rest/v1/<table>`, auth under `/auth/v1` and
//! object storage under `/storage/v1`. Every request carries the project's
//! anon key as `apikey`; once a user signs in their access token replaces
//! the anon key as the bearer credential, so the backend's row-level
//! policies scope every read and write to that user.

mod auth;
mod query;
mod rows;
mod storage;
mod tables;

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tokio::sync::{RwLock, broadcast};
use tracing::error;

use crate::config::GatewayConfig;
use crate::gateway::{GatewayError, RemoteError};
use crate::models::{AuthChange, AuthSession};

use rows::ErrorBody;

/// Capacity of the auth-change channel. Slow subscribers skip ahead.
const AUTH_EVENT_CAPACITY: usize = 16;

/// Characters of a response body kept in logs and error messages.
const BODY_LOG_LIMIT: usize = 500;

/// Client for the hosted backend's REST, auth and storage endpoints.
#[derive(Clone)]
pub struct RestGateway {
    inner: Arc<RestGatewayInner>,
}

struct RestGatewayInner {
    client: reqwest::Client,
    base_url: String,
    anon_key: SecretString,
    session: RwLock<Option<AuthSession>>,
    auth_events: broadcast::Sender<AuthChange>,
}

impl RestGateway {
    /// Create a client for the project at `config.url`.
    #[must_use]
    pub fn new(config: &GatewayConfig) -> Self {
        let (auth_events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Self {
            inner: Arc::new(RestGatewayInner {
                client: reqwest::Client::new(),
                base_url: config.url.as_str().trim_end_matches('/').to_owned(),
                anon_key: config.anon_key.clone(),
                session: RwLock::new(None),
                auth_events,
            }),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.inner.base_url)
    }

    /// Build a request with the `apikey` header and the current bearer.
    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let bearer = self.inner.session.read().await.as_ref().map_or_else(
            || self.inner.anon_key.expose_secret().to_owned(),
            |session| session.access_token.expose_secret().to_owned(),
        );
        self.inner
            .client
            .request(method, self.endpoint(path))
            .header("apikey", self.inner.anon_key.expose_secret())
            .bearer_auth(bearer)
    }

    /// Send a request and return the body of a successful response.
    async fn send(&self, request: RequestBuilder) -> Result<String, GatewayError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(GatewayError::RateLimited(retry_after));
        }

        // Read the body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            error!(
                status = %status,
                body = %truncate(&response_text),
                "Backend returned non-success status"
            );
            let remote = serde_json::from_str::<ErrorBody>(&response_text).map_or_else(
                |_| RemoteError::new(status.as_u16(), truncate(&response_text)),
                |body| body.into_remote(status.as_u16()),
            );
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    GatewayError::Unauthorized(remote.message)
                }
                StatusCode::NOT_FOUND if remote.code.is_none() => {
                    GatewayError::NotFound(remote.message)
                }
                _ => GatewayError::Remote(remote),
            });
        }

        Ok(response_text)
    }

    /// Send a request and decode its JSON body.
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, GatewayError> {
        let response_text = self.send(request).await?;
        serde_json::from_str(&response_text).map_err(|e| {
            error!(
                error = %e,
                body = %truncate(&response_text),
                "Failed to parse backend response"
            );
            GatewayError::Parse(e)
        })
    }

    /// Send a request whose body is ignored.
    async fn execute_empty(&self, request: RequestBuilder) -> Result<(), GatewayError> {
        self.send(request).await.map(drop)
    }

    /// Decode a `return=representation` response holding exactly one row.
    async fn execute_single<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T, GatewayError> {
        let rows: Vec<T> = self.execute(request).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| GatewayError::NotFound(what.to_owned()))
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(BODY_LOG_LIMIT).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_characters() {
        let body = "é".repeat(BODY_LOG_LIMIT + 10);
        assert_eq!(truncate(&body).chars().count(), BODY_LOG_LIMIT);
        assert_eq!(truncate("short"), "short");
    }
}
