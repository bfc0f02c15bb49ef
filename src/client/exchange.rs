//! Provider token → backend Session Token.
//!
//! The gateway only trusts tokens it signed itself, so a provider token is
//! presented once to the backend login endpoint and never stored.

use crate::APP_USER_AGENT;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

/// Resolved against the API base URL, keeping any path prefix it has.
pub const LOGIN_PATH: &str = "api/login";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    #[error("backend refused session exchange: {0}")]
    Rejected(StatusCode),
    #[error("backend unreachable: {0}")]
    Transport(String),
    #[error("backend returned an unreadable session: {0}")]
    Malformed(String),
}

impl ExchangeError {
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

#[async_trait]
pub trait SessionExchange: Send + Sync {
    async fn exchange(
        &self,
        email: &str,
        provider_token: &SecretString,
    ) -> Result<SecretString, ExchangeError>;
}

#[derive(Debug, Clone)]
pub struct HttpSessionExchange {
    client: Client,
    login_url: Url,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

impl HttpSessionExchange {
    /// # Errors
    /// Returns an error if `api_base` cannot host the login path or the HTTP
    /// client cannot be built.
    pub fn new(api_base: &Url, timeout: Duration) -> anyhow::Result<Self> {
        let login_url = login_url(api_base)?;
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self { client, login_url })
    }

    #[must_use]
    pub const fn login_url(&self) -> &Url {
        &self.login_url
    }
}

fn login_url(api_base: &Url) -> Result<Url, url::ParseError> {
    let mut base = api_base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(LOGIN_PATH)
}

#[async_trait]
impl SessionExchange for HttpSessionExchange {
    #[instrument(skip(self, provider_token), fields(url = %self.login_url))]
    async fn exchange(
        &self,
        email: &str,
        provider_token: &SecretString,
    ) -> Result<SecretString, ExchangeError> {
        let response = self
            .client
            .post(self.login_url.clone())
            .bearer_auth(provider_token.expose_secret())
            .json(&LoginRequest { email })
            .send()
            .await
            .map_err(|err| ExchangeError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            debug!(%status, "session exchange refused");
            return Err(ExchangeError::Rejected(status));
        }

        let body: LoginResponse = response
            .json()
            .await
            .map_err(|err| ExchangeError::Malformed(err.to_string()))?;

        if body.token.is_empty() {
            return Err(ExchangeError::Malformed("empty token".to_string()));
        }

        Ok(SecretString::from(body.token))
    }
}
