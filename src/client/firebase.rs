//! [`IdentityProvider`] over the Firebase Identity Toolkit REST API.

use super::bridge::{codes, Identity, IdentityProvider, ProviderError, ProviderSession};
use crate::APP_USER_AGENT;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::{sync::Mutex, time::Duration};
use tracing::{debug, instrument};
use url::Url;

pub const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1/";
pub const SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1/token";

#[derive(Debug)]
pub struct FirebaseBridge {
    client: Client,
    api_key: SecretString,
    identity_url: Url,
    token_url: Url,
    current_uid: Mutex<Option<String>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    local_id: String,
    email: String,
    id_token: String,
    refresh_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdTokenRequest<'a> {
    id_token: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OobRequest<'a> {
    request_type: &'a str,
    id_token: &'a str,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    #[serde(default)]
    email_verified: bool,
}

#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
}

impl FirebaseBridge {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_key: SecretString, timeout: Duration) -> Result<Self> {
        Self::with_endpoints(
            api_key,
            timeout,
            Url::parse(IDENTITY_TOOLKIT_URL)?,
            Url::parse(SECURE_TOKEN_URL)?,
        )
    }

    /// Point the bridge at an emulator or proxy.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_endpoints(
        api_key: SecretString,
        timeout: Duration,
        identity_url: Url,
        token_url: Url,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            api_key,
            identity_url,
            token_url,
            current_uid: Mutex::new(None),
        })
    }

    /// `accounts:<method>` under the identity toolkit base. The `./` keeps the
    /// colon from parsing as a scheme.
    fn endpoint(&self, method: &str) -> Result<Url, ProviderError> {
        let mut url = self
            .identity_url
            .join(&format!("./accounts:{method}"))
            .map_err(|err| ProviderError::Transport(err.to_string()))?;
        url.query_pairs_mut()
            .append_pair("key", self.api_key.expose_secret());
        Ok(url)
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T, ProviderError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(method)?;
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(transport)?;

        read_response(response).await
    }

    async fn lookup_verified(&self, id_token: &str) -> Result<bool, ProviderError> {
        let lookup: LookupResponse = self.call("lookup", &IdTokenRequest { id_token }).await?;
        Ok(lookup.users.first().is_some_and(|user| user.email_verified))
    }

    fn remember(&self, uid: &str) {
        if let Ok(mut current) = self.current_uid.lock() {
            *current = Some(uid.to_string());
        }
    }
}

#[async_trait]
impl IdentityProvider for FirebaseBridge {
    #[instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, ProviderError> {
        let response: PasswordResponse = self
            .call(
                "signInWithPassword",
                &PasswordRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;

        let email_verified = self.lookup_verified(&response.id_token).await?;
        self.remember(&response.local_id);

        Ok(identity(response, email_verified))
    }

    #[instrument(skip(self, password))]
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, ProviderError> {
        let response: PasswordResponse = self
            .call(
                "signUp",
                &PasswordRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;

        self.remember(&response.local_id);

        // new accounts always start unverified
        Ok(identity(response, false))
    }

    #[instrument(skip(self, identity), fields(uid = %identity.uid))]
    async fn send_verification_email(&self, identity: &Identity) -> Result<(), ProviderError> {
        let _: Value = self
            .call(
                "sendOobCode",
                &OobRequest {
                    request_type: "VERIFY_EMAIL",
                    id_token: identity.session.id_token.expose_secret(),
                },
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self, identity), fields(uid = %identity.uid))]
    async fn issue_token(&self, identity: &Identity) -> Result<SecretString, ProviderError> {
        let mut url = self.token_url.clone();
        url.query_pairs_mut()
            .append_pair("key", self.api_key.expose_secret());

        let response = self
            .client
            .post(url)
            .form(&[
                ("grant_type", "refresh_token"),
                (
                    "refresh_token",
                    identity.session.refresh_token.expose_secret(),
                ),
            ])
            .send()
            .await
            .map_err(transport)?;

        let refreshed: RefreshResponse = read_response(response).await?;
        Ok(SecretString::from(refreshed.id_token))
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        // the REST API is stateless; forgetting the local user is the sign-out
        let previous = self
            .current_uid
            .lock()
            .map_err(|_| ProviderError::Transport("provider state poisoned".to_string()))?
            .take();
        debug!(uid = ?previous, "provider session dropped");
        Ok(())
    }
}

fn identity(response: PasswordResponse, email_verified: bool) -> Identity {
    Identity {
        uid: response.local_id,
        email: response.email,
        email_verified,
        session: ProviderSession {
            id_token: SecretString::from(response.id_token),
            refresh_token: SecretString::from(response.refresh_token),
        },
    }
}

fn transport(err: reqwest::Error) -> ProviderError {
    ProviderError::Transport(err.to_string())
}

async fn read_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ProviderError> {
    let status = response.status();

    if status.is_success() {
        return response.json().await.map_err(transport);
    }

    let body: Value = response.json().await.unwrap_or_default();
    let message = body["error"]["message"].as_str().unwrap_or_default();

    debug!(%status, message, "provider rejected request");

    if status.is_server_error() && message.is_empty() {
        return Err(ProviderError::Transport(format!("provider returned {status}")));
    }

    Err(ProviderError::rejected(error_code(message)))
}

/// Map an Identity Toolkit error message (`"WEAK_PASSWORD : Password should
/// be at least 6 characters"`) to its stable `auth/*` code.
#[must_use]
pub fn error_code(message: &str) -> String {
    let reason = message.split(':').next().unwrap_or_default().trim();

    match reason {
        "EMAIL_NOT_FOUND" => codes::USER_NOT_FOUND.to_string(),
        "INVALID_PASSWORD" => codes::WRONG_PASSWORD.to_string(),
        "USER_DISABLED" => codes::USER_DISABLED.to_string(),
        "INVALID_EMAIL" => codes::INVALID_EMAIL.to_string(),
        "EMAIL_EXISTS" => codes::EMAIL_ALREADY_IN_USE.to_string(),
        "WEAK_PASSWORD" => codes::WEAK_PASSWORD.to_string(),
        "INVALID_LOGIN_CREDENTIALS" => codes::INVALID_CREDENTIAL.to_string(),
        "" => codes::INTERNAL.to_string(),
        other if other.starts_with("TOO_MANY_ATTEMPTS_TRY_LATER") => {
            codes::TOO_MANY_REQUESTS.to_string()
        }
        other => format!("auth/{}", other.to_lowercase().replace('_', "-")),
    }
}
