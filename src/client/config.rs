use secrecy::SecretString;
use std::{path::PathBuf, time::Duration};
use url::Url;

pub const DEFAULT_API_URL: &str = "http://localhost:5001";
pub const DEFAULT_SESSION_FILE: &str = ".wealthwise-session.json";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 15;

/// Settings for the client-side credential lifecycle.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    api_url: Url,
    provider_api_key: SecretString,
    session_file: PathBuf,
    timeout: Duration,
}

impl ClientConfig {
    #[must_use]
    pub fn new(api_url: Url, provider_api_key: SecretString) -> Self {
        Self {
            api_url,
            provider_api_key,
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
        }
    }

    #[must_use]
    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = path.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn api_url(&self) -> &Url {
        &self.api_url
    }

    #[must_use]
    pub const fn provider_api_key(&self) -> &SecretString {
        &self.provider_api_key
    }

    #[must_use]
    pub const fn session_file(&self) -> &PathBuf {
        &self.session_file
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}
