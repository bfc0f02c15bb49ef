//! Process-wide gateway configuration.
//!
//! Built once by the CLI, validated, then shared read-only behind an `Arc`.
//! Nothing in the request path reads the environment directly.

use super::routes::RouteTable;
use secrecy::{ExposeSecret, SecretString};
use std::{fmt, str::FromStr};
use thiserror::Error;
use url::Url;

pub const DEFAULT_ALLOWED_ORIGINS: [&str; 4] = [
    "https://wealthwisee.vercel.app",
    "https://wealthwisee.live",
    "https://www.wealthwisee.live",
    "http://localhost:3000",
];

/// Session Token lifetime when none is configured.
pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 60 * 60 * 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    Development,
    Staging,
    #[default]
    Production,
}

impl Environment {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "staging" => Ok(Self::Staging),
            "production" | "prod" => Ok(Self::Production),
            other => Err(ConfigError::UnknownEnvironment(other.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("token secret must not be empty")]
    EmptySecret,
    #[error("development-open routes cannot be enabled in production")]
    DevelopmentOpenInProduction,
    #[error("at least one allowed origin is required")]
    NoOrigins,
    #[error("invalid origin: {0}")]
    InvalidOrigin(String),
    #[error("unknown environment: {0}")]
    UnknownEnvironment(String),
    #[error("token ttl must be positive")]
    InvalidTtl,
}

#[derive(Clone)]
pub struct GatewayConfig {
    allowed_origins: Vec<String>,
    environment: Environment,
    development_open: bool,
    token_secret: SecretString,
    token_ttl_seconds: i64,
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("allowed_origins", &self.allowed_origins)
            .field("environment", &self.environment)
            .field("development_open", &self.development_open)
            .field("token_secret", &"[REDACTED]")
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .finish()
    }
}

impl GatewayConfig {
    #[must_use]
    pub fn new(token_secret: SecretString) -> Self {
        Self {
            allowed_origins: DEFAULT_ALLOWED_ORIGINS
                .iter()
                .map(ToString::to_string)
                .collect(),
            environment: Environment::default(),
            development_open: false,
            token_secret,
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins
            .into_iter()
            .map(|origin| origin.trim().trim_end_matches('/').to_string())
            .filter(|origin| !origin.is_empty())
            .collect();
        self
    }

    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    #[must_use]
    pub fn with_development_open(mut self, enabled: bool) -> Self {
        self.development_open = enabled;
        self
    }

    #[must_use]
    pub fn with_token_ttl_seconds(mut self, ttl: i64) -> Self {
        self.token_ttl_seconds = ttl;
        self
    }

    /// Reject combinations that must never reach a running gateway.
    ///
    /// # Errors
    /// Returns the first violated rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token_secret.expose_secret().trim().is_empty() {
            return Err(ConfigError::EmptySecret);
        }

        if self.development_open && self.environment == Environment::Production {
            return Err(ConfigError::DevelopmentOpenInProduction);
        }

        if self.token_ttl_seconds <= 0 {
            return Err(ConfigError::InvalidTtl);
        }

        if self.allowed_origins.is_empty() {
            return Err(ConfigError::NoOrigins);
        }

        for origin in &self.allowed_origins {
            let parsed =
                Url::parse(origin).map_err(|_| ConfigError::InvalidOrigin(origin.clone()))?;
            if parsed.host_str().is_none() || parsed.path() != "/" {
                return Err(ConfigError::InvalidOrigin(origin.clone()));
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn allowed_origins(&self) -> &[String] {
        &self.allowed_origins
    }

    #[must_use]
    pub const fn environment(&self) -> Environment {
        self.environment
    }

    #[must_use]
    pub const fn token_secret(&self) -> &SecretString {
        &self.token_secret
    }

    #[must_use]
    pub const fn token_ttl_seconds(&self) -> i64 {
        self.token_ttl_seconds
    }

    /// The bypass is live only outside production and only when asked for.
    #[must_use]
    pub fn development_open_enabled(&self) -> bool {
        self.development_open && self.environment != Environment::Production
    }

    #[must_use]
    pub fn route_table(&self) -> RouteTable {
        RouteTable::new(self.development_open_enabled())
    }
}
