//! Identity provider seam.
//!
//! The lifecycle manager only ever talks to an [`IdentityProvider`]. Errors
//! carry the provider's stable `auth/*` code so callers can map them to
//! user-facing text without knowing the provider's wire format.

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;

/// Stable provider error codes.
pub mod codes {
    pub const INVALID_EMAIL: &str = "auth/invalid-email";
    pub const USER_DISABLED: &str = "auth/user-disabled";
    pub const USER_NOT_FOUND: &str = "auth/user-not-found";
    pub const WRONG_PASSWORD: &str = "auth/wrong-password";
    pub const EMAIL_ALREADY_IN_USE: &str = "auth/email-already-in-use";
    pub const WEAK_PASSWORD: &str = "auth/weak-password";
    pub const INVALID_CREDENTIAL: &str = "auth/invalid-credential";
    pub const TOO_MANY_REQUESTS: &str = "auth/too-many-requests";
    pub const INTERNAL: &str = "auth/internal-error";
}

/// Provider-side handles for a signed-in identity.
#[derive(Debug, Clone, Default)]
pub struct ProviderSession {
    pub id_token: SecretString,
    pub refresh_token: SecretString,
}

/// A provider account as seen right after sign-in or sign-up.
#[derive(Debug, Clone)]
pub struct Identity {
    pub uid: String,
    pub email: String,
    pub email_verified: bool,
    pub session: ProviderSession,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The provider answered and refused the request.
    #[error("provider rejected request: {code}")]
    Rejected { code: String },
    /// The provider could not be reached or answered garbage.
    #[error("provider unreachable: {0}")]
    Transport(String),
}

impl ProviderError {
    pub fn rejected(code: impl Into<String>) -> Self {
        Self::Rejected { code: code.into() }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, ProviderError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, ProviderError>;

    async fn send_verification_email(&self, identity: &Identity) -> Result<(), ProviderError>;

    /// Fresh provider-signed token asserting `identity`.
    async fn issue_token(&self, identity: &Identity) -> Result<SecretString, ProviderError>;

    async fn sign_out(&self) -> Result<(), ProviderError>;
}
