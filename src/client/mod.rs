//! Client-side credential lifecycle.
//!
//! [`form`] validates what the user typed, [`bridge`] abstracts the identity
//! provider ([`firebase`] is the production one), [`exchange`] trades a
//! provider token for a backend Session Token, and [`store`] persists the
//! resulting session. [`lifecycle::CredentialManager`] drives all of them.

pub mod bridge;
pub mod config;
pub mod error;
pub mod exchange;
pub mod firebase;
pub mod form;
pub mod lifecycle;
pub mod store;

pub use bridge::{Identity, IdentityProvider, ProviderError};
pub use config::ClientConfig;
pub use error::{AuthAction, LifecycleError, Notice};
pub use exchange::{HttpSessionExchange, SessionExchange};
pub use form::{Field, FieldErrors, Form, FormFields, FormMode};
pub use lifecycle::{AuthStatus, CredentialManager, Destination, LoginOutcome, Transition};
pub use store::{FileStore, KeyValueStore, MemoryStore, SessionRecord, SessionStore};

use anyhow::Result;
use firebase::FirebaseBridge;
use std::sync::Arc;

/// Production wiring: Firebase provider, HTTP exchange, file-backed session.
///
/// # Errors
/// Returns an error if an HTTP client cannot be built or the API URL is
/// unusable.
pub fn manager(config: &ClientConfig) -> Result<CredentialManager> {
    let provider = FirebaseBridge::new(config.provider_api_key().clone(), config.timeout())?;
    let exchange = HttpSessionExchange::new(config.api_url(), config.timeout())?;
    let store = SessionStore::new(Arc::new(FileStore::new(config.session_file())));

    Ok(CredentialManager::new(
        Arc::new(provider),
        Arc::new(exchange),
        store,
        config.timeout(),
    ))
}
