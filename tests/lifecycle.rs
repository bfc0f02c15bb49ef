use anyhow::Result;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tokio::sync::Notify;
use wealthwise::client::{
    bridge::{codes, ProviderSession},
    error::{SIGN_IN_FALLBACK, TIMEOUT_MESSAGE, VERIFICATION_SENT_MESSAGE, VERIFY_EMAIL_MESSAGE},
    exchange::ExchangeError,
    store::{EMAIL_KEY, TOKEN_KEY},
    AuthStatus, CredentialManager, Destination, Field, Form, FormFields, FormMode, Identity,
    IdentityProvider, KeyValueStore, LifecycleError, LoginOutcome, MemoryStore, ProviderError,
    SessionExchange, SessionRecord, SessionStore,
};

const PROVIDER_TOKEN: &str = "provider-id-token";
const BACKEND_TOKEN: &str = "backend-session-token";

#[derive(Default)]
struct FakeProvider {
    email_verified: bool,
    sign_in_error: Option<ProviderError>,
    sign_up_error: Option<ProviderError>,
    sign_out_error: Option<ProviderError>,
    delay: Option<Duration>,
    gate: Option<Arc<Notify>>,
    calls: Mutex<Vec<&'static str>>,
    verification_emails: AtomicUsize,
}

impl FakeProvider {
    fn verified() -> Self {
        Self {
            email_verified: true,
            ..Self::default()
        }
    }

    fn record(&self, call: &'static str) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    fn identity(&self, email: &str) -> Identity {
        Identity {
            uid: "uid-1".to_string(),
            email: email.to_string(),
            email_verified: self.email_verified,
            session: ProviderSession::default(),
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    async fn sign_in(&self, email: &str, _password: &str) -> Result<Identity, ProviderError> {
        self.record("sign_in");
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.sign_in_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.identity(email)),
        }
    }

    async fn sign_up(&self, email: &str, _password: &str) -> Result<Identity, ProviderError> {
        self.record("sign_up");
        match &self.sign_up_error {
            Some(err) => Err(err.clone()),
            None => Ok(Identity {
                email_verified: false,
                ..self.identity(email)
            }),
        }
    }

    async fn send_verification_email(&self, _identity: &Identity) -> Result<(), ProviderError> {
        self.record("send_verification_email");
        self.verification_emails.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn issue_token(&self, _identity: &Identity) -> Result<SecretString, ProviderError> {
        self.record("issue_token");
        Ok(SecretString::from(PROVIDER_TOKEN))
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.record("sign_out");
        match &self.sign_out_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

struct FakeExchange {
    failure: Option<ExchangeError>,
    seen: Mutex<Vec<String>>,
}

impl FakeExchange {
    fn ok() -> Self {
        Self {
            failure: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    fn seen(&self) -> Vec<String> {
        self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SessionExchange for FakeExchange {
    async fn exchange(
        &self,
        _email: &str,
        provider_token: &SecretString,
    ) -> Result<SecretString, ExchangeError> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(provider_token.expose_secret().to_string());
        }
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(SecretString::from(BACKEND_TOKEN)),
        }
    }
}

struct Harness {
    provider: Arc<FakeProvider>,
    exchange: Arc<FakeExchange>,
    backend: Arc<MemoryStore>,
    manager: Arc<CredentialManager>,
}

fn harness_with(provider: FakeProvider, exchange: FakeExchange, timeout: Duration) -> Harness {
    let provider = Arc::new(provider);
    let exchange = Arc::new(exchange);
    let backend = Arc::new(MemoryStore::new());
    let manager = Arc::new(CredentialManager::new(
        provider.clone(),
        exchange.clone(),
        SessionStore::new(backend.clone()),
        timeout,
    ));
    Harness {
        provider,
        exchange,
        backend,
        manager,
    }
}

fn harness(provider: FakeProvider) -> Harness {
    harness_with(provider, FakeExchange::ok(), Duration::from_secs(5))
}

fn login_form() -> Form {
    let mut form = Form::new(FormMode::Login);
    form.set(Field::Email, "ana@example.com");
    form.set(Field::Password, "Abcdef1!");
    form
}

fn signup_form() -> Form {
    let mut form = Form::new(FormMode::Signup);
    form.set(Field::Name, "Ana");
    form.set(Field::Email, "ana@example.com");
    form.set(Field::Phone, "9876543210");
    form.set(Field::Password, "Abcdef1!");
    form.set(Field::ConfirmPassword, "Abcdef1!");
    form
}

impl Harness {
    fn stored(&self) -> Result<(Option<String>, Option<String>)> {
        Ok((self.backend.get(EMAIL_KEY)?, self.backend.get(TOKEN_KEY)?))
    }
}

#[tokio::test]
async fn verified_login_stores_backend_token() -> Result<()> {
    let h = harness(FakeProvider::verified());
    let mut status = h.manager.subscribe();
    let mut form = login_form();

    let transition = h.manager.submit(&mut form).await?;

    assert_eq!(transition.destination, Destination::Home);
    assert_eq!(transition.notice, None);
    assert_eq!(form.fields(), &FormFields::default());
    assert_eq!(
        h.stored()?,
        (
            Some("ana@example.com".to_string()),
            Some(BACKEND_TOKEN.to_string())
        )
    );
    assert_eq!(h.exchange.seen(), vec![PROVIDER_TOKEN.to_string()]);
    assert_eq!(h.provider.calls(), vec!["sign_in", "issue_token"]);

    status.changed().await?;
    assert_eq!(
        *status.borrow(),
        AuthStatus::SignedIn {
            email: "ana@example.com".to_string()
        }
    );
    assert!(!h.manager.is_busy());
    Ok(())
}

#[tokio::test]
async fn unverified_login_creates_no_session() -> Result<()> {
    let h = harness(FakeProvider::default());
    let mut form = login_form();

    let transition = h.manager.submit(&mut form).await?;

    assert_eq!(transition.destination, Destination::Login);
    assert_eq!(
        transition.notice.map(|notice| notice.message),
        Some(VERIFY_EMAIL_MESSAGE.to_string())
    );
    assert_eq!(h.stored()?, (None, None));
    assert!(h.exchange.seen().is_empty());
    assert_eq!(h.manager.status(), AuthStatus::SignedOut);
    // the user keeps what they typed
    assert_eq!(form.fields().email, "ana@example.com");
    Ok(())
}

#[tokio::test]
async fn credential_failures_map_to_messages() -> Result<()> {
    for (code, message) in [
        (codes::INVALID_EMAIL, "Invalid email address"),
        (codes::USER_DISABLED, "This account has been disabled"),
        (codes::USER_NOT_FOUND, "User not found with this email"),
        (codes::WRONG_PASSWORD, "Invalid password"),
        (codes::TOO_MANY_REQUESTS, SIGN_IN_FALLBACK),
    ] {
        let h = harness(FakeProvider {
            sign_in_error: Some(ProviderError::rejected(code)),
            ..FakeProvider::verified()
        });

        let err = h.manager.submit(&mut login_form()).await;
        let Err(err) = err else {
            panic!("{code} should fail");
        };
        assert_eq!(err.notice().message, message, "{code}");
        assert_eq!(h.stored()?, (None, None));
    }
    Ok(())
}

#[tokio::test]
async fn invalid_form_never_reaches_provider() -> Result<()> {
    let h = harness(FakeProvider::verified());
    let mut form = Form::new(FormMode::Login);
    form.set(Field::Email, "a b@c.com");

    let result = h.manager.submit(&mut form).await;

    assert!(matches!(result, Err(LifecycleError::Validation(_))));
    assert!(form.errors().get(Field::Email).is_some());
    assert!(form.errors().get(Field::Password).is_some());
    assert!(h.provider.calls().is_empty());

    // direct calls validate too
    let direct = h.manager.login(&FormFields::default()).await;
    assert!(matches!(direct, Err(LifecycleError::Validation(_))));
    assert!(h.provider.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn signup_sends_one_verification_email_and_no_session() -> Result<()> {
    let h = harness(FakeProvider::default());
    let mut form = signup_form();

    let transition = h.manager.submit(&mut form).await?;

    assert_eq!(transition.destination, Destination::Login);
    assert_eq!(
        transition.notice.map(|notice| notice.message),
        Some(VERIFICATION_SENT_MESSAGE.to_string())
    );
    assert_eq!(form.mode(), FormMode::Login);
    assert_eq!(form.fields(), &FormFields::default());
    assert_eq!(h.provider.verification_emails.load(Ordering::SeqCst), 1);
    assert_eq!(h.stored()?, (None, None));
    assert_eq!(h.manager.status(), AuthStatus::SignedOut);
    Ok(())
}

#[tokio::test]
async fn signup_failures_map_to_messages() -> Result<()> {
    for (code, message) in [
        (codes::EMAIL_ALREADY_IN_USE, "This email is already registered"),
        (codes::INVALID_EMAIL, "Invalid email address"),
        (codes::WEAK_PASSWORD, "Password is too weak"),
        (codes::INTERNAL, "Registration failed"),
    ] {
        let h = harness(FakeProvider {
            sign_up_error: Some(ProviderError::rejected(code)),
            ..FakeProvider::default()
        });
        let mut form = signup_form();

        let Err(err) = h.manager.submit(&mut form).await else {
            panic!("{code} should fail");
        };
        assert_eq!(err.notice().message, message, "{code}");
        assert_eq!(form.mode(), FormMode::Signup);
        assert_eq!(h.provider.verification_emails.load(Ordering::SeqCst), 0);
    }
    Ok(())
}

#[tokio::test]
async fn slow_provider_times_out_without_credential_message() -> Result<()> {
    let h = harness_with(
        FakeProvider {
            delay: Some(Duration::from_secs(30)),
            ..FakeProvider::verified()
        },
        FakeExchange::ok(),
        Duration::from_millis(50),
    );

    let Err(err) = h.manager.submit(&mut login_form()).await else {
        panic!("login should time out");
    };

    assert!(matches!(err, LifecycleError::Timeout { .. }));
    assert!(err.is_retryable());
    assert_eq!(err.notice().message, TIMEOUT_MESSAGE);
    assert!(!h.manager.is_busy());
    Ok(())
}

#[tokio::test]
async fn transport_failure_is_network_error() -> Result<()> {
    let h = harness(FakeProvider {
        sign_in_error: Some(ProviderError::Transport("connection refused".to_string())),
        ..FakeProvider::verified()
    });

    let Err(err) = h.manager.submit(&mut login_form()).await else {
        panic!("login should fail");
    };
    assert!(matches!(err, LifecycleError::Network { .. }));
    assert!(err.is_retryable());
    Ok(())
}

#[tokio::test]
async fn concurrent_submit_is_busy() -> Result<()> {
    let gate = Arc::new(Notify::new());
    let h = harness(FakeProvider {
        gate: Some(gate.clone()),
        ..FakeProvider::verified()
    });

    let manager = h.manager.clone();
    let first = tokio::spawn(async move {
        let fields = login_form().fields().clone();
        manager.login(&fields).await.map(|outcome| {
            matches!(outcome, LoginOutcome::Authenticated(_))
        })
    });

    while !h.manager.is_busy() {
        tokio::task::yield_now().await;
    }

    let second = h.manager.submit(&mut login_form()).await;
    assert!(matches!(second, Err(LifecycleError::Busy)));
    assert!(matches!(h.manager.sign_out().await, Err(LifecycleError::Busy)));
    assert_eq!(h.provider.calls(), vec!["sign_in"]);

    gate.notify_one();
    assert!(first.await??);
    assert!(!h.manager.is_busy());
    Ok(())
}

#[tokio::test]
async fn exchange_failure_leaves_no_session() -> Result<()> {
    let h = harness_with(
        FakeProvider::verified(),
        FakeExchange {
            failure: Some(ExchangeError::Rejected(reqwest::StatusCode::FORBIDDEN)),
            seen: Mutex::new(Vec::new()),
        },
        Duration::from_secs(5),
    );

    let Err(err) = h.manager.submit(&mut login_form()).await else {
        panic!("login should fail");
    };
    assert!(matches!(err, LifecycleError::Exchange(_)));
    assert_eq!(err.notice().message, SIGN_IN_FALLBACK);
    assert_eq!(h.stored()?, (None, None));
    assert_eq!(h.manager.status(), AuthStatus::SignedOut);
    Ok(())
}

#[tokio::test]
async fn restore_then_sign_out_removes_both_keys() -> Result<()> {
    let h = harness(FakeProvider::verified());
    SessionStore::new(h.backend.clone()).save(&SessionRecord::new(
        "ana@example.com",
        SecretString::from(BACKEND_TOKEN),
    ))?;

    let restored = h.manager.restore()?;
    assert_eq!(restored.map(|record| record.email).as_deref(), Some("ana@example.com"));
    assert!(h.manager.status().is_signed_in());

    let transition = h.manager.sign_out().await?;

    assert_eq!(transition.destination, Destination::Login);
    assert_eq!(h.stored()?, (None, None));
    assert_eq!(h.manager.status(), AuthStatus::SignedOut);
    assert_eq!(h.provider.calls(), vec!["sign_out"]);
    Ok(())
}

#[tokio::test]
async fn sign_out_clears_session_even_if_provider_fails() -> Result<()> {
    let h = harness(FakeProvider {
        sign_out_error: Some(ProviderError::Transport("offline".to_string())),
        ..FakeProvider::verified()
    });
    h.manager.submit(&mut login_form()).await?;
    assert!(h.manager.status().is_signed_in());

    h.manager.sign_out().await?;

    assert_eq!(h.stored()?, (None, None));
    assert_eq!(h.manager.status(), AuthStatus::SignedOut);
    Ok(())
}

#[tokio::test]
async fn half_record_restores_as_signed_out() -> Result<()> {
    let h = harness(FakeProvider::verified());
    h.backend.set(TOKEN_KEY, BACKEND_TOKEN)?;

    assert!(h.manager.restore()?.is_none());
    assert_eq!(h.manager.status(), AuthStatus::SignedOut);
    Ok(())
}
