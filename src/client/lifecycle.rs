//! Credential lifecycle: sign-in, sign-up, sign-out, session restore.
//!
//! Only one action runs at a time per manager; a second call while one is in
//! flight fails with [`LifecycleError::Busy`] instead of queueing. A session
//! record is created only after the provider confirms the email is verified
//! and the backend has issued a Session Token for it.

use super::{
    bridge::{Identity, IdentityProvider, ProviderError},
    error::{AuthAction, LifecycleError, Notice, VERIFICATION_SENT_MESSAGE, VERIFY_EMAIL_MESSAGE},
    exchange::SessionExchange,
    form::{self, Form, FormFields, FormMode},
    store::{SessionRecord, SessionStore},
};
use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStatus {
    SignedOut,
    SignedIn { email: String },
}

impl AuthStatus {
    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        matches!(self, Self::SignedIn { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Home,
    Login,
}

/// Where the UI goes next and what, if anything, it tells the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub destination: Destination,
    pub notice: Option<Notice>,
}

impl Transition {
    const fn to(destination: Destination) -> Self {
        Self {
            destination,
            notice: None,
        }
    }

    fn with_notice(destination: Destination, title: &str, message: &str) -> Self {
        Self {
            destination,
            notice: Some(Notice::new(title, message)),
        }
    }
}

#[derive(Debug, Clone)]
pub enum LoginOutcome {
    Authenticated(SessionRecord),
    /// Credentials were accepted but the email is unverified; no session.
    VerificationRequired { email: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupOutcome {
    pub uid: String,
    pub email: String,
}

struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, LifecycleError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self(flag))
            .map_err(|_| LifecycleError::Busy)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct CredentialManager {
    provider: Arc<dyn IdentityProvider>,
    exchange: Arc<dyn SessionExchange>,
    store: SessionStore,
    timeout: Duration,
    busy: AtomicBool,
    status: watch::Sender<AuthStatus>,
}

impl CredentialManager {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        exchange: Arc<dyn SessionExchange>,
        store: SessionStore,
        timeout: Duration,
    ) -> Self {
        let (status, _) = watch::channel(AuthStatus::SignedOut);
        Self {
            provider,
            exchange,
            store,
            timeout,
            busy: AtomicBool::new(false),
            status,
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthStatus> {
        self.status.subscribe()
    }

    #[must_use]
    pub fn status(&self) -> AuthStatus {
        self.status.borrow().clone()
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Load the persisted session, if any, and publish the matching status.
    ///
    /// # Errors
    /// Returns an error if the session store cannot be read.
    pub fn restore(&self) -> Result<Option<SessionRecord>, LifecycleError> {
        let record = self.store.load()?;
        self.publish(record.as_ref().map_or(AuthStatus::SignedOut, |record| {
            AuthStatus::SignedIn {
                email: record.email.clone(),
            }
        }));
        Ok(record)
    }

    /// Validate `form` and run the action for its mode, applying the form-side
    /// effects of the outcome.
    ///
    /// # Errors
    /// Returns the lifecycle error; its [`LifecycleError::notice`] is the text
    /// to show.
    pub async fn submit(&self, form: &mut Form) -> Result<Transition, LifecycleError> {
        if !form.validate() {
            return Err(LifecycleError::Validation(form.errors().clone()));
        }

        match form.mode() {
            FormMode::Login => {
                let outcome = self.login(form.fields()).await?;
                match outcome {
                    LoginOutcome::Authenticated(_) => {
                        form.clear();
                        Ok(Transition::to(Destination::Home))
                    }
                    LoginOutcome::VerificationRequired { .. } => Ok(Transition::with_notice(
                        Destination::Login,
                        "Email not verified",
                        VERIFY_EMAIL_MESSAGE,
                    )),
                }
            }
            FormMode::Signup => {
                self.sign_up(form.fields()).await?;
                form.set_mode(FormMode::Login);
                Ok(Transition::with_notice(
                    Destination::Login,
                    "Registration Successful",
                    VERIFICATION_SENT_MESSAGE,
                ))
            }
        }
    }

    /// # Errors
    /// Fails on invalid fields, provider rejection, timeout, exchange or
    /// store failure, or when another action is running.
    #[instrument(skip(self, input), fields(email = input.normalized_email()))]
    pub async fn login(&self, input: &FormFields) -> Result<LoginOutcome, LifecycleError> {
        let _in_flight = InFlight::acquire(&self.busy)?;
        ensure_valid(FormMode::Login, input)?;

        let email = input.normalized_email();
        let identity = self
            .provider_call(
                AuthAction::SignIn,
                self.provider.sign_in(email, &input.password),
            )
            .await?;

        if !identity.email_verified {
            info!(uid = %identity.uid, "sign-in refused, email not verified");
            return Ok(LoginOutcome::VerificationRequired {
                email: email.to_string(),
            });
        }

        let record = self.establish(email, &identity).await?;
        info!(uid = %identity.uid, "signed in");

        Ok(LoginOutcome::Authenticated(record))
    }

    /// Create the account and send the verification email. Never creates a
    /// session.
    ///
    /// # Errors
    /// Fails on invalid fields, provider rejection, timeout, or when another
    /// action is running.
    #[instrument(skip(self, input), fields(email = input.normalized_email()))]
    pub async fn sign_up(&self, input: &FormFields) -> Result<SignupOutcome, LifecycleError> {
        let _in_flight = InFlight::acquire(&self.busy)?;
        ensure_valid(FormMode::Signup, input)?;

        let email = input.normalized_email();
        let identity = self
            .provider_call(
                AuthAction::SignUp,
                self.provider.sign_up(email, &input.password),
            )
            .await?;

        self.provider_call(
            AuthAction::SignUp,
            self.provider.send_verification_email(&identity),
        )
        .await?;

        info!(uid = %identity.uid, "account created, verification email sent");

        Ok(SignupOutcome {
            uid: identity.uid,
            email: email.to_string(),
        })
    }

    /// Provider sign-out is best effort; the local session is always cleared.
    ///
    /// # Errors
    /// Fails if the session store cannot be cleared or another action is
    /// running.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<Transition, LifecycleError> {
        let _in_flight = InFlight::acquire(&self.busy)?;

        if let Err(err) = self
            .provider_call(AuthAction::SignOut, self.provider.sign_out())
            .await
        {
            warn!("provider sign-out failed: {err}");
        }

        self.store.clear()?;
        self.publish(AuthStatus::SignedOut);
        info!("signed out");

        Ok(Transition::to(Destination::Login))
    }

    async fn establish(
        &self,
        email: &str,
        identity: &Identity,
    ) -> Result<SessionRecord, LifecycleError> {
        let provider_token = self
            .provider_call(AuthAction::SignIn, self.provider.issue_token(identity))
            .await?;

        let token = tokio::time::timeout(
            self.timeout,
            self.exchange.exchange(email, &provider_token),
        )
        .await
        .map_err(|_| {
            warn!("session exchange timed out");
            LifecycleError::Timeout {
                action: AuthAction::SignIn,
            }
        })??;

        let record = SessionRecord::new(email, token);
        self.store.save(&record)?;
        self.publish(AuthStatus::SignedIn {
            email: record.email.clone(),
        });

        Ok(record)
    }

    async fn provider_call<T, F>(&self, action: AuthAction, call: F) -> Result<T, LifecycleError>
    where
        F: Future<Output = Result<T, ProviderError>> + Send,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(ProviderError::Rejected { code })) => {
                let err = LifecycleError::rejected(action, code);
                if matches!(err, LifecycleError::UnknownFailure { .. }) {
                    error!("{err}");
                } else {
                    debug!("{err}");
                }
                Err(err)
            }
            Ok(Err(ProviderError::Transport(reason))) => {
                warn!(%action, "provider unreachable: {reason}");
                Err(LifecycleError::Network { action, reason })
            }
            Err(_) => {
                warn!(%action, timeout = ?self.timeout, "provider call timed out");
                Err(LifecycleError::Timeout { action })
            }
        }
    }

    fn publish(&self, status: AuthStatus) {
        self.status.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }
}

fn ensure_valid(mode: FormMode, fields: &FormFields) -> Result<(), LifecycleError> {
    let errors = form::validate(mode, fields);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(LifecycleError::Validation(errors))
    }
}
