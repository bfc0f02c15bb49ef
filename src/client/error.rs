//! Lifecycle failures and the user-facing notices derived from them.

use super::{
    bridge::codes, exchange::ExchangeError, form::FieldErrors, store::StoreError,
};
use std::fmt;
use thiserror::Error;

pub const SIGN_IN_FALLBACK: &str = "An error occurred during sign in";
pub const SIGN_UP_FALLBACK: &str = "Registration failed";
pub const SIGN_OUT_FALLBACK: &str = "Unable to sign out, please try again";
pub const TIMEOUT_MESSAGE: &str = "Network timeout, please try again";
pub const NETWORK_MESSAGE: &str = "Unable to reach the server, please check your connection";
pub const VERIFY_EMAIL_MESSAGE: &str = "Please verify your email before signing in";
pub const VERIFICATION_SENT_MESSAGE: &str =
    "A verification email has been sent to your email address. Please verify your email to continue.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAction {
    SignIn,
    SignUp,
    SignOut,
}

impl AuthAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SignIn => "sign in",
            Self::SignUp => "sign up",
            Self::SignOut => "sign out",
        }
    }

    const fn failure_title(self) -> &'static str {
        match self {
            Self::SignIn => "Login Failed",
            Self::SignUp => "Registration Failed",
            Self::SignOut => "Sign Out Failed",
        }
    }

    const fn fallback(self) -> &'static str {
        match self {
            Self::SignIn => SIGN_IN_FALLBACK,
            Self::SignUp => SIGN_UP_FALLBACK,
            Self::SignOut => SIGN_OUT_FALLBACK,
        }
    }

    /// Message for a provider code this action knows how to explain.
    #[must_use]
    pub fn message_for(self, code: &str) -> Option<&'static str> {
        match (self, code) {
            (Self::SignIn, codes::INVALID_EMAIL) => Some("Invalid email address"),
            (Self::SignIn, codes::USER_DISABLED) => Some("This account has been disabled"),
            (Self::SignIn, codes::USER_NOT_FOUND) => Some("User not found with this email"),
            (Self::SignIn, codes::WRONG_PASSWORD) => Some("Invalid password"),
            (Self::SignUp, codes::EMAIL_ALREADY_IN_USE) => Some("This email is already registered"),
            (Self::SignUp, codes::INVALID_EMAIL) => Some("Invalid email address"),
            (Self::SignUp, codes::WEAK_PASSWORD) => Some("Password is too weak"),
            _ => None,
        }
    }
}

impl fmt::Display for AuthAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Title + message pair shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("form has {} invalid field(s)", .0.len())]
    Validation(FieldErrors),
    #[error("{action} rejected: {code}")]
    AuthFailed { action: AuthAction, code: String },
    #[error("{action} failed with unrecognized code: {code}")]
    UnknownFailure { action: AuthAction, code: String },
    #[error("{action} timed out")]
    Timeout { action: AuthAction },
    #[error("{action} could not reach the provider: {reason}")]
    Network { action: AuthAction, reason: String },
    #[error("session exchange failed: {0}")]
    Exchange(#[from] ExchangeError),
    #[error("session store failed: {0}")]
    Store(#[from] StoreError),
    #[error("another authentication action is already running")]
    Busy,
}

impl LifecycleError {
    /// Sort a provider rejection into mapped or unknown.
    pub fn rejected(action: AuthAction, code: impl Into<String>) -> Self {
        let code = code.into();
        if action.message_for(&code).is_some() {
            Self::AuthFailed { action, code }
        } else {
            Self::UnknownFailure { action, code }
        }
    }

    /// Failures that may succeed unchanged on a second attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Network { .. } | Self::Busy
        ) || matches!(self, Self::Exchange(err) if err.is_transport())
    }

    #[must_use]
    pub fn notice(&self) -> Notice {
        match self {
            Self::Validation(_) => Notice::new("Invalid Form", "Please correct the highlighted fields"),
            Self::AuthFailed { action, code } => Notice::new(
                action.failure_title(),
                action.message_for(code).unwrap_or(action.fallback()),
            ),
            Self::UnknownFailure { action, .. } => {
                Notice::new(action.failure_title(), action.fallback())
            }
            Self::Timeout { .. } => Notice::new("Network Error", TIMEOUT_MESSAGE),
            Self::Network { .. } => Notice::new("Network Error", NETWORK_MESSAGE),
            Self::Exchange(err) if err.is_transport() => {
                Notice::new("Network Error", NETWORK_MESSAGE)
            }
            Self::Exchange(_) => Notice::new(AuthAction::SignIn.failure_title(), SIGN_IN_FALLBACK),
            Self::Store(_) => Notice::new(
                "Session Error",
                "Unable to save your session, please try again",
            ),
            Self::Busy => Notice::new("Please Wait", "A request is already in progress"),
        }
    }
}
