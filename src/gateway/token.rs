//! Session Token issue and verification (HS256).
//!
//! The backend is the only issuer of Session Tokens. Provider tokens minted by
//! the identity provider are a different artifact and never verify here.

use super::error::GatewayError;
use axum::http::HeaderValue;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, get_current_timestamp, Algorithm, DecodingKey, EncodingKey,
    Header, Validation,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use ulid::Ulid;
use utoipa::ToSchema;

/// Claims carried by a Session Token. A verified set becomes the request's
/// [`Principal`](super::Principal).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub email_verified: bool,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Identity the login collaborator hands over when minting a Session Token.
#[derive(Debug, Clone)]
pub struct SessionSubject {
    pub user_id: String,
    pub email: String,
    pub email_verified: bool,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("refusing to issue a token for an unverified email")]
    UnverifiedEmail,
    #[error("failed to encode token: {0}")]
    Encode(#[from] jsonwebtoken::errors::Error),
}

fn now_unix_seconds() -> i64 {
    i64::try_from(get_current_timestamp()).unwrap_or(i64::MAX)
}

/// Mints Session Tokens with the gateway secret.
#[derive(Clone)]
pub struct SessionIssuer {
    key: EncodingKey,
    ttl_seconds: i64,
}

impl SessionIssuer {
    #[must_use]
    pub fn new(secret: &SecretString, ttl_seconds: i64) -> Self {
        Self {
            key: EncodingKey::from_secret(secret.expose_secret().as_bytes()),
            ttl_seconds,
        }
    }

    /// Issue a token valid from now for the configured TTL.
    ///
    /// # Errors
    /// Returns an error for unverified subjects or if encoding fails.
    pub fn issue(&self, subject: &SessionSubject) -> Result<String, TokenError> {
        if !subject.email_verified {
            return Err(TokenError::UnverifiedEmail);
        }

        let iat = now_unix_seconds();
        let claims = Claims {
            sub: subject.user_id.clone(),
            email: subject.email.clone(),
            email_verified: subject.email_verified,
            iat,
            exp: iat.saturating_add(self.ttl_seconds),
            jti: Ulid::new().to_string(),
        };

        self.encode_claims(&claims)
    }

    /// Sign an explicit claim set as-is.
    ///
    /// # Errors
    /// Returns an error if encoding fails.
    pub fn encode_claims(&self, claims: &Claims) -> Result<String, TokenError> {
        Ok(encode(&Header::new(Algorithm::HS256), claims, &self.key)?)
    }
}

/// Verifies Session Tokens against the gateway secret.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            validation,
        }
    }

    /// Check signature, expiry and the verified-email claim.
    ///
    /// # Errors
    /// Returns [`GatewayError::InvalidToken`] on any failure.
    pub fn verify(&self, token: &str) -> Result<Claims, GatewayError> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|err| {
            let reason = match err.kind() {
                ErrorKind::ExpiredSignature => "expired",
                ErrorKind::InvalidSignature => "bad signature",
                ErrorKind::InvalidAlgorithm => "unexpected algorithm",
                _ => "malformed",
            };
            debug!("token rejected: {:?}", err.kind());
            GatewayError::InvalidToken(reason.to_string())
        })?;

        if !data.claims.email_verified {
            return Err(GatewayError::InvalidToken("email not verified".to_string()));
        }

        Ok(data.claims)
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header.
///
/// No header, or a header without a token part, means the caller sent no
/// credential (401). Anything else that is not a single bearer token is a bad
/// credential (403).
pub fn bearer_token(header: Option<&HeaderValue>) -> Result<&str, GatewayError> {
    let Some(header) = header else {
        return Err(GatewayError::MissingToken);
    };

    let value = header
        .to_str()
        .map_err(|_| GatewayError::InvalidToken("non-ascii authorization header".to_string()))?;

    let mut parts = value.split_whitespace();
    let Some(scheme) = parts.next() else {
        return Err(GatewayError::MissingToken);
    };
    let Some(token) = parts.next() else {
        return Err(GatewayError::MissingToken);
    };

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(GatewayError::InvalidToken("unsupported scheme".to_string()));
    }

    if parts.next().is_some() {
        return Err(GatewayError::InvalidToken("trailing data".to_string()));
    }

    Ok(token)
}
