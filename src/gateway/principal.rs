//! Authenticated principal for one request.
//!
//! The authentication layer inserts a [`Principal`] into the request
//! extensions after a Session Token verifies. Handlers behind protected routes
//! take it as an extractor; if it is missing the request never authenticated.

use super::{error::GatewayError, token::Claims};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    claims: Claims,
}

impl Principal {
    #[must_use]
    pub const fn new(claims: Claims) -> Self {
        Self { claims }
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.claims.sub
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.claims.email
    }

    #[must_use]
    pub const fn claims(&self) -> &Claims {
        &self.claims
    }

    #[must_use]
    pub fn into_claims(self) -> Claims {
        self.claims
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(GatewayError::MissingToken)
    }
}
