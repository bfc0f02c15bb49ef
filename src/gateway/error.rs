//! Gateway rejections.
//!
//! Each variant ends the request. Status codes are stable because callers
//! branch on them: 401 means "send a token", 403 means "this caller or token
//! will never be accepted as-is".

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("origin not allowed: {0}")]
    OriginRejected(String),
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid token: {0}")]
    InvalidToken(String),
}

impl GatewayError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MissingToken => StatusCode::UNAUTHORIZED,
            Self::OriginRejected(_) | Self::InvalidToken(_) => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::OriginRejected(_) => {
                (status, Json(json!({ "error": "Unauthorized request" }))).into_response()
            }
            Self::MissingToken => (status, "Token required").into_response(),
            Self::InvalidToken(_) => (status, "Invalid token").into_response(),
        }
    }
}
