//! Origin allow-list.

use super::error::GatewayError;
use axum::http::HeaderValue;

#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed: Vec<String>,
}

impl OriginPolicy {
    #[must_use]
    pub fn new(allowed: &[String]) -> Self {
        Self {
            allowed: allowed.to_vec(),
        }
    }

    #[must_use]
    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }

    /// An absent header is a direct or server-to-server call and passes.
    /// A present header must match an allowed origin exactly.
    pub fn check(&self, origin: Option<&HeaderValue>) -> Result<(), GatewayError> {
        let Some(origin) = origin else {
            return Ok(());
        };

        let Ok(origin) = origin.to_str() else {
            return Err(GatewayError::OriginRejected("<non-ascii>".to_string()));
        };

        if self.allowed.iter().any(|allowed| allowed == origin) {
            Ok(())
        } else {
            Err(GatewayError::OriginRejected(origin.to_string()))
        }
    }
}
