//! Request pipeline: origin check, route classification, token verification.
//!
//! The stages run in that order inside the request's own task and any of them
//! may end the request. Only read-only state is shared between requests.

use super::{
    config::GatewayConfig,
    error::GatewayError,
    origin::OriginPolicy,
    principal::Principal,
    routes::{RouteClass, RouteTable},
    token::{bearer_token, SessionIssuer, TokenVerifier},
};
use axum::{
    extract::{Request, State},
    http::header::{AUTHORIZATION, ORIGIN},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Everything the pipeline needs, derived once from [`GatewayConfig`].
#[derive(Clone)]
pub struct GatewayState {
    config: Arc<GatewayConfig>,
    origins: Arc<OriginPolicy>,
    routes: Arc<RouteTable>,
    verifier: Arc<TokenVerifier>,
    issuer: Arc<SessionIssuer>,
}

impl GatewayState {
    #[must_use]
    pub fn new(config: GatewayConfig) -> Self {
        let origins = OriginPolicy::new(config.allowed_origins());
        let routes = config.route_table();
        let verifier = TokenVerifier::new(config.token_secret());
        let issuer = SessionIssuer::new(config.token_secret(), config.token_ttl_seconds());

        Self {
            config: Arc::new(config),
            origins: Arc::new(origins),
            routes: Arc::new(routes),
            verifier: Arc::new(verifier),
            issuer: Arc::new(issuer),
        }
    }

    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    #[must_use]
    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    /// Signs with the same secret the verifier checks. The embedder's login
    /// route mints Session Tokens through this once it trusts the provider.
    #[must_use]
    pub fn issuer(&self) -> &SessionIssuer {
        &self.issuer
    }
}

/// First stage. Applied to every route the gateway serves.
pub async fn validate_origin(
    State(state): State<GatewayState>,
    request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    if let Err(err) = state.origins.check(request.headers().get(ORIGIN)) {
        warn!(path = request.uri().path(), "{err}");
        return Err(err);
    }

    Ok(next.run(request).await)
}

/// Second and third stages. Applied to the `/api` tree, which sees paths with
/// the mount prefix already stripped.
pub async fn authenticate(
    State(state): State<GatewayState>,
    mut request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let path = request.uri().path().to_string();
    let class = state.routes.classify(&path);

    match class {
        RouteClass::Public => {}
        RouteClass::DevelopmentOpen => {
            debug!(path = %path, "development-open route, skipping token check");
        }
        RouteClass::Protected => {
            let principal = match verify_request(&state, &request) {
                Ok(principal) => principal,
                Err(err) => {
                    warn!(path = %path, route_class = %class, "{err}");
                    return Err(err);
                }
            };
            debug!(path = %path, user_id = principal.user_id(), "principal attached");
            request.extensions_mut().insert(principal);
        }
    }

    Ok(next.run(request).await)
}

fn verify_request(state: &GatewayState, request: &Request) -> Result<Principal, GatewayError> {
    let token = bearer_token(request.headers().get(AUTHORIZATION))?;
    let claims = state.verifier.verify(token)?;
    Ok(Principal::new(claims))
}
