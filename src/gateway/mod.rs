//! HTTP gateway in front of the WealthWise API.
//!
//! Flow Overview: every request first passes the origin allow-list. Requests
//! under `/api` are then classified by path; protected ones must carry a valid
//! Session Token, which becomes the request's [`Principal`]. Only then does
//! control reach the business router supplied by the embedder.

pub mod config;
pub mod error;
pub mod handlers;
pub mod origin;
pub mod pipeline;
pub mod principal;
pub mod routes;
pub mod token;

pub use config::{ConfigError, Environment, GatewayConfig};
pub use error::GatewayError;
pub use pipeline::GatewayState;
pub use principal::Principal;
pub use routes::{RouteClass, RouteTable};
pub use token::{Claims, SessionIssuer, SessionSubject, TokenVerifier};

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, MatchedPath},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, COOKIE},
        HeaderName, HeaderValue, Method, Request,
    },
    middleware,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Request bodies above this size are refused before reaching handlers.
pub const BODY_LIMIT_BYTES: usize = 50 * 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(handlers::health::health, handlers::me::me),
    components(schemas(handlers::health::Health, token::Claims)),
    tags(
        (name = "health", description = "Liveness and build information"),
        (name = "session", description = "Authenticated session introspection"),
    )
)]
pub struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Wrap `business` (mounted at `/api`) with the full gateway pipeline.
///
/// `business` must not define `/me`; the gateway serves it.
pub fn router(state: GatewayState, business: Router) -> Router {
    let api = business
        .route("/me", get(handlers::me))
        .fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            pipeline::authenticate,
        ));

    let cors = cors_layer(state.config());

    Router::new()
        .route("/health", get(handlers::health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi()))
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(middleware::from_fn_with_state(
                    state,
                    pipeline::validate_origin,
                ))
                .layer(cors)
                .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES)),
        )
}

/// Start the gateway.
///
/// `business` receives the built state so that routes such as `/login` can
/// mint Session Tokens through [`GatewayState::issuer`].
/// # Errors
/// Return error if the configuration is invalid or the listener fails
pub async fn new<F>(port: u16, config: GatewayConfig, business: F) -> Result<()>
where
    F: FnOnce(&GatewayState) -> Router,
{
    config.validate().context("Invalid gateway configuration")?;

    info!(
        environment = %config.environment(),
        development_open = config.development_open_enabled(),
        origins = ?config.allowed_origins(),
        token_ttl_seconds = config.token_ttl_seconds(),
        "gateway configuration loaded"
    );

    let state = GatewayState::new(config);
    let business = business(&state);
    let app = router(state, business);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Gracefully shutdown");
            }
        })
        .await?;

    Ok(())
}

fn cors_layer(config: &GatewayConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins()
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION, COOKIE])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
