use anyhow::Result;
use axum::{
    body::{to_bytes, Body, Bytes},
    http::{header, HeaderMap, Method, Request, StatusCode},
    routing::{get, post},
    Json, Router,
};
use jsonwebtoken::get_current_timestamp;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceExt;
use url::Url;
use wealthwise::{
    client::{HttpSessionExchange, SessionExchange},
    gateway::{
        self, Claims, Environment, GatewayConfig, GatewayState, Principal, SessionIssuer,
        SessionSubject,
    },
};

const SECRET: &str = "integration-secret";
const ALLOWED: &str = "https://wealthwisee.live";

fn config() -> GatewayConfig {
    GatewayConfig::new(SecretString::from(SECRET))
}

fn dev_config() -> GatewayConfig {
    config()
        .with_environment(Environment::Development)
        .with_development_open(true)
}

async fn whoami(principal: Principal) -> String {
    principal.email().to_string()
}

fn business() -> Router {
    Router::new()
        .route("/login", get(|| async { "login" }))
        .route("/findmail", get(|| async { "findmail" }))
        .route("/nifty", get(|| async { "nifty" }))
        .route("/stock/:symbol", get(|| async { "stock" }))
        .route("/portfolio", get(|| async { "portfolio" }))
        .route("/accounts", get(whoami))
}

fn app(config: GatewayConfig) -> Router {
    gateway::router(GatewayState::new(config), business())
}

fn now() -> i64 {
    i64::try_from(get_current_timestamp()).unwrap_or(i64::MAX)
}

fn claims(exp_offset: i64, email_verified: bool) -> Claims {
    let iat = now();
    Claims {
        sub: "uid-42".to_string(),
        email: "ana@example.com".to_string(),
        email_verified,
        iat,
        exp: iat + exp_offset,
        jti: "01J0000000000000000000TEST".to_string(),
    }
}

fn token_for(claims: &Claims, secret: &str) -> Result<String> {
    Ok(SessionIssuer::new(&SecretString::from(secret), 3600).encode_claims(claims)?)
}

fn valid_token() -> Result<String> {
    Ok(SessionIssuer::new(&SecretString::from(SECRET), 3600).issue(&SessionSubject {
        user_id: "uid-42".to_string(),
        email: "ana@example.com".to_string(),
        email_verified: true,
    })?)
}

fn get_request(uri: &str, origin: Option<&str>, authorization: Option<&str>) -> Result<Request<Body>> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(origin) = origin {
        builder = builder.header(header::ORIGIN, origin);
    }
    if let Some(authorization) = authorization {
        builder = builder.header(header::AUTHORIZATION, authorization);
    }
    Ok(builder.body(Body::empty())?)
}

async fn send(app: Router, request: Request<Body>) -> Result<(StatusCode, HeaderMap, Bytes)> {
    let response = app.oneshot(request).await?;
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, headers, body))
}

#[tokio::test]
async fn public_paths_ignore_authorization() -> Result<()> {
    for path in ["/api/login", "/api/findmail", "/api/nifty"] {
        for authorization in [None, Some("Bearer garbage"), Some("Basic Zm9vOmJhcg==")] {
            let (status, _, _) = send(app(config()), get_request(path, None, authorization)?).await?;
            assert_eq!(status, StatusCode::OK, "{path} {authorization:?}");
        }
    }
    Ok(())
}

#[tokio::test]
async fn signup_is_public_even_without_a_business_route() -> Result<()> {
    let (status, _, body) = send(app(config()), get_request("/api/signup", None, None)?).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(&body[..], br#"{"error":"Not found"}"#);
    Ok(())
}

#[tokio::test]
async fn development_open_paths_skip_tokens_when_enabled() -> Result<()> {
    for (path, expected) in [("/api/stock/AAPL", "stock"), ("/api/portfolio", "portfolio")] {
        for authorization in [None, Some("Bearer garbage")] {
            let (status, _, body) =
                send(app(dev_config()), get_request(path, None, authorization)?).await?;
            assert_eq!(status, StatusCode::OK, "{path}");
            assert_eq!(&body[..], expected.as_bytes());
        }
    }
    Ok(())
}

#[tokio::test]
async fn development_open_paths_are_protected_when_disabled() -> Result<()> {
    let staging_without_flag = config().with_environment(Environment::Staging);
    for config in [config(), staging_without_flag] {
        let (status, _, _) = send(app(config), get_request("/api/stock/AAPL", None, None)?).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, _, body) = send(
        app(config()),
        get_request("/api/portfolio", None, Some("Bearer garbage"))?,
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(&body[..], b"Invalid token");
    Ok(())
}

#[tokio::test]
async fn protected_without_token_is_401() -> Result<()> {
    for authorization in [None, Some(""), Some("Bearer"), Some("Bearer   ")] {
        let (status, _, body) =
            send(app(config()), get_request("/api/accounts", None, authorization)?).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{authorization:?}");
        assert_eq!(&body[..], b"Token required");
    }
    Ok(())
}

#[tokio::test]
async fn protected_with_bad_token_is_403() -> Result<()> {
    let expired = format!("Bearer {}", token_for(&claims(-60, true), SECRET)?);
    let foreign = format!("Bearer {}", token_for(&claims(3600, true), "another-secret")?);
    let unverified = format!("Bearer {}", token_for(&claims(3600, false), SECRET)?);
    let valid = valid_token()?;
    let wrong_scheme = format!("Basic {valid}");
    let trailing = format!("Bearer {valid} extra");

    for authorization in [
        expired.as_str(),
        foreign.as_str(),
        unverified.as_str(),
        wrong_scheme.as_str(),
        trailing.as_str(),
        "Bearer not.a.jwt",
    ] {
        let (status, _, body) = send(
            app(config()),
            get_request("/api/accounts", None, Some(authorization))?,
        )
        .await?;
        assert_eq!(status, StatusCode::FORBIDDEN, "{authorization}");
        assert_eq!(&body[..], b"Invalid token");
    }
    Ok(())
}

#[tokio::test]
async fn valid_token_reaches_business_logic_with_principal() -> Result<()> {
    let authorization = format!("Bearer {}", valid_token()?);
    let (status, _, body) = send(
        app(config()),
        get_request("/api/accounts", Some(ALLOWED), Some(&authorization))?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"ana@example.com");

    // scheme is case-insensitive
    let lowercase = format!("bearer {}", valid_token()?);
    let (status, _, _) = send(
        app(config()),
        get_request("/api/accounts", None, Some(&lowercase))?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn me_returns_issued_claims() -> Result<()> {
    let issued = claims(3600, true);
    let authorization = format!("Bearer {}", token_for(&issued, SECRET)?);
    let (status, _, body) =
        send(app(config()), get_request("/api/me", None, Some(&authorization))?).await?;
    assert_eq!(status, StatusCode::OK);

    let returned: Claims = serde_json::from_slice(&body)?;
    assert_eq!(returned, issued);
    Ok(())
}

#[tokio::test]
async fn unknown_api_path_is_protected_then_404() -> Result<()> {
    let (status, _, _) = send(app(config()), get_request("/api/nope", None, None)?).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let authorization = format!("Bearer {}", valid_token()?);
    let (status, _, body) =
        send(app(config()), get_request("/api/nope", None, Some(&authorization))?).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(&body[..], br#"{"error":"Not found"}"#);
    Ok(())
}

#[tokio::test]
async fn disallowed_origin_is_403_everywhere() -> Result<()> {
    let authorization = format!("Bearer {}", valid_token()?);
    for (config, path, authorization) in [
        (config(), "/api/login", None),
        (dev_config(), "/api/stock/AAPL", None),
        (config(), "/api/accounts", Some(authorization.as_str())),
        (config(), "/health", None),
    ] {
        let (status, _, body) = send(
            app(config),
            get_request(path, Some("https://evil.example"), authorization)?,
        )
        .await?;
        assert_eq!(status, StatusCode::FORBIDDEN, "{path}");
        let body: serde_json::Value = serde_json::from_slice(&body)?;
        assert_eq!(body, serde_json::json!({ "error": "Unauthorized request" }));
    }
    Ok(())
}

#[tokio::test]
async fn disallowed_preflight_is_403() -> Result<()> {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/accounts")
        .header(header::ORIGIN, "https://evil.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())?;
    let (status, _, _) = send(app(config()), request).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn allowed_origin_gets_cors_headers() -> Result<()> {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/accounts")
        .header(header::ORIGIN, ALLOWED)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())?;
    let (status, headers, _) = send(app(config()), request).await?;
    assert!(status.is_success());
    assert_eq!(
        headers
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some(ALLOWED)
    );
    assert_eq!(
        headers
            .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .and_then(|v| v.to_str().ok()),
        Some("true")
    );
    Ok(())
}

#[tokio::test]
async fn health_is_open_and_tagged() -> Result<()> {
    let (status, headers, body) = send(app(config()), get_request("/health", None, None)?).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(headers.get("x-app").is_some());
    assert!(headers.get("x-request-id").is_some());

    let body: serde_json::Value = serde_json::from_slice(&body)?;
    assert_eq!(body["name"], "wealthwise");
    Ok(())
}

#[tokio::test]
async fn request_id_is_propagated() -> Result<()> {
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-123")
        .body(Body::empty())?;
    let (_, headers, _) = send(app(config()), request).await?;
    assert_eq!(
        headers.get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("req-123")
    );
    Ok(())
}

#[tokio::test]
async fn openapi_lists_gateway_paths() -> Result<()> {
    let doc = serde_json::to_value(gateway::openapi())?;
    assert!(doc["paths"].get("/health").is_some());
    assert!(doc["paths"].get("/api/me").is_some());
    Ok(())
}

const PROVIDER_TOKEN: &str = "provider-id-token";

#[derive(Deserialize)]
struct LoginBody {
    email: String,
}

/// Stand-in for the backend login route: trusts one fixed provider token and
/// mints through the gateway's own issuer.
fn login_route(state: &GatewayState) -> Router {
    let issuer = state.issuer().clone();
    Router::new().route(
        "/login",
        post(move |headers: HeaderMap, Json(body): Json<LoginBody>| {
            let issuer = issuer.clone();
            async move {
                let presented = headers
                    .get(header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok());
                if presented != Some(format!("Bearer {PROVIDER_TOKEN}").as_str()) {
                    return Err(StatusCode::FORBIDDEN);
                }

                issuer
                    .issue(&SessionSubject {
                        user_id: "uid-42".to_string(),
                        email: body.email,
                        email_verified: true,
                    })
                    .map(|token| Json(serde_json::json!({ "token": token })))
                    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
            }
        }),
    )
}

#[tokio::test]
async fn state_issuer_tokens_reach_me() -> Result<()> {
    let state = GatewayState::new(config().with_token_ttl_seconds(900));
    let app = gateway::router(state.clone(), login_route(&state));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/login")
        .header(header::AUTHORIZATION, format!("Bearer {PROVIDER_TOKEN}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"email":"ana@example.com"}"#))?;
    let (status, _, body) = send(app.clone(), request).await?;
    assert_eq!(status, StatusCode::OK);

    let issued: serde_json::Value = serde_json::from_slice(&body)?;
    let token = issued["token"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("no token in login response"))?;

    let authorization = format!("Bearer {token}");
    let (status, _, body) = send(app, get_request("/api/me", None, Some(&authorization))?).await?;
    assert_eq!(status, StatusCode::OK);

    let claims: Claims = serde_json::from_slice(&body)?;
    assert_eq!(claims.email, "ana@example.com");
    assert_eq!(claims.exp - claims.iat, 900);
    Ok(())
}

#[tokio::test]
async fn client_exchange_completes_against_gateway() -> Result<()> {
    let state = GatewayState::new(config());
    let app = gateway::router(state.clone(), login_route(&state));

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server = tokio::spawn(async move { axum::serve(listener, app.into_make_service()).await });

    let base = Url::parse(&format!("http://{addr}"))?;
    let exchange = HttpSessionExchange::new(&base, Duration::from_secs(5))?;
    let token = exchange
        .exchange("ana@example.com", &SecretString::from(PROVIDER_TOKEN))
        .await?;

    let claims = state.verifier().verify(token.expose_secret())?;
    assert_eq!(claims.email, "ana@example.com");
    assert!(claims.email_verified);

    let refused = exchange
        .exchange("ana@example.com", &SecretString::from("someone-else"))
        .await;
    assert!(refused.is_err());

    server.abort();
    Ok(())
}
