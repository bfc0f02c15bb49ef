use crate::gateway::{
    config::{DEFAULT_ALLOWED_ORIGINS, DEFAULT_TOKEN_TTL_SECONDS},
    Environment, GatewayConfig,
};
use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_PORT: &str = "port";
pub const ARG_TOKEN_SECRET: &str = "token-secret";
pub const ARG_TOKEN_TTL_SECONDS: &str = "token-ttl-seconds";
pub const ARG_ALLOWED_ORIGINS: &str = "allowed-origins";
pub const ARG_ENVIRONMENT: &str = "environment";
pub const ARG_DEV_OPEN_ROUTES: &str = "dev-open-routes";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("5001")
                .env("WEALTHWISE_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_TOKEN_SECRET)
                .long(ARG_TOKEN_SECRET)
                .help("HMAC secret used to sign and verify Session Tokens")
                .env("WEALTHWISE_TOKEN_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_TOKEN_TTL_SECONDS)
                .long(ARG_TOKEN_TTL_SECONDS)
                .help("Lifetime of issued Session Tokens")
                .env("WEALTHWISE_TOKEN_TTL_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
        .arg(
            Arg::new(ARG_ALLOWED_ORIGINS)
                .long(ARG_ALLOWED_ORIGINS)
                .help("Comma-separated browser origins allowed to call the API")
                .env("WEALTHWISE_ALLOWED_ORIGINS")
                .value_delimiter(',')
                .action(ArgAction::Append)
                .default_values(DEFAULT_ALLOWED_ORIGINS),
        )
        .arg(
            Arg::new(ARG_ENVIRONMENT)
                .long(ARG_ENVIRONMENT)
                .help("Deployment environment: development, staging, production")
                .env("WEALTHWISE_ENVIRONMENT")
                .default_value("production")
                .value_parser(parse_environment),
        )
        .arg(
            Arg::new(ARG_DEV_OPEN_ROUTES)
                .long(ARG_DEV_OPEN_ROUTES)
                .help("Serve /api/stock/ and /api/portfolio without a token (non-production only)")
                .env("WEALTHWISE_DEV_OPEN_ROUTES")
                .action(ArgAction::SetTrue),
        )
}

fn parse_environment(value: &str) -> Result<Environment, String> {
    value.parse::<Environment>().map_err(|err| err.to_string())
}

#[derive(Debug)]
pub struct Options {
    pub port: u16,
    pub config: GatewayConfig,
}

impl Options {
    /// # Errors
    /// Returns an error if a required argument is missing or the resulting
    /// configuration is rejected.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(5001);

        let secret = matches
            .get_one::<String>(ARG_TOKEN_SECRET)
            .cloned()
            .context("missing required argument: --token-secret")?;

        let token_ttl = matches
            .get_one::<i64>(ARG_TOKEN_TTL_SECONDS)
            .copied()
            .unwrap_or(DEFAULT_TOKEN_TTL_SECONDS);

        let origins: Vec<String> = matches
            .get_many::<String>(ARG_ALLOWED_ORIGINS)
            .map(|values| values.cloned().collect())
            .unwrap_or_default();

        let environment = matches
            .get_one::<Environment>(ARG_ENVIRONMENT)
            .copied()
            .unwrap_or_default();

        let config = GatewayConfig::new(SecretString::from(secret))
            .with_allowed_origins(origins)
            .with_environment(environment)
            .with_token_ttl_seconds(token_ttl)
            .with_development_open(matches.get_flag(ARG_DEV_OPEN_ROUTES));

        config.validate().context("invalid gateway configuration")?;

        Ok(Self { port, config })
    }
}
