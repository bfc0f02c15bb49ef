use crate::client::{
    config::{DEFAULT_API_URL, DEFAULT_SESSION_FILE, DEFAULT_TIMEOUT_SECONDS},
    ClientConfig, FormFields,
};
use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;
use std::{path::PathBuf, time::Duration};
use url::Url;

pub const ARG_API_URL: &str = "api-url";
pub const ARG_FIREBASE_API_KEY: &str = "firebase-api-key";
pub const ARG_SESSION_FILE: &str = "session-file";
pub const ARG_TIMEOUT_SECONDS: &str = "timeout-seconds";

pub const ARG_NAME: &str = "name";
pub const ARG_EMAIL: &str = "email";
pub const ARG_PHONE: &str = "phone";
pub const ARG_PASSWORD: &str = "password";
pub const ARG_CONFIRM_PASSWORD: &str = "confirm-password";

/// Connection settings shared by `login`, `signup` and `logout`.
#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_API_URL)
                .long(ARG_API_URL)
                .help("Base URL of the WealthWise API")
                .env("WEALTHWISE_API_URL")
                .default_value(DEFAULT_API_URL),
        )
        .arg(
            Arg::new(ARG_FIREBASE_API_KEY)
                .long(ARG_FIREBASE_API_KEY)
                .help("Firebase Web API key")
                .env("WEALTHWISE_FIREBASE_API_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_SESSION_FILE)
                .long(ARG_SESSION_FILE)
                .help("Where the session record is kept")
                .env("WEALTHWISE_SESSION_FILE")
                .default_value(DEFAULT_SESSION_FILE)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new(ARG_TIMEOUT_SECONDS)
                .long(ARG_TIMEOUT_SECONDS)
                .help("Timeout for each provider or API call")
                .env("WEALTHWISE_TIMEOUT_SECONDS")
                .default_value("15")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}

fn credential_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_EMAIL)
                .short('e')
                .long(ARG_EMAIL)
                .help("Account email")
                .required(true),
        )
        .arg(
            Arg::new(ARG_PASSWORD)
                .long(ARG_PASSWORD)
                .help("Account password")
                .env("WEALTHWISE_PASSWORD")
                .hide_env_values(true)
                .required(true),
        )
}

#[must_use]
pub fn login() -> Command {
    let command = Command::new("login").about("Sign in and store a session");
    with_args(credential_args(command))
}

#[must_use]
pub fn signup() -> Command {
    let command = Command::new("signup")
        .about("Create an account and send the verification email")
        .arg(
            Arg::new(ARG_NAME)
                .short('n')
                .long(ARG_NAME)
                .help("Full name")
                .required(true),
        )
        .arg(
            Arg::new(ARG_PHONE)
                .long(ARG_PHONE)
                .help("10-digit mobile number")
                .required(true),
        )
        .arg(
            Arg::new(ARG_CONFIRM_PASSWORD)
                .long(ARG_CONFIRM_PASSWORD)
                .help("Password confirmation (defaults to --password)")
                .env("WEALTHWISE_CONFIRM_PASSWORD")
                .hide_env_values(true),
        );
    with_args(credential_args(command))
}

#[must_use]
pub fn logout() -> Command {
    with_args(Command::new("logout").about("Sign out and remove the stored session"))
}

/// # Errors
/// Returns an error if a required argument is missing or the API URL does
/// not parse.
pub fn config(matches: &ArgMatches) -> Result<ClientConfig> {
    let api_url = matches
        .get_one::<String>(ARG_API_URL)
        .map_or(DEFAULT_API_URL, String::as_str);
    let api_url = Url::parse(api_url).with_context(|| format!("invalid --api-url: {api_url}"))?;

    let api_key = matches
        .get_one::<String>(ARG_FIREBASE_API_KEY)
        .cloned()
        .context("missing required argument: --firebase-api-key")?;

    let session_file = matches
        .get_one::<PathBuf>(ARG_SESSION_FILE)
        .cloned()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_FILE));

    let timeout = matches
        .get_one::<u64>(ARG_TIMEOUT_SECONDS)
        .copied()
        .unwrap_or(DEFAULT_TIMEOUT_SECONDS);

    Ok(ClientConfig::new(api_url, SecretString::from(api_key))
        .with_session_file(session_file)
        .with_timeout(Duration::from_secs(timeout)))
}

/// Form values as typed on the command line.
#[must_use]
pub fn fields(matches: &ArgMatches) -> FormFields {
    let value = |id: &str| {
        matches
            .try_get_one::<String>(id)
            .ok()
            .flatten()
            .cloned()
            .unwrap_or_default()
    };

    let password = value(ARG_PASSWORD);
    let confirm_password = matches
        .try_get_one::<String>(ARG_CONFIRM_PASSWORD)
        .ok()
        .flatten()
        .cloned()
        .unwrap_or_else(|| password.clone());

    FormFields {
        name: value(ARG_NAME),
        email: value(ARG_EMAIL),
        phone: value(ARG_PHONE),
        password,
        confirm_password,
    }
}
