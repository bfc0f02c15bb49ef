//! Map parsed arguments to an [`Action`].

use crate::cli::{
    actions::{server, session, Action},
    commands::{client, gateway},
};
use anyhow::{anyhow, Result};

/// # Errors
/// Returns an error if arguments are missing or produce an invalid
/// configuration.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some(("server", sub)) => {
            let options = gateway::Options::parse(sub)?;
            Ok(Action::Server(server::Args {
                port: options.port,
                config: options.config,
            }))
        }
        Some(("login", sub)) => Ok(Action::Login(session::Args {
            config: client::config(sub)?,
            fields: client::fields(sub),
        })),
        Some(("signup", sub)) => Ok(Action::Signup(session::Args {
            config: client::config(sub)?,
            fields: client::fields(sub),
        })),
        Some(("logout", sub)) => Ok(Action::Logout(client::config(sub)?)),
        Some((other, _)) => Err(anyhow!("unknown command: {other}")),
        None => Err(anyhow!("a command is required")),
    }
}
