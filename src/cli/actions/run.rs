use crate::cli::actions::{server, session, Action};
use crate::client::FormMode;
use anyhow::Result;

/// Single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Server(args) => server::execute(args).await,
        Action::Login(args) => session::submit(args, FormMode::Login).await,
        Action::Signup(args) => session::submit(args, FormMode::Signup).await,
        Action::Logout(config) => session::logout(&config).await,
    }
}
