pub mod server;
pub mod session;

mod run;

use crate::client::{ClientConfig, FormMode};

#[derive(Debug)]
pub enum Action {
    Server(server::Args),
    Login(session::Args),
    Signup(session::Args),
    Logout(ClientConfig),
}

impl Action {
    /// Form mode the action submits, if it submits one.
    #[must_use]
    pub const fn form_mode(&self) -> Option<FormMode> {
        match self {
            Self::Login(_) => Some(FormMode::Login),
            Self::Signup(_) => Some(FormMode::Signup),
            Self::Server(_) | Self::Logout(_) => None,
        }
    }

    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
