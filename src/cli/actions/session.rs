//! Terminal front-end for the credential lifecycle.

use crate::client::{
    self, AuthStatus, ClientConfig, Destination, Form, FormFields, FormMode, LifecycleError,
    Transition,
};
use anyhow::Result;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub config: ClientConfig,
    pub fields: FormFields,
}

/// Submit the form in `mode` and print the outcome.
/// # Errors
/// Returns the lifecycle error after printing its notice.
pub async fn submit(args: Args, mode: FormMode) -> Result<()> {
    let manager = client::manager(&args.config)?;
    if let Some(record) = manager.restore()? {
        debug!(email = %record.email, "replacing existing session");
    }

    let mut form = Form::with_fields(mode, args.fields);

    match manager.submit(&mut form).await {
        Ok(transition) => {
            print_transition(&transition, &manager.status());
            Ok(())
        }
        Err(err) => {
            report(&err);
            Err(err.into())
        }
    }
}

/// # Errors
/// Returns the lifecycle error after printing its notice.
pub async fn logout(config: &ClientConfig) -> Result<()> {
    let manager = client::manager(config)?;
    manager.restore()?;

    match manager.sign_out().await {
        Ok(transition) => {
            print_transition(&transition, &manager.status());
            Ok(())
        }
        Err(err) => {
            report(&err);
            Err(err.into())
        }
    }
}

fn print_transition(transition: &Transition, status: &AuthStatus) {
    if let Some(notice) = &transition.notice {
        println!("{notice}");
    }

    match (transition.destination, status) {
        (Destination::Home, AuthStatus::SignedIn { email }) => println!("Signed in as {email}"),
        (Destination::Login, AuthStatus::SignedOut) if transition.notice.is_none() => {
            println!("Signed out");
        }
        _ => {}
    }
}

fn report(err: &LifecycleError) {
    if let LifecycleError::Validation(errors) = err {
        for (field, message) in errors.iter() {
            eprintln!("{field}: {message}");
        }
    } else {
        eprintln!("{}", err.notice());
    }
}
