//! # WealthWise (authentication gateway & credential lifecycle)
//!
//! `wealthwise` governs who may reach the WealthWise finance API. It has two
//! halves that never share a trust domain:
//!
//! ## Gateway
//!
//! Every inbound request runs an ordered pipeline: the origin allow-list, then
//! route classification (`Public`, `DevelopmentOpen`, `Protected`), then, for
//! protected routes only, verification of a backend-signed Session Token. A
//! verified token becomes a [`gateway::Principal`] attached to that one request.
//!
//! ## Client
//!
//! The client half validates the sign-in/sign-up form, talks to the external
//! identity provider, refuses to create a session for unverified emails, and
//! persists the `{email, token}` session record as one atomic unit.
//!
//! Provider tokens are never presented to the gateway. The client exchanges
//! them for a backend Session Token first.

pub mod cli;
pub mod client;
pub mod gateway;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
