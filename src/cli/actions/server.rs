use crate::{
    cli::telemetry,
    gateway::{self, GatewayConfig},
};
use anyhow::Result;
use axum::Router;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub config: GatewayConfig,
}

/// Run the gateway until interrupted. Business routes, `/login` included, are
/// mounted by the embedding service through [`gateway::new`]; standalone,
/// every `/api` path other than `/me` is 404.
/// # Errors
/// Returns an error if the configuration is invalid or the server fails.
pub async fn execute(args: Args) -> Result<()> {
    let result = gateway::new(args.port, args.config, |_| Router::new()).await;
    telemetry::shutdown_tracer();
    result
}
