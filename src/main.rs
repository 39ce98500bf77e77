mod account;
mod api;
mod auth;
mod autofill;
mod config;
mod context;
mod db;
mod error;
mod gifting;
mod identity;
mod realtime;
mod server;
mod wishlist;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::ServerConfig::from_env()?;
    config.validate()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new(config.logging.level.clone())
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(version = %config.service.version, "starting giftwish");

    let ctx = context::AppContext::new(config).await?;
    server::serve(ctx).await?;

    Ok(())
}
