//! Saber Console binary.
//!
//! Entry point for the teacher console that monitors student browsers.

use saber_console::ConsoleConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the dashboard
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,saber_console=debug,saber_sdk=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ConsoleConfig::from_env()?;

    tracing::info!("Starting Saber Console");
    tracing::info!("Initial sort: {:?}, filter: {:?}", config.sort, config.filter);

    saber_console::run(config).await?;

    tracing::info!("Saber Console stopped");
    Ok(())
}
