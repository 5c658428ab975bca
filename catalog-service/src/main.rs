use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use catalog_service::prelude::*;

/// Library catalog HTTP service
#[derive(Parser)]
#[command(name = "catalog-service")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the search path
    #[arg(long, short, env = "CATALOG_CONFIG", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Override `service.port`
    #[arg(long, short, global = true)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the schema if needed and serve HTTP (default)
    Serve,
    /// Create the schema if needed and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Config::load().context("failed to load configuration")?,
    };
    if let Some(port) = cli.port {
        config.service.port = port;
    }

    init_tracing(&config)?;

    let pool = create_pool(&config.database)
        .await
        .context("failed to open the catalog database")?;
    apply_schema(&pool).await?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Migrate => {
            tracing::info!("Schema is up to date");
            pool.close().await;
        }
        Commands::Serve => {
            let app = router(AppState::new(config.clone(), pool.clone()));
            Server::new(config).serve(app).await?;
            pool.close().await;
        }
    }

    Ok(())
}
