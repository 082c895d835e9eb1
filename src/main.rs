use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rotor::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rotor=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            host,
            config,
            predictions_dir,
        } => {
            rotor::cli::serve(port, host, config, predictions_dir).await?;
        }
        Commands::Show {
            id,
            config,
            predictions_dir,
        } => {
            rotor::cli::show(id, config, predictions_dir).await?;
        }
    }

    Ok(())
}
