//! Exoplanet Discovery - Main Entry Point

use clap::{CommandFactory, Parser};
use exodiscovery::cli::{cmd_detect, cmd_models, cmd_predict, cmd_serve, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "exodiscovery=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Predict { data, mission, output, models_dir, outlier_cols }) => {
            cmd_predict(&data, mission.as_deref(), output.as_deref(), models_dir.as_deref(), outlier_cols)?;
        }
        Some(Commands::Detect { data }) => {
            cmd_detect(&data)?;
        }
        Some(Commands::Models { models_dir }) => {
            cmd_models(models_dir.as_deref())?;
        }
        Some(Commands::Serve { port, host, models_dir }) => {
            cmd_serve(&host, port, models_dir.as_deref()).await?;
        }
        None => {
            Cli::command().print_help()?;
        }
    }

    Ok(())
}
