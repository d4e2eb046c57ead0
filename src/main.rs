//! llmos CLI entry point.

use anyhow::Result;
use clap::Parser;
use llmos::cli::{commands, Cli, Commands};
use llmos::config::Settings;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("llmos={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config_path = cli.config.as_ref().map(PathBuf::from);
    let settings = Settings::load_from(config_path.as_ref())?;

    std::fs::create_dir_all(settings.data_dir())?;
    std::fs::create_dir_all(settings.workspace_dir())?;

    let debug_mode = cli.verbose >= 2;

    match &cli.command {
        Commands::Init => {
            commands::run_init(&settings)?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings)?;
        }

        Commands::Chat { user, run } => {
            commands::run_chat(user.clone(), run.clone(), debug_mode, settings).await?;
        }

        Commands::Ask { question, user, run } => {
            commands::run_ask(question, user.clone(), run.clone(), debug_mode, settings).await?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(host.clone(), *port, settings).await?;
        }

        Commands::Knowledge { action } => {
            commands::run_knowledge(action, settings).await?;
        }

        Commands::Runs { user } => {
            commands::run_runs(user.clone(), settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings, config_path)?;
        }
    }

    Ok(())
}
