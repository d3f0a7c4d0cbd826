mod config;
mod error;
mod jobs;
mod logging;
mod models;
mod rest;
mod store;

use chrono::Utc;
use clap::{Parser, Subcommand};
use config::Config;
use error::AppError;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "elevator", version, about = "Elevator demand ingestion and prediction")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the ingestion API
    Serve,
    /// Rebuild the feature snapshot and materialize the online store
    Features,
    /// Train the demand model on historical features
    Train,
    /// Predict the demanded floor from online features
    Predict,
}

async fn run(command: Command, config: Config) -> Result<(), AppError> {
    match command {
        Command::Serve => {
            let pool = models::establish_db_connection(config.database_url()).await?;
            rest::dispatch_server_daemon(pool, &config).await?;
        }
        Command::Features => {
            let report = jobs::features::run(&config, Utc::now()).await?;
            println!(
                "Feature engineering and ingestion completed: {} rows, {} materialized.",
                report.rows, report.materialized.rows
            );
        }
        Command::Train => {
            let report = jobs::training::run(&config).await?;
            println!("Mean Squared Error: {}", report.mse);
            println!(
                "Model training completed and saved to {}.",
                config.model_path().display()
            );
        }
        Command::Predict => {
            let predictions = jobs::prediction::run(&config).await?;
            println!("Predictions:");
            println!("{:?}", predictions);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let _guard = match logging::init_tracing(config.otel_stdout()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    info!(version = elevator_core::CORE_VERSION, command = ?cli.command, "Starting");
    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(%e, "Command failed");
            ExitCode::FAILURE
        }
    }
}
