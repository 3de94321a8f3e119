//! Starfall - Development Tools

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use starfall_tools::simulate::{run_simulation, SimulationOptions};
use starfall_tools::validate::{load_config, validate_tables_file};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "starfall-tools")]
#[command(about = "Development tools for Starfall")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate data files
    Validate {
        /// Path to a tables file or the directory holding tables.ron
        #[arg(default_value = "assets/data")]
        path: PathBuf,
    },
    /// Run a headless scripted game
    Simulate {
        /// Path to a tables file or the directory holding tables.ron
        #[arg(long, default_value = "assets/data")]
        data: PathBuf,
        /// Optional RON game config
        #[arg(long)]
        config: Option<PathBuf>,
        /// Random seed
        #[arg(long, default_value_t = 1)]
        seed: u64,
        /// Ticks to run
        #[arg(long, default_value_t = 100)]
        ticks: u64,
        /// Scripted players
        #[arg(long, default_value_t = 4)]
        players: u32,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));

    // Logs go to stderr; stdout carries command output.
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().compact().with_writer(std::io::stderr)))
        .init();

    std::panic::set_hook(Box::new(|info| {
        tracing::error!(%info, "panic");
    }));
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { path } => {
            tracing::info!("Validating data files in: {}", path.display());
            match validate_tables_file(&path) {
                Ok(_) => {
                    tracing::info!("Validation passed");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    tracing::error!("Validation failed: {e}");
                    ExitCode::FAILURE
                }
            }
        }
        Commands::Simulate {
            data,
            config,
            seed,
            ticks,
            players,
            json,
        } => {
            let tables = match validate_tables_file(&data) {
                Ok(tables) => tables,
                Err(e) => {
                    tracing::error!("Could not load data: {e}");
                    return ExitCode::FAILURE;
                }
            };
            let config = match config.as_deref().map(load_config).transpose() {
                Ok(config) => config.unwrap_or_default(),
                Err(e) => {
                    tracing::error!("Could not load config: {e}");
                    return ExitCode::FAILURE;
                }
            };

            let summary = run_simulation(
                config,
                tables,
                SimulationOptions {
                    seed,
                    ticks,
                    players,
                },
            );

            if json {
                match serde_json::to_string_pretty(&summary) {
                    Ok(text) => println!("{text}"),
                    Err(e) => {
                        tracing::error!("Could not encode summary: {e}");
                        return ExitCode::FAILURE;
                    }
                }
            } else {
                println!("{summary:#?}");
            }
            ExitCode::SUCCESS
        }
    }
}
