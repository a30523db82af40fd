mod budget;
mod dashboard;
mod explore;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "tripdash")]
#[command(about = "Travel explorer, budget estimator and trip dashboard")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Ask once for places to visit and list the ones with coordinates
    Ask {
        /// City or region to explore
        query: String,

        /// Print the assistant turn as JSON
        #[arg(long)]
        json: bool,
    },
    /// Interactive explore session (`:select N`, `:history`, `:quit`)
    Chat,
    /// Extract places from saved model output, without calling the API
    Extract {
        /// File holding the reply text; reads stdin when omitted
        file: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },
    /// Estimate expenses for a destination against a total budget
    Budget {
        destination: String,

        /// Total budget in the display currency
        #[arg(long)]
        budget: Decimal,

        /// Override the configured display currency
        #[arg(long)]
        currency: Option<String>,

        /// Refresh with verified listings after the simulated fetch delay
        #[arg(long)]
        live: bool,

        #[arg(long)]
        json: bool,
    },
    /// List destinations in the budget catalog
    Destinations,
    /// Print the trip dashboard
    Dashboard,
}

fn init_tracing(default_level: &str) {
    // RUST_LOG wins; logs go to stderr so stdout stays parseable.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = tripdash_core::load_app_config().context("failed to load configuration")?;
    init_tracing(&config.log_level);
    tracing::debug!(env = %config.env, "configuration loaded");

    match cli.command {
        Commands::Ask { query, json } => explore::run_ask(&config, &query, json).await,
        Commands::Chat => explore::run_chat(&config).await,
        Commands::Extract { file, json } => explore::run_extract(&config, file.as_deref(), json),
        Commands::Budget {
            destination,
            budget,
            currency,
            live,
            json,
        } => {
            let opts = budget::BudgetOptions {
                total_budget: budget,
                currency: currency.unwrap_or_else(|| config.currency.clone()),
                live,
                json,
            };
            budget::run_budget(&config, &destination, &opts).await
        }
        Commands::Destinations => budget::run_destinations(&config),
        Commands::Dashboard => dashboard::run_dashboard(&config),
    }
}
