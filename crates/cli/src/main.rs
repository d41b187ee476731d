mod args;
mod commands;
mod state;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nota_core::{load_config, validate_config, Config, ConfigError};

use args::Args;
use state::AppState;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Logging format comes from the config, so load it first
    let config = load_config(&args.config);
    init_logging(config.as_ref().map(|c| c.logging.json).unwrap_or(false));

    if let Err(e) = run(args, config).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn run(args: Args, config: Result<Config, ConfigError>) -> Result<()> {
    let config =
        config.with_context(|| format!("Failed to load config from {:?}", args.config))?;
    validate_config(&config).context("Configuration validation failed")?;
    info!("Configuration loaded from {:?}", args.config);

    let state = AppState::new(config)?;
    commands::execute(&state, args.command).await
}
