//! Pullback trader CLI application.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use pullback_config::{load_config, AppConfig};
use pullback_monitor::{setup_logging, LogFormat};
use std::path::Path;
use tracing::warn;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    if let Commands::ValidateConfig = cli.command {
        setup_logging(level(&cli, None), format(&cli, None), None);
        return cli::commands::validate::run(&cli.config).await;
    }

    let config_found = cli.config.exists();
    let config = if config_found {
        load_config(&cli.config)
            .with_context(|| format!("Failed to load {}", cli.config.display()))?
    } else {
        AppConfig::default()
    };
    config.validate()?;

    // Setup logging
    let _guard = setup_logging(
        level(&cli, Some(&config)),
        format(&cli, Some(&config)),
        config.logging.file.as_deref().map(Path::new),
    );
    if !config_found {
        warn!(path = %cli.config.display(), "config file not found, using defaults");
    }

    // Execute command
    match cli.command {
        Commands::Backtest(args) => cli::commands::backtest::run(args, &config).await,
        Commands::Live(args) => cli::commands::live::run(args, &config).await,
        Commands::Compare(args) => cli::commands::compare::run(args, &config).await,
        Commands::ValidateConfig => Ok(()),
    }
}

fn level<'a>(cli: &Cli, config: Option<&'a AppConfig>) -> &'a str {
    match (cli.log_level, config) {
        (Some(level), _) => level.as_str(),
        (None, Some(config)) => config.logging.level.as_str(),
        (None, None) => "info",
    }
}

fn format(cli: &Cli, config: Option<&AppConfig>) -> LogFormat {
    if cli.json_logs {
        return LogFormat::Json;
    }
    config
        .and_then(|c| c.logging.format.parse().ok())
        .unwrap_or_default()
}
