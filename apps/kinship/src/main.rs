//! # Kinship - Family Tree Tool
//!
//! The main binary for the Kinship genealogy engine.
//!
//! ## Usage
//!
//! ```bash
//! kinship init
//! kinship add-person --first John --last Smith --sex M --born 1850
//! kinship add-family -p I1 -p I2 --married 1875
//! kinship add-child --family F1 --child I3
//! kinship search smith
//! kinship descendants I1
//! ```

use clap::Parser;
use kinship::cli::{self, Cli};
use kinship::config::{Config, LogFormat};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = Cli::parse();

    let (mut config, config_error) = match Config::load(cli.config.as_deref()) {
        Ok((config, _)) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    config.apply_env(|key| std::env::var(key).ok());

    init_tracing(&cli, &config);

    if let Some(e) = config_error {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = cli::execute(cli, &config) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// RUST_LOG wins, then -v/-q, then the configured filter.
fn init_tracing(cli: &Cli, config: &Config) {
    let directives = if cli.verbose {
        "kinship=debug,kinship_core=debug"
    } else if cli.quiet {
        "warn"
    } else {
        config.logging.filter.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
