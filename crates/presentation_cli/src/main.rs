//! Weathercache CLI
//!
//! Command-line front end for the destination weather cache. Results are
//! printed to stdout as pretty JSON; logs go to stderr.

#![allow(clippy::print_stdout)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use application::WeatherCacheService;
use clap::{Parser, Subcommand};
use infrastructure::{
    AppConfig, AsyncDatabase, AsyncDatabaseConfig, RetryingWeatherAdapter, SqliteWeatherCache,
    init_tracing, spawn_cache_sweeper,
};
use serde::Serialize;
use tracing::info;

/// Weathercache CLI
#[derive(Parser)]
#[command(name = "weathercache")]
#[command(author, version, about = "Destination weather cache", long_about = None)]
struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to a TOML configuration file (default: ./config.toml if present)
    #[arg(short, long, env = "WEATHERCACHE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Weather for one destination, served from cache when valid
    Get {
        /// Destination name, e.g. "Kandy"
        destination: String,

        /// Skip the cache and fetch fresh data
        #[arg(short, long)]
        force: bool,
    },

    /// Weather for several destinations (1 to 20)
    Batch {
        /// Destination names
        #[arg(required = true)]
        destinations: Vec<String>,
    },

    /// Refresh stale destinations in paced chunks (1 to 20)
    Update {
        /// Destination names
        #[arg(required = true)]
        destinations: Vec<String>,
    },

    /// Cache statistics
    Stats,

    /// Delete expired entries
    Cleanup,

    /// Delete every entry
    Clear,

    /// Decoded raw provider response stored for a destination
    Raw {
        /// Destination name
        destination: String,
    },

    /// Run the periodic expiry sweep until Ctrl-C
    ServeSweeper,
}

impl Commands {
    /// Whether the command may call the upstream provider
    const fn needs_provider(&self) -> bool {
        matches!(
            self,
            Self::Get { .. } | Self::Batch { .. } | Self::Update { .. }
        )
    }
}

/// Determine log filter level from verbosity count
const fn log_filter_from_verbosity(verbose: u8) -> Option<&'static str> {
    match verbose {
        0 => None,
        1 => Some("info"),
        2 => Some("debug"),
        _ => Some("trace"),
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => AppConfig::load().context("Failed to load configuration"),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_ref())?;
    if let Some(filter) = log_filter_from_verbosity(cli.verbose) {
        config.telemetry.log_filter = filter.to_string();
    }
    init_tracing(&config.telemetry)?;

    if cli.command.needs_provider() {
        config.validate()?;
    }

    let db = AsyncDatabase::new(&AsyncDatabaseConfig::from(&config.database))
        .await
        .context("Failed to open database")?;
    db.migrate().await.context("Failed to run migrations")?;
    let cache = Arc::new(SqliteWeatherCache::new(db.pool().clone()));

    let provider =
        RetryingWeatherAdapter::with_config(config.provider.to_client_config(), config.retry.clone())?;
    let service = WeatherCacheService::new(
        cache.clone(),
        Arc::new(provider),
        config.service_config(),
    );

    match cli.command {
        Commands::Get { destination, force } => {
            print_json(&service.get_weather(&destination, force).await?)?;
        },
        Commands::Batch { destinations } => {
            print_json(&service.get_multiple_weather(&destinations).await?)?;
        },
        Commands::Update { destinations } => {
            print_json(&service.update_multiple_destinations(&destinations).await?)?;
        },
        Commands::Stats => {
            print_json(&service.get_stats().await?)?;
        },
        Commands::Cleanup => {
            let removed = service.cleanup().await?;
            print_json(&serde_json::json!({ "removed": removed }))?;
        },
        Commands::Clear => {
            let removed = service.clear_all().await?;
            print_json(&serde_json::json!({ "removed": removed }))?;
        },
        Commands::Raw { destination } => {
            print_json(&service.get_raw_payload(&destination).await?)?;
        },
        Commands::ServeSweeper => {
            let sweeper = spawn_cache_sweeper(cache, Some(config.cache.cleanup_interval()));
            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl-C")?;
            info!("Shutting down sweeper");
            sweeper.abort();
        },
    }

    db.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn log_filter_from_verbosity_levels() {
        assert_eq!(log_filter_from_verbosity(0), None);
        assert_eq!(log_filter_from_verbosity(1), Some("info"));
        assert_eq!(log_filter_from_verbosity(2), Some("debug"));
        assert_eq!(log_filter_from_verbosity(5), Some("trace"));
    }

    #[test]
    fn parse_get_with_force() {
        let cli = Cli::try_parse_from(["weathercache", "-vv", "get", "Kandy", "--force"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Commands::Get { ref destination, force: true } if destination == "Kandy"
        ));
    }

    #[test]
    fn parse_batch_collects_destinations() {
        let cli = Cli::try_parse_from(["weathercache", "batch", "Kandy", "Nuwara Eliya"]).unwrap();
        match cli.command {
            Commands::Batch { destinations } => {
                assert_eq!(destinations, vec!["Kandy", "Nuwara Eliya"]);
            },
            _ => panic!("expected batch"),
        }
    }

    #[test]
    fn batch_requires_destinations() {
        assert!(Cli::try_parse_from(["weathercache", "update"]).is_err());
    }

    #[test]
    fn parse_config_path_and_sweeper() {
        let cli = Cli::try_parse_from([
            "weathercache",
            "--config",
            "/etc/weathercache.toml",
            "serve-sweeper",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/weathercache.toml")));
        assert!(matches!(cli.command, Commands::ServeSweeper));
    }

    #[test]
    fn only_fetching_commands_need_provider() {
        assert!(
            Commands::Get {
                destination: "Kandy".into(),
                force: false
            }
            .needs_provider()
        );
        assert!(!Commands::Stats.needs_provider());
        assert!(!Commands::ServeSweeper.needs_provider());
    }
}
