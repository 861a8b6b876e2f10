use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use ladder_harvest::riot_utils::RiotClient;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter, prelude::*, EnvFilter, Layer};

mod commands;

#[derive(Debug, Clone)]
pub struct Config {
    pub riot_api_key: Option<String>,
    pub log_path: PathBuf,
    pub data_dir: PathBuf,
}

fn load_config() -> Result<Config> {
    dotenv().ok();

    // A missing key is reported by the first API call, not here.
    let riot_api_key = env::var("RIOT_API_KEY").ok();

    let log_path = PathBuf::from(env::var("LOG_PATH").unwrap_or_else(|_| ".".to_string()));
    let data_dir = PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()));

    Ok(Config {
        riot_api_key,
        log_path,
        data_dir,
    })
}

fn init_tracing(config: &Config) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(&config.log_path, "harvest.log");
    let (non_blocking_appender, guard) = tracing_appender::non_blocking(file_appender);

    let console_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(console_filter))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking_appender)
                .with_filter(filter::filter_fn(|metadata| {
                    metadata.target().starts_with("ladder_harvest")
                })),
        )
        .init();

    guard
}

#[derive(Debug, Parser)]
#[command(
    name = "ladder_harvest",
    about = "Harvests ranked ladder players and match histories from the Riot API"
)]
struct Cli {
    /// Directory for output files. Defaults to DATA_DIR.
    #[arg(long, global = true)]
    out: Option<PathBuf>,

    /// Compute tables without writing them.
    #[arg(long, global = true)]
    no_save: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch the top of a region's solo-queue ladder.
    Players {
        #[arg(long)]
        region: String,
        #[arg(long, default_value_t = 200)]
        count: usize,
    },
    /// Crawl match histories of seed players.
    Matches {
        #[arg(long)]
        region: String,
        /// Epoch seconds to look back to.
        #[arg(long)]
        start: i64,
        /// Epoch seconds to look forward to. Defaults to now.
        #[arg(long)]
        end: Option<i64>,
        /// Wall-clock budget in hours.
        #[arg(long)]
        hours: f64,
        /// Raw player data file with a `puuid` column.
        #[arg(long, conflicts_with = "top", required_unless_present = "top")]
        players_file: Option<PathBuf>,
        /// Seed with the top N ladder players instead.
        #[arg(long)]
        top: Option<usize>,
    },
    /// Build the player directory from raw match data.
    ProcessPlayers {
        #[arg(long)]
        matches: PathBuf,
        /// Leave the key column out.
        #[arg(long)]
        no_key: bool,
    },
    /// Key raw match data against a player directory.
    ProcessMatches {
        #[arg(long)]
        matches: PathBuf,
        #[arg(long)]
        players: PathBuf,
        /// Share of names per slot replaced with the unknown player.
        #[arg(long, default_value_t = 0.0)]
        noise: f64,
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config().context("Failed to load configuration")?;
    let _guard = init_tracing(&config);

    std::panic::set_hook(Box::new(|i| {
        error!("Panic'd: {}", i);
    }));

    let cli = Cli::parse();
    let out_dir = if cli.no_save {
        None
    } else {
        Some(cli.out.unwrap_or_else(|| config.data_dir.clone()))
    };
    if let Some(dir) = &out_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    }

    let client = RiotClient::new(config.riot_api_key.as_deref());
    info!("Running {:?}", cli.command);

    match cli.command {
        Command::Players { region, count } => {
            commands::players::run(&client, &region, count, out_dir.as_deref()).await
        }
        Command::Matches {
            region,
            start,
            end,
            hours,
            players_file,
            top,
        } => {
            let source = match (players_file, top) {
                (Some(path), _) => commands::matches::PlayerSource::File(path),
                (None, Some(count)) => commands::matches::PlayerSource::Ladder(count),
                (None, None) => anyhow::bail!("Specify one of --players-file or --top"),
            };
            commands::matches::run(&client, &region, start, end, hours, source, out_dir.as_deref())
                .await
        }
        Command::ProcessPlayers { matches, no_key } => {
            commands::process_players::run(&matches, !no_key, out_dir.as_deref())
        }
        Command::ProcessMatches {
            matches,
            players,
            noise,
            seed,
        } => {
            commands::process_matches::run(
                &client,
                &matches,
                &players,
                noise,
                seed,
                out_dir.as_deref(),
            )
            .await
        }
    }
}
