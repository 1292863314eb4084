use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use labelwise_core::config::{Config, ConfigPaths};
use labelwise_core::ids::ScanId;
use labelwise_core::types::Granularity;

mod commands;
mod telemetry;

#[derive(Parser, Debug)]
#[command(
    name = "labelwise",
    version,
    about = "Explainable health scores for packaged food labels"
)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `risk_engine=debug`. `RUST_LOG` wins.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Init {
        #[arg(long)]
        path: Option<PathBuf>,
        #[arg(long)]
        force: bool,
    },
    /// Score one extracted label
    Score {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        json: bool,
        /// Record the scan in the local history
        #[arg(long)]
        save: bool,
        /// Record the scan and opt it into trend statistics
        #[arg(long)]
        commit: bool,
    },
    /// Opt a recorded scan into trend statistics
    Commit { scan_id: ScanId },
    Trend {
        #[arg(long)]
        granularity: Option<Granularity>,
        /// Trend points JSON instead of the local history
        #[arg(long)]
        input: Option<PathBuf>,
        /// Evaluate as of this RFC 3339 instant
        #[arg(long)]
        now: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Show the loaded risk database
    Database {
        #[arg(long)]
        path: Option<PathBuf>,
    },
    Config {
        #[arg(long)]
        print: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let paths = ConfigPaths::resolve()?;
    let config_path = cli.config.clone().unwrap_or_else(|| paths.config_path.clone());
    let config = Config::load_or_default(&config_path)?;

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    telemetry::init(&level)?;

    match cli.command {
        Commands::Init { path, force } => init_config(path.unwrap_or(config_path), force),
        Commands::Score {
            input,
            json,
            save,
            commit,
        } => commands::score::execute(commands::score::ScoreInputs {
            config,
            history_path: paths.history_path,
            input,
            json,
            save: save || commit,
            commit,
        }),
        Commands::Commit { scan_id } => commands::history::commit(&paths.history_path, scan_id),
        Commands::Trend {
            granularity,
            input,
            now,
            json,
        } => commands::trend::execute(commands::trend::TrendInputs {
            granularity: granularity.unwrap_or(config.trend.default_granularity),
            thresholds: config.thresholds,
            history_path: paths.history_path,
            input,
            now,
            json,
        }),
        Commands::Database { path } => commands::database::execute(&config, path),
        Commands::Config { print } => {
            if print {
                commands::config::print_effective(&config)
            } else {
                println!("{}", config_path.display());
                Ok(())
            }
        }
    }
}

fn init_config(config_path: PathBuf, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        return Err(anyhow::anyhow!(
            "Config already exists at {} (use --force to overwrite)",
            config_path.display()
        ));
    }
    let config = Config::default_config();
    config.save(&config_path)?;
    println!("Config written to {}", config_path.display());
    Ok(())
}
