use std::path::PathBuf;
use structopt::StructOpt;

use packtrack::config::Config;
use packtrack::input::CsvSource;
use packtrack::replay::{HttpSink, ReplayScheduler};

/// Package replay command line interface
#[derive(StructOpt, Debug)]
#[structopt(name = "packtrack_replay", about = "Replays recorded packages at their original cadence")]
pub enum Cli {
    /// Replay a CSV batch against the ingestion endpoint
    Run {
        /// Path to the packages CSV file
        #[structopt(short, long)]
        file: PathBuf,
        /// Override the configured ingestion endpoint
        #[structopt(short, long)]
        endpoint: Option<String>,
        /// Path to configuration file
        #[structopt(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
    /// Generate a default configuration file
    Config {
        /// Output path for the configuration file
        #[structopt(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    match Cli::from_args() {
        Cli::Run {
            file,
            endpoint,
            config,
        } => {
            let config = if config.exists() {
                Config::from_file(&config)?
            } else {
                Config::default()
            };
            let endpoint = endpoint.unwrap_or(config.replay.endpoint);

            let records = CsvSource::new(file).read_batch()?;
            log::info!("Loaded {} valid record(s)", records.len());

            let sink = HttpSink::new(&endpoint, config.replay.delivery_timeout_seconds)?;
            let scheduler = ReplayScheduler::new(sink);

            match scheduler.run(records).await {
                Ok(summary) => {
                    println!(
                        "Replay complete: {} sent, {} failed",
                        summary.sent, summary.failed
                    );
                }
                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(1);
                }
            }
        }
        Cli::Config { output } => {
            let config = Config::default();
            config.to_file(&output)?;
            println!("Default configuration written to: {:?}", output);
        }
    }

    Ok(())
}
