use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use packtrack::config::Config;
use packtrack::enrich::{Enricher, NominatimLookup};
use packtrack::server::{self, AppState};

/// Main entry point for the package tracker server
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("Starting package tracker server...");

    // Load configuration
    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = if config_path.exists() {
        Config::from_file(&config_path)?
    } else {
        log::warn!("Config file not found, using defaults");
        Config::default()
    };

    let lookup = NominatimLookup::new(
        &config.enrichment.lookup_url,
        config.enrichment.lookup_timeout_seconds,
        &config.enrichment.user_agent,
    )?;
    let enricher = Arc::new(Enricher::new(
        Arc::new(lookup),
        config.enrichment.cache_capacity,
    ));

    let state = AppState::new(
        config.server.store_capacity,
        enricher,
        config.server.cluster_radius_km,
    );

    log::info!(
        "Store capacity: {}, cluster radius: {} km",
        config.server.store_capacity,
        config.server.cluster_radius_km
    );

    server::serve(&config.server.bind_address, state).await?;

    log::info!("Package tracker server stopped");
    Ok(())
}
