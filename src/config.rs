use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the package tracker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Ingestion/analytics server configuration
    pub server: ServerConfig,
    /// Replay client configuration
    pub replay: ReplayConfig,
    /// Country enrichment configuration
    pub enrichment: EnrichmentConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    pub bind_address: String,
    /// Maximum number of packages kept in the bounded store
    pub store_capacity: usize,
    /// Default clustering radius for the map endpoint, in kilometers
    pub cluster_radius_km: f64,
}

/// Replay client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Ingestion endpoint packages are POSTed to
    pub endpoint: String,
    /// Per-delivery HTTP timeout in seconds
    pub delivery_timeout_seconds: u64,
}

/// Country enrichment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Base URL of the reverse-geocoding service
    pub lookup_url: String,
    /// Lookup HTTP timeout in seconds
    pub lookup_timeout_seconds: u64,
    /// Capacity of the rounded-coordinate country cache
    pub cache_capacity: usize,
    /// User agent sent to the geocoding service
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                bind_address: "0.0.0.0:5000".to_string(),
                store_capacity: 1000,
                cluster_radius_km: 50.0,
            },
            replay: ReplayConfig {
                endpoint: "http://localhost:5000/api/packages".to_string(),
                delivery_timeout_seconds: 30,
            },
            enrichment: EnrichmentConfig {
                lookup_url: "https://nominatim.openstreetmap.org".to_string(),
                lookup_timeout_seconds: 10,
                cache_capacity: 1000,
                user_agent: "network_package_tracker".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn to_file(&self, path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
