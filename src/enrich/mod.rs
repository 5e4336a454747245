//! Package enrichment
//!
//! Adds the derived fields to a validated package: a UTC human-readable
//! timestamp and a country name resolved through a reverse-geocoding
//! collaborator. The lookup is slow and unreliable by contract, so results
//! are cached in an explicit bounded LRU keyed by coordinates rounded to
//! two decimal places (the same precision the aggregation engine groups by)
//! and every failure degrades to the "Unknown" sentinel.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::models::{EnrichedPackage, PackageRecord};

/// Fixed rendering of `timestamp`; always UTC, never the ambient zone.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const UNKNOWN_COUNTRY: &str = "Unknown";

/// Errors from country resolution. Never surfaced past the enricher;
/// callers only ever see the "Unknown" sentinel.
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("response carried no country")]
    NoCountry,
}

/// Reverse-geocoding collaborator: coordinates in, country name out.
#[async_trait]
pub trait CountryLookup: Send + Sync {
    async fn country(&self, latitude: f64, longitude: f64) -> Result<String, LookupError>;
}

/// Nominatim-backed reverse geocoder with an explicit request timeout.
pub struct NominatimLookup {
    client: Client,
    base_url: String,
}

impl NominatimLookup {
    pub fn new(base_url: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, LookupError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .build()?;
        Ok(NominatimLookup {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CountryLookup for NominatimLookup {
    async fn country(&self, latitude: f64, longitude: f64) -> Result<String, LookupError> {
        let url = format!("{}/reverse", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("accept-language", "en".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: serde_json::Value = response.json().await?;
        body.get("address")
            .and_then(|a| a.get("country"))
            .and_then(|c| c.as_str())
            .map(String::from)
            .ok_or(LookupError::NoCountry)
    }
}

/// Bounded least-recently-used map from rounded coordinates to country.
pub struct CountryCache {
    entries: HashMap<(i64, i64), String>,
    order: VecDeque<(i64, i64)>,
    capacity: usize,
}

impl CountryCache {
    pub fn new(capacity: usize) -> Self {
        CountryCache {
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn get(&mut self, key: (i64, i64)) -> Option<String> {
        let value = self.entries.get(&key).cloned()?;
        self.touch(key);
        Some(value)
    }

    pub fn insert(&mut self, key: (i64, i64), value: String) {
        if self.entries.insert(key, value).is_some() {
            self.touch(key);
            return;
        }
        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        self.order.push_back(key);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn touch(&mut self, key: (i64, i64)) {
        if let Some(pos) = self.order.iter().position(|k| *k == key) {
            self.order.remove(pos);
            self.order.push_back(key);
        }
    }
}

/// Enrichment stage: owns the lookup collaborator and its cache.
pub struct Enricher {
    lookup: Arc<dyn CountryLookup>,
    cache: Mutex<CountryCache>,
}

impl Enricher {
    pub fn new(lookup: Arc<dyn CountryLookup>, cache_capacity: usize) -> Self {
        Enricher {
            lookup,
            cache: Mutex::new(CountryCache::new(cache_capacity)),
        }
    }

    /// Enrich a validated package. Infallible: lookup problems degrade to
    /// the "Unknown" country rather than propagating.
    pub async fn enrich(&self, record: PackageRecord) -> EnrichedPackage {
        let country = self.resolve_country(record.latitude, record.longitude).await;
        EnrichedPackage {
            human_time: human_time(record.timestamp),
            country,
            ip: record.ip,
            latitude: record.latitude,
            longitude: record.longitude,
            timestamp: record.timestamp,
            suspicious: record.suspicious,
        }
    }

    async fn resolve_country(&self, latitude: f64, longitude: f64) -> String {
        let key = (cache_key(latitude), cache_key(longitude));

        if let Some(country) = self.cache.lock().await.get(key) {
            return country;
        }

        // Concurrent misses for the same key may both reach the network;
        // duplicate work is acceptable, cache corruption is not.
        let country = match self.lookup.country(latitude, longitude).await {
            Ok(country) => country,
            Err(e) => {
                log::warn!(
                    "Country lookup failed for ({:.2}, {:.2}): {}",
                    latitude,
                    longitude,
                    e
                );
                UNKNOWN_COUNTRY.to_string()
            }
        };

        // Failures are cached too, matching the upstream rate limit budget
        self.cache.lock().await.insert(key, country.clone());
        country
    }
}

/// Render a Unix timestamp with the crate's fixed UTC format.
///
/// Timestamps chrono cannot represent degrade to the epoch rendering.
pub fn human_time(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .unwrap_or_default()
        .format(DATE_FORMAT)
        .to_string()
}

fn cache_key(v: f64) -> i64 {
    (v * 100.0).round() as i64
}
