use serde::{Deserialize, Serialize};

/// A single validated geolocation package, as sent over the wire.
///
/// Immutable once created; the validator in `crate::validate` is the only
/// place these are constructed from untrusted input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageRecord {
    pub ip: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Seconds since the Unix epoch; doubles as the replay ordering key.
    pub timestamp: i64,
    pub suspicious: bool,
}

/// A stored package after enrichment.
///
/// `human_time` is a UTC rendering of `timestamp` and is always derivable
/// from it; `country` is "Unknown" whenever the reverse geocode failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedPackage {
    pub ip: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: i64,
    pub suspicious: bool,
    pub country: String,
    pub human_time: String,
}
