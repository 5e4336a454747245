//! Aggregation engine
//!
//! Pure functions over a point-in-time store snapshot; nothing here retains
//! state between calls, so repeated runs on an unchanged snapshot are
//! identical. All time bucketing uses the crate-wide UTC rule.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Timelike};
use serde::Serialize;

use crate::models::EnrichedPackage;

/// Per-country breakdown entry
#[derive(Debug, Clone, Serialize)]
pub struct CountryStat {
    pub country: String,
    pub total: usize,
    pub suspicious: usize,
    pub normal: usize,
    pub suspicious_percent: f64,
}

/// A rounded-coordinate location and how many packages hit it
#[derive(Debug, Clone, Serialize)]
pub struct LocationCount {
    pub latitude: f64,
    pub longitude: f64,
    pub count: usize,
}

/// Output of [`summarize`]
#[derive(Debug, Serialize)]
pub struct StatsSummary {
    pub total_packages: usize,
    pub suspicious_count: usize,
    /// Top 10 countries by suspicious count descending
    pub country_stats: Vec<CountryStat>,
    /// Top 5 rounded coordinates by frequency descending
    pub top_locations: Vec<LocationCount>,
}

/// Output of [`activity`]
#[derive(Debug, Serialize)]
pub struct ActivitySummary {
    pub activity_by_hour: [u64; 24],
    /// Indexed 0 = Monday .. 6 = Sunday
    pub activity_by_weekday: [u64; 7],
}

/// Compute totals, the per-country breakdown and the top locations.
pub fn summarize(packages: &[EnrichedPackage]) -> StatsSummary {
    let mut by_country: HashMap<&str, (usize, usize)> = HashMap::new();
    let mut by_location: HashMap<(i64, i64), usize> = HashMap::new();
    let mut suspicious_count = 0;

    for p in packages {
        let entry = by_country.entry(p.country.as_str()).or_insert((0, 0));
        entry.0 += 1;
        if p.suspicious {
            entry.1 += 1;
            suspicious_count += 1;
        }
        *by_location
            .entry((round2_key(p.latitude), round2_key(p.longitude)))
            .or_insert(0) += 1;
    }

    let mut country_stats: Vec<CountryStat> = by_country
        .into_iter()
        .map(|(country, (total, suspicious))| CountryStat {
            country: country.to_string(),
            total,
            suspicious,
            normal: total - suspicious,
            suspicious_percent: percent(suspicious, total),
        })
        .collect();
    // Deterministic ranking: suspicious desc, then total desc, then name
    country_stats.sort_by(|a, b| {
        b.suspicious
            .cmp(&a.suspicious)
            .then(b.total.cmp(&a.total))
            .then(a.country.cmp(&b.country))
    });
    country_stats.truncate(10);

    let mut top_locations: Vec<LocationCount> = by_location
        .into_iter()
        .map(|((lat, lon), count)| LocationCount {
            latitude: lat as f64 / 100.0,
            longitude: lon as f64 / 100.0,
            count,
        })
        .collect();
    top_locations.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then(a.latitude.total_cmp(&b.latitude))
            .then(a.longitude.total_cmp(&b.longitude))
    });
    top_locations.truncate(5);

    StatsSummary {
        total_packages: packages.len(),
        suspicious_count,
        country_stats,
        top_locations,
    }
}

/// Compute the hour-of-day and day-of-week activity histograms (UTC).
pub fn activity(packages: &[EnrichedPackage]) -> ActivitySummary {
    let mut by_hour = [0u64; 24];
    let mut by_weekday = [0u64; 7];

    for p in packages {
        if let Some(dt) = DateTime::from_timestamp(p.timestamp, 0) {
            by_hour[dt.hour() as usize] += 1;
            by_weekday[dt.weekday().num_days_from_monday() as usize] += 1;
        }
    }

    ActivitySummary {
        activity_by_hour: by_hour,
        activity_by_weekday: by_weekday,
    }
}

/// Coordinate rounding used for location grouping: 2 decimal places,
/// encoded as an integer key so grouped floats hash exactly.
fn round2_key(v: f64) -> i64 {
    (v * 100.0).round() as i64
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    ((part as f64 / total as f64) * 100.0 * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(country: &str, suspicious: bool, lat: f64, lon: f64, ts: i64) -> EnrichedPackage {
        EnrichedPackage {
            ip: "1.2.3.4".to_string(),
            latitude: lat,
            longitude: lon,
            timestamp: ts,
            suspicious,
            country: country.to_string(),
            human_time: String::new(),
        }
    }

    #[test]
    fn test_suspicious_percent() {
        let packages = vec![
            package("Unknown", true, 0.0, 0.0, 0),
            package("Unknown", true, 0.0, 0.0, 0),
            package("Unknown", false, 0.0, 0.0, 0),
            package("Unknown", false, 0.0, 0.0, 0),
            package("Unknown", false, 0.0, 0.0, 0),
        ];

        let summary = summarize(&packages);
        assert_eq!(summary.total_packages, 5);
        assert_eq!(summary.suspicious_count, 2);
        assert_eq!(summary.country_stats.len(), 1);

        let unknown = &summary.country_stats[0];
        assert_eq!(unknown.country, "Unknown");
        assert_eq!(unknown.suspicious, 2);
        assert_eq!(unknown.normal, 3);
        assert_eq!(unknown.suspicious_percent, 40.0);
    }

    #[test]
    fn test_country_ranking_by_suspicious() {
        let mut packages = Vec::new();
        packages.push(package("France", true, 48.85, 2.35, 0));
        packages.push(package("France", true, 48.85, 2.35, 0));
        packages.push(package("Germany", true, 52.52, 13.40, 0));
        // Japan has more traffic but nothing suspicious
        for _ in 0..5 {
            packages.push(package("Japan", false, 35.68, 139.65, 0));
        }

        let summary = summarize(&packages);
        let names: Vec<&str> = summary
            .country_stats
            .iter()
            .map(|c| c.country.as_str())
            .collect();
        assert_eq!(names, vec!["France", "Germany", "Japan"]);
    }

    #[test]
    fn test_top_locations_rounded_and_grouped() {
        let packages = vec![
            // All three round to (40.71, -74.01)
            package("US", false, 40.7128, -74.0060, 0),
            package("US", false, 40.7131, -74.0055, 0),
            package("US", false, 40.7125, -74.0062, 0),
            package("UK", false, 51.5074, -0.1278, 0),
        ];

        let summary = summarize(&packages);
        assert_eq!(summary.top_locations[0].count, 3);
        assert_eq!(summary.top_locations[0].latitude, 40.71);
        assert_eq!(summary.top_locations[0].longitude, -74.01);
        assert_eq!(summary.top_locations[1].count, 1);
    }

    #[test]
    fn test_activity_histograms() {
        // 2024-01-01 (Monday) 00:30 UTC and 2024-01-04 (Thursday) 15:00 UTC
        let packages = vec![
            package("US", false, 0.0, 0.0, 1704069000),
            package("US", false, 0.0, 0.0, 1704380400),
        ];

        let summary = activity(&packages);
        assert_eq!(summary.activity_by_hour[0], 1);
        assert_eq!(summary.activity_by_hour[15], 1);
        assert_eq!(summary.activity_by_hour.iter().sum::<u64>(), 2);
        assert_eq!(summary.activity_by_weekday[0], 1); // Monday
        assert_eq!(summary.activity_by_weekday[3], 1); // Thursday
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let packages = vec![
            package("US", true, 40.71, -74.01, 1704069000),
            package("UK", false, 51.51, -0.13, 1704380400),
        ];

        let a = serde_json::to_value(summarize(&packages)).unwrap();
        let b = serde_json::to_value(summarize(&packages)).unwrap();
        assert_eq!(a, b);

        let c = serde_json::to_value(activity(&packages)).unwrap();
        let d = serde_json::to_value(activity(&packages)).unwrap();
        assert_eq!(c, d);
    }

    #[test]
    fn test_empty_snapshot() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_packages, 0);
        assert_eq!(summary.suspicious_count, 0);
        assert!(summary.country_stats.is_empty());
        assert!(summary.top_locations.is_empty());
    }
}
