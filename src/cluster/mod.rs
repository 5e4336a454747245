//! Greedy radius-based spatial clustering
//!
//! Partitions point locations into clusters whose members fall within a
//! fixed great-circle radius of an evolving centroid. The algorithm is
//! order-sensitive by design: the center drifts as members join, so scan
//! order affects final membership. Consumers depend on matching cluster
//! counts, so this must not be replaced with a stable clustering scheme.

use serde::{Deserialize, Serialize};

/// Geographic coordinates of a single point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// A cluster computed for one clustering invocation; never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct Cluster {
    pub center: GeoPoint,
    pub count: usize,
    pub points: Vec<GeoPoint>,
}

/// Greedily cluster `points`, merging any point within `radius_km` of a
/// cluster's live centroid. Returns clusters sorted by member count
/// descending (stable, so equal-sized clusters keep formation order).
pub fn cluster_points(points: Vec<GeoPoint>, radius_km: f64) -> Vec<Cluster> {
    let mut remaining = points;
    let mut clusters = Vec::new();

    while !remaining.is_empty() {
        let seed = remaining.remove(0);
        let mut members = vec![seed];
        let mut center = seed;

        // Re-scan until a pass over the remainder adds nothing; the center
        // moves with each join, so later passes can pick up stragglers.
        loop {
            let mut absorbed = false;
            let mut i = 0;
            while i < remaining.len() {
                if haversine_distance(center, remaining[i]) <= radius_km {
                    members.push(remaining.remove(i));
                    center = centroid(&members);
                    absorbed = true;
                } else {
                    i += 1;
                }
            }
            if !absorbed {
                break;
            }
        }

        clusters.push(Cluster {
            center,
            count: members.len(),
            points: members,
        });
    }

    clusters.sort_by(|a, b| b.count.cmp(&a.count));
    clusters
}

fn centroid(points: &[GeoPoint]) -> GeoPoint {
    let n = points.len() as f64;
    GeoPoint {
        latitude: points.iter().map(|p| p.latitude).sum::<f64>() / n,
        longitude: points.iter().map(|p| p.longitude).sum::<f64>() / n,
    }
}

/// Calculate the great-circle distance between two points using the Haversine formula
/// Returns distance in kilometers
pub fn haversine_distance(a: GeoPoint, b: GeoPoint) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;

    let lat1_rad = a.latitude.to_radians();
    let lat2_rad = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lon = (b.longitude - a.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().asin();

    EARTH_RADIUS_KM * c
}
