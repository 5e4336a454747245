pub mod config;
pub mod models;
pub mod validate;
pub mod input;
pub mod replay;
pub mod enrich;
pub mod store;
pub mod stats;
pub mod cluster;
pub mod server;

// Re-export commonly used types
pub use models::{EnrichedPackage, PackageRecord};
pub use validate::{parse_package, ValidationError};
pub use replay::{DeliverySink, HttpSink, ReplayScheduler};
pub use enrich::{CountryLookup, Enricher, NominatimLookup};
pub use store::BoundedStore;
pub use cluster::{Cluster, GeoPoint};
