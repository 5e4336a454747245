pub mod package;

pub use package::{EnrichedPackage, PackageRecord};
