//! Local persistence for qualitair measurements.
//!
//! This crate provides SQLite-based storage for validated readings and the
//! time-bucketing primitive used to aggregate them.
//!
//! # Features
//!
//! - Store readings with an auto-assigned timestamp
//! - Query by time range with pagination
//! - Aggregate into fixed-width buckets ("average per 5 minutes")
//! - JSON projection with `YYYY-MM-DD HH:MM:SS` timestamps
//!
//! # Example
//!
//! ```
//! use qualitair_store::{BucketQuery, Store};
//! use qualitair_types::Reading;
//!
//! let store = Store::open_in_memory()?;
//! store.create(&Reading::new(412, 7, 21.0, 45.0))?;
//!
//! let buckets = store.query_buckets(&BucketQuery::new(300))?;
//! assert_eq!(buckets.len(), 1);
//! # Ok::<(), qualitair_store::Error>(())
//! ```

mod bucket;
mod error;
mod models;
mod queries;
mod schema;
mod store;

pub use bucket::{IntervalBucket, TimestampRepr, bucket_expression};
pub use error::{Error, Result};
pub use models::{MeasurementBucket, StoredMeasurement};
pub use queries::{BucketQuery, MeasurementQuery};
pub use store::Store;

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/qualitair/qualitair.db`
/// - macOS: `~/Library/Application Support/qualitair/qualitair.db`
/// - Windows: `C:\Users\<user>\AppData\Local\qualitair\qualitair.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("qualitair")
        .join("qualitair.db")
}
