//! Query builders for stored measurements.
//!
//! [`MeasurementQuery`] filters and paginates raw rows; [`BucketQuery`]
//! aggregates them into fixed-width time buckets.
//!
//! # Example
//!
//! ```
//! use qualitair_store::{BucketQuery, MeasurementQuery, Store};
//! use time::{Duration, OffsetDateTime};
//!
//! let store = Store::open_in_memory()?;
//! let yesterday = OffsetDateTime::now_utc() - Duration::hours(24);
//!
//! let recent = store.query_measurements(&MeasurementQuery::new().since(yesterday).limit(50))?;
//! let five_minute_averages = store.query_buckets(&BucketQuery::new(300).since(yesterday))?;
//! # assert!(recent.is_empty() && five_minute_averages.is_empty());
//! # Ok::<(), qualitair_store::Error>(())
//! ```

use time::OffsetDateTime;

use crate::bucket::IntervalBucket;
use crate::error::{Error, Result};
use crate::models::format_timestamp;

/// Fluent query builder for stored measurements.
///
/// By default, queries return results ordered by `timestamp` descending
/// (newest first).
#[derive(Debug, Default, Clone)]
pub struct MeasurementQuery {
    /// Include only rows at or after this time.
    pub since: Option<OffsetDateTime>,
    /// Include only rows at or before this time.
    pub until: Option<OffsetDateTime>,
    /// Maximum number of results.
    pub limit: Option<u32>,
    /// Offset for pagination.
    pub offset: Option<u32>,
    /// Order by timestamp descending (newest first).
    pub newest_first: bool,
}

impl MeasurementQuery {
    /// Create a new query: no filters, no limit, newest first.
    pub fn new() -> Self {
        Self {
            newest_first: true,
            ..Default::default()
        }
    }

    /// Filter to rows stored at or after this time.
    pub fn since(mut self, time: OffsetDateTime) -> Self {
        self.since = Some(time);
        self
    }

    /// Filter to rows stored at or before this time.
    pub fn until(mut self, time: OffsetDateTime) -> Self {
        self.until = Some(time);
        self
    }

    /// Limit the maximum number of results returned.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first N results.
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Order results chronologically.
    pub fn oldest_first(mut self) -> Self {
        self.newest_first = false;
        self
    }

    pub(crate) fn build_where(&self) -> (String, Vec<String>) {
        build_time_range(self.since, self.until)
    }

    pub(crate) fn build_sql(&self) -> String {
        let (where_clause, _) = self.build_where();
        let order = if self.newest_first { "DESC" } else { "ASC" };

        // id breaks ties between rows stored within the same second
        let mut sql = format!(
            "SELECT id, co2, voc, temperature, humidity, timestamp \
             FROM measurements {where_clause} ORDER BY timestamp {order}, id {order}"
        );

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        } else if self.offset.is_some() {
            // SQLite only accepts OFFSET after a LIMIT
            sql.push_str(" LIMIT -1");
        }

        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }

        sql
    }
}

/// Query aggregating measurements into fixed-width time buckets.
///
/// Buckets are returned oldest first. Empty intervals produce no bucket.
#[derive(Debug, Clone)]
pub struct BucketQuery {
    /// Bucket width in seconds.
    pub interval_secs: i64,
    /// Include only rows at or after this time.
    pub since: Option<OffsetDateTime>,
    /// Include only rows at or before this time.
    pub until: Option<OffsetDateTime>,
    /// Maximum number of buckets.
    pub limit: Option<u32>,
}

impl BucketQuery {
    /// Bucket by `interval_secs`; validated when the query runs.
    pub fn new(interval_secs: i64) -> Self {
        Self {
            interval_secs,
            since: None,
            until: None,
            limit: None,
        }
    }

    /// Filter to rows stored at or after this time.
    pub fn since(mut self, time: OffsetDateTime) -> Self {
        self.since = Some(time);
        self
    }

    /// Filter to rows stored at or before this time.
    pub fn until(mut self, time: OffsetDateTime) -> Self {
        self.until = Some(time);
        self
    }

    /// Limit the number of buckets returned.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub(crate) fn build_where(&self) -> (String, Vec<String>) {
        build_time_range(self.since, self.until)
    }

    /// Build the aggregation SQL, failing for a non-positive interval.
    pub(crate) fn build_sql(&self) -> Result<String> {
        if let (Some(since), Some(until)) = (self.since, self.until)
            && since > until
        {
            return Err(Error::InvalidArgument(format!(
                "invalid time range: since ({since}) is after until ({until})"
            )));
        }

        let bucket = IntervalBucket::new("timestamp", self.interval_secs)?.alias("bucket")?;
        let (where_clause, _) = self.build_where();

        let mut sql = format!(
            "SELECT {bucket}, COUNT(*), \
             AVG(CASE WHEN co2 >= 0 THEN co2 END), \
             AVG(CASE WHEN voc >= 0 THEN voc END), \
             AVG(temperature), AVG(humidity) \
             FROM measurements {where_clause} GROUP BY bucket ORDER BY bucket ASC"
        );

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        Ok(sql)
    }
}

fn build_time_range(
    since: Option<OffsetDateTime>,
    until: Option<OffsetDateTime>,
) -> (String, Vec<String>) {
    let mut conditions = Vec::new();
    let mut params = Vec::new();

    if let Some(since) = since {
        conditions.push("timestamp >= ?");
        params.push(format_timestamp(since));
    }

    if let Some(until) = until {
        conditions.push("timestamp <= ?");
        params.push(format_timestamp(until));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    (where_clause, params)
}
