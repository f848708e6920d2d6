//! Main store implementation.

use std::path::Path;

use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use time::OffsetDateTime;
use tracing::{debug, info};

use qualitair_types::Reading;

use crate::error::{Error, Result};
use crate::models::{MeasurementBucket, StoredMeasurement, format_timestamp, parse_timestamp};
use crate::queries::{BucketQuery, MeasurementQuery};
use crate::schema;

/// SQLite-based store for qualitair measurements.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        info!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        schema::initialize(&conn)?;

        Ok(Self { conn })
    }

    /// Open the default database location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_db_path())
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }
}

// Write operations
impl Store {
    /// Store a reading, stamped with the current time.
    ///
    /// Sentinel CO2/VOC values are stored as-is; `NaN` temperature and
    /// humidity become `NULL`.
    pub fn create(&self, reading: &Reading) -> Result<i64> {
        self.create_at(reading, OffsetDateTime::now_utc())
    }

    /// Store a reading with an explicit timestamp (second precision).
    pub fn create_at(&self, reading: &Reading, timestamp: OffsetDateTime) -> Result<i64> {
        let timestamp = format_timestamp(timestamp);

        self.conn.execute(
            "INSERT INTO measurements (co2, voc, temperature, humidity, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                reading.co2,
                reading.voc,
                reading.temperature(),
                reading.humidity(),
                timestamp,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("Stored measurement {} at {}", id, timestamp);
        Ok(id)
    }
}

// Read operations
impl Store {
    /// Query measurements with filters.
    pub fn query_measurements(&self, query: &MeasurementQuery) -> Result<Vec<StoredMeasurement>> {
        let sql = query.build_sql();
        let (_, params) = query.build_where();

        debug!("Executing query: {}", sql);

        let mut stmt = self.conn.prepare(&sql)?;
        let measurements = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), measurement_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(measurements)
    }

    /// Get the most recently stored measurement.
    pub fn latest_measurement(&self) -> Result<Option<StoredMeasurement>> {
        let measurement = self
            .conn
            .query_row(
                "SELECT id, co2, voc, temperature, humidity, timestamp
                 FROM measurements ORDER BY timestamp DESC, id DESC LIMIT 1",
                [],
                measurement_from_row,
            )
            .optional()?;

        Ok(measurement)
    }

    /// Count all stored measurements.
    pub fn count_measurements(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM measurements", [], |row| row.get(0))?;

        Ok(count as u64)
    }

    /// Aggregate measurements into fixed-width time buckets.
    ///
    /// Fails with [`Error::InvalidArgument`] for a non-positive interval or an
    /// inverted time range.
    pub fn query_buckets(&self, query: &BucketQuery) -> Result<Vec<MeasurementBucket>> {
        let sql = query.build_sql()?;
        let (_, params) = query.build_where();

        debug!("Executing bucket query: {}", sql);

        let mut stmt = self.conn.prepare(&sql)?;
        let buckets = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                Ok(MeasurementBucket {
                    bucket_start: timestamp_column(row, 0)?,
                    samples: row.get::<_, i64>(1)? as u64,
                    co2: row.get(2)?,
                    voc: row.get(3)?,
                    temperature: row.get(4)?,
                    humidity: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(buckets)
    }
}

fn measurement_from_row(row: &Row<'_>) -> rusqlite::Result<StoredMeasurement> {
    Ok(StoredMeasurement {
        id: row.get(0)?,
        co2: row.get(1)?,
        voc: row.get(2)?,
        temperature: row.get(3)?,
        humidity: row.get(4)?,
        timestamp: timestamp_column(row, 5)?,
    })
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<OffsetDateTime> {
    let text: String = row.get(idx)?;
    parse_timestamp(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn reading(co2: i32, voc: i32) -> Reading {
        Reading::new(co2, voc, f64::NAN, f64::NAN)
    }

    #[test]
    fn test_open_in_memory() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.count_measurements().unwrap(), 0);
        assert!(store.latest_measurement().unwrap().is_none());
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("qualitair.db");

        let store = Store::open(&path).unwrap();
        store.create(&reading(410, 2)).unwrap();

        assert!(path.exists());
        drop(store);

        let reopened = Store::open(&path).unwrap();
        assert_eq!(reopened.count_measurements().unwrap(), 1);
    }

    #[test]
    fn test_create_and_query() {
        let store = Store::open_in_memory().unwrap();
        let id = store
            .create(&Reading::new(402, 5, 21.25, 40.5))
            .unwrap();

        let measurements = store.query_measurements(&MeasurementQuery::new()).unwrap();
        assert_eq!(measurements.len(), 1);
        assert_eq!(measurements[0].id, id);
        assert_eq!(measurements[0].co2, 402);
        assert_eq!(measurements[0].voc, 5);
        assert_eq!(measurements[0].temperature, Some(21.25));
        assert_eq!(measurements[0].humidity, Some(40.5));
    }

    #[test]
    fn test_nan_is_stored_as_null() {
        let store = Store::open_in_memory().unwrap();
        store.create(&reading(402, 5)).unwrap();

        let latest = store.latest_measurement().unwrap().unwrap();
        assert_eq!(latest.temperature, None);
        assert_eq!(latest.humidity, None);
    }

    #[test]
    fn test_sentinels_are_stored_as_is() {
        let store = Store::open_in_memory().unwrap();
        store.create(&Reading::unavailable()).unwrap();

        let latest = store.latest_measurement().unwrap().unwrap();
        assert_eq!(latest.co2, -1);
        assert_eq!(latest.voc, -1);
    }

    #[test]
    fn test_create_at_keeps_timestamp() {
        let store = Store::open_in_memory().unwrap();
        let ts = datetime!(2024-05-01 12:34:56 UTC);
        store.create_at(&reading(500, 10), ts).unwrap();

        let latest = store.latest_measurement().unwrap().unwrap();
        assert_eq!(latest.timestamp, ts);
    }

    #[test]
    fn test_latest_measurement() {
        let store = Store::open_in_memory().unwrap();
        store
            .create_at(&reading(700, 1), datetime!(2024-05-01 12:00:00 UTC))
            .unwrap();
        store
            .create_at(&reading(900, 2), datetime!(2024-05-01 12:01:00 UTC))
            .unwrap();

        let latest = store.latest_measurement().unwrap().unwrap();
        assert_eq!(latest.co2, 900);
    }

    #[test]
    fn test_query_time_range_and_order() {
        let store = Store::open_in_memory().unwrap();
        for (minute, co2) in [(0, 400), (1, 410), (2, 420), (3, 430)] {
            let ts = datetime!(2024-05-01 12:00:00 UTC) + time::Duration::minutes(minute);
            store.create_at(&reading(co2, 0), ts).unwrap();
        }

        let query = MeasurementQuery::new()
            .since(datetime!(2024-05-01 12:01:00 UTC))
            .until(datetime!(2024-05-01 12:02:00 UTC))
            .oldest_first();
        let measurements = store.query_measurements(&query).unwrap();

        let co2: Vec<i32> = measurements.iter().map(|m| m.co2).collect();
        assert_eq!(co2, vec![410, 420]);
    }

    #[test]
    fn test_query_pagination() {
        let store = Store::open_in_memory().unwrap();
        for minute in 0..5 {
            let ts = datetime!(2024-05-01 12:00:00 UTC) + time::Duration::minutes(minute);
            store.create_at(&reading(400 + minute as i32, 0), ts).unwrap();
        }

        let page = store
            .query_measurements(&MeasurementQuery::new().limit(2).offset(1))
            .unwrap();
        let co2: Vec<i32> = page.iter().map(|m| m.co2).collect();
        assert_eq!(co2, vec![403, 402]);
    }

    #[test]
    fn test_query_buckets_averages() {
        let store = Store::open_in_memory().unwrap();
        let base = datetime!(2024-05-01 12:00:00 UTC);

        // First five-minute bucket
        store
            .create_at(&Reading::new(400, 10, 20.0, 40.0), base + time::Duration::seconds(10))
            .unwrap();
        store
            .create_at(&Reading::new(600, 30, 22.0, f64::NAN), base + time::Duration::seconds(250))
            .unwrap();
        // Second bucket
        store
            .create_at(&reading(800, 50), base + time::Duration::seconds(300))
            .unwrap();

        let buckets = store.query_buckets(&BucketQuery::new(300)).unwrap();
        assert_eq!(buckets.len(), 2);

        assert_eq!(buckets[0].bucket_start, base);
        assert_eq!(buckets[0].samples, 2);
        assert_eq!(buckets[0].co2, Some(500.0));
        assert_eq!(buckets[0].voc, Some(20.0));
        assert_eq!(buckets[0].temperature, Some(21.0));
        assert_eq!(buckets[0].humidity, Some(40.0));

        assert_eq!(buckets[1].bucket_start, base + time::Duration::seconds(300));
        assert_eq!(buckets[1].samples, 1);
        assert_eq!(buckets[1].co2, Some(800.0));
        assert_eq!(buckets[1].temperature, None);
    }

    #[test]
    fn test_query_buckets_skip_sentinels() {
        let store = Store::open_in_memory().unwrap();
        let base = datetime!(2024-05-01 12:00:00 UTC);
        store.create_at(&Reading::unavailable(), base).unwrap();
        store
            .create_at(&reading(420, 4), base + time::Duration::seconds(5))
            .unwrap();
        store
            .create_at(&Reading::unavailable(), base + time::Duration::seconds(70))
            .unwrap();

        let buckets = store.query_buckets(&BucketQuery::new(60)).unwrap();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].samples, 2);
        assert_eq!(buckets[0].co2, Some(420.0));
        assert_eq!(buckets[0].voc, Some(4.0));
        assert_eq!(buckets[1].samples, 1);
        assert_eq!(buckets[1].co2, None);
        assert_eq!(buckets[1].voc, None);
    }

    #[test]
    fn test_query_buckets_time_range_and_limit() {
        let store = Store::open_in_memory().unwrap();
        let base = datetime!(2024-05-01 00:00:00 UTC);
        for hour in 0..6 {
            store
                .create_at(&reading(400 + hour as i32, 0), base + time::Duration::hours(hour))
                .unwrap();
        }

        let query = BucketQuery::new(3600)
            .since(base + time::Duration::hours(2))
            .limit(2);
        let buckets = store.query_buckets(&query).unwrap();

        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].bucket_start, base + time::Duration::hours(2));
        assert_eq!(buckets[1].co2, Some(403.0));
    }

    #[test]
    fn test_query_buckets_invalid_interval() {
        let store = Store::open_in_memory().unwrap();
        let result = store.query_buckets(&BucketQuery::new(-60));
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }
}
