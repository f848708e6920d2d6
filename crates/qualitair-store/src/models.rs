//! Data models for stored data.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use qualitair_types::Reading;

/// Layout of the `timestamp` column and of its JSON projection.
pub(crate) const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// A measurement stored in the database.
///
/// Serializes to the public JSON shape
/// `{id, co2, voc, temperature, humidity, timestamp}` with the timestamp as
/// `YYYY-MM-DD HH:MM:SS` (UTC).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMeasurement {
    /// Database row ID.
    pub id: i64,
    /// Equivalent CO2 in ppm (`-1` when the sensor failed).
    pub co2: i32,
    /// Total VOC in ppb (`-1` when the sensor failed).
    pub voc: i32,
    /// Temperature in Celsius, if it was measured.
    pub temperature: Option<f64>,
    /// Relative humidity in percent, if it was measured.
    pub humidity: Option<f64>,
    /// When the measurement was stored.
    #[serde(with = "timestamp_format")]
    pub timestamp: OffsetDateTime,
}

impl StoredMeasurement {
    /// Convert back to a [`Reading`], restoring the `NaN` sentinels.
    pub fn to_reading(&self) -> Reading {
        Reading::new(
            self.co2,
            self.voc,
            self.temperature.unwrap_or(f64::NAN),
            self.humidity.unwrap_or(f64::NAN),
        )
    }
}

/// Aggregate of all measurements falling into one time bucket.
///
/// Averages skip sentinel values, so a bucket in which every CO2 read failed
/// reports `co2: None` rather than `-1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementBucket {
    /// Start of the bucket.
    #[serde(with = "timestamp_format")]
    pub bucket_start: OffsetDateTime,
    /// Number of stored rows in the bucket, including failed reads.
    pub samples: u64,
    /// Average CO2 in ppm.
    pub co2: Option<f64>,
    /// Average VOC in ppb.
    pub voc: Option<f64>,
    /// Average temperature in Celsius.
    pub temperature: Option<f64>,
    /// Average relative humidity in percent.
    pub humidity: Option<f64>,
}

pub(crate) fn format_timestamp(timestamp: OffsetDateTime) -> String {
    let utc = timestamp.to_offset(time::UtcOffset::UTC);
    // The format only has numeric components, which cannot fail to render
    // for years 0..=9999.
    utc.format(TIMESTAMP_FORMAT)
        .unwrap_or_else(|_| utc.unix_timestamp().to_string())
}

pub(crate) fn parse_timestamp(s: &str) -> Result<OffsetDateTime, time::error::Parse> {
    time::PrimitiveDateTime::parse(s, TIMESTAMP_FORMAT).map(|dt| dt.assume_utc())
}

mod timestamp_format {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::OffsetDateTime;

    pub fn serialize<S: Serializer>(
        timestamp: &OffsetDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(*timestamp))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<OffsetDateTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_timestamp(&s).map_err(serde::de::Error::custom)
    }
}
