//! Time-bucketing SQL expressions.
//!
//! An [`IntervalBucket`] maps every timestamp of a column to the start of the
//! whole interval containing it:
//!
//! ```text
//! bucket = floor(epoch(timestamp) / interval) * interval
//! ```
//!
//! The generated fragment converts the bucket back into the column's own
//! representation, so it can be used directly in `SELECT` and `GROUP BY`.
//! Buckets are aligned to the Unix epoch, which means intervals that do not
//! divide a day evenly produce buckets that do not start at midnight.
//!
//! # Example
//!
//! ```
//! use qualitair_store::IntervalBucket;
//!
//! let bucket = IntervalBucket::new("timestamp", 300)?.alias("bucket")?;
//! let sql = format!(
//!     "SELECT {bucket}, AVG(co2) FROM measurements GROUP BY bucket",
//!     bucket = bucket.to_sql()
//! );
//! assert!(sql.contains("AS bucket"));
//! assert_eq!(bucket.bucket_start(1_700_000_123), 1_700_000_100);
//! # Ok::<(), qualitair_store::Error>(())
//! ```

use std::fmt;

use crate::error::{Error, Result};

/// How the bucketed column stores its timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimestampRepr {
    /// SQLite `datetime()` text (`YYYY-MM-DD HH:MM:SS`, UTC).
    #[default]
    Text,
    /// Integer seconds since the Unix epoch.
    UnixSeconds,
}

/// A floor-aligned time bucket over one timestamp column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalBucket {
    field: String,
    interval_secs: i64,
    repr: TimestampRepr,
    alias: Option<String>,
}

/// Build the bucketing fragment for a text timestamp column.
///
/// Shorthand for `IntervalBucket::new(field, interval_secs)?.to_sql()`.
pub fn bucket_expression(field: &str, interval_secs: i64) -> Result<String> {
    Ok(IntervalBucket::new(field, interval_secs)?.to_sql())
}

impl IntervalBucket {
    /// Create a bucket of `interval_secs` seconds over `field`.
    ///
    /// Fails with [`Error::InvalidArgument`] when the interval is not positive
    /// or when `field` is not a plain (optionally table-qualified) identifier.
    pub fn new(field: &str, interval_secs: i64) -> Result<Self> {
        if interval_secs <= 0 {
            return Err(Error::InvalidArgument(format!(
                "bucket interval must be positive, got {interval_secs}"
            )));
        }
        if !is_column_reference(field) {
            return Err(Error::InvalidArgument(format!(
                "invalid bucket field '{field}'"
            )));
        }

        Ok(Self {
            field: field.to_string(),
            interval_secs,
            repr: TimestampRepr::default(),
            alias: None,
        })
    }

    /// Name the resulting column (`... AS alias`).
    pub fn alias(mut self, alias: &str) -> Result<Self> {
        if !is_identifier(alias) {
            return Err(Error::InvalidArgument(format!(
                "invalid bucket alias '{alias}'"
            )));
        }
        self.alias = Some(alias.to_string());
        Ok(self)
    }

    /// Set how the column stores timestamps.
    #[must_use]
    pub fn representation(mut self, repr: TimestampRepr) -> Self {
        self.repr = repr;
        self
    }

    /// The bucketed column.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The bucket width in seconds.
    pub fn interval_secs(&self) -> i64 {
        self.interval_secs
    }

    /// Start of the bucket containing `unix_secs`, in epoch seconds.
    ///
    /// This is the arithmetic the SQL fragment performs, floored towards
    /// negative infinity so pre-epoch timestamps bucket correctly.
    pub fn bucket_start(&self, unix_secs: i64) -> i64 {
        unix_secs - unix_secs.rem_euclid(self.interval_secs)
    }

    /// Render the SQL fragment.
    pub fn to_sql(&self) -> String {
        let epoch = match self.repr {
            TimestampRepr::Text => format!("CAST(strftime('%s', {}) AS INTEGER)", self.field),
            TimestampRepr::UnixSeconds => self.field.clone(),
        };
        let i = self.interval_secs;
        // SQLite's % truncates towards zero; only a negative remainder is
        // shifted by i, which keeps every intermediate within i64.
        let floored = format!(
            "({epoch} - CASE WHEN ({epoch}) % {i} < 0 \
             THEN ({epoch}) % {i} + {i} ELSE ({epoch}) % {i} END)"
        );

        let expr = match self.repr {
            TimestampRepr::Text => format!("datetime({floored}, 'unixepoch')"),
            TimestampRepr::UnixSeconds => floored,
        };

        match &self.alias {
            Some(alias) => format!("{expr} AS {alias}"),
            None => expr,
        }
    }
}

impl fmt::Display for IntervalBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_column_reference(s: &str) -> bool {
    match s.split_once('.') {
        Some((table, column)) => is_identifier(table) && is_identifier(column),
        None => is_identifier(s),
    }
}
