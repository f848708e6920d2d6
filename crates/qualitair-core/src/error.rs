//! Error types for qualitair-core.
//!
//! Each error maps to a fixed propagation policy:
//!
//! | Error | Raised by | Handling |
//! |-------|-----------|----------|
//! | [`SensorError`] | sensor drivers | converted to sentinel values by [`SampleReader`](crate::SampleReader), never propagated |
//! | [`PersistenceError`] | [`PersistenceGateway`](crate::PersistenceGateway) | logged by the acquisition loop, the sample is dropped |
//! | [`Error::FatalInit`] | acquisition start-up | returned from [`AcquisitionLoop::run`](crate::AcquisitionLoop::run) |

use thiserror::Error;

/// Failure of a single sensor operation.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SensorError {
    /// I2C bus error.
    #[error("I2C error: {0:?}")]
    I2c(embedded_hal::i2c::ErrorKind),

    /// A data word failed its checksum.
    #[error("CRC mismatch in {context}: expected 0x{expected:02x}, got 0x{actual:02x}")]
    Crc {
        context: &'static str,
        expected: u8,
        actual: u8,
    },

    /// I/O error (device files, sysfs).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The sensor returned something that could not be interpreted.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The sensor is missing or not responding.
    #[error("Sensor unavailable: {0}")]
    Unavailable(String),
}

/// Failure to store a reading.
#[derive(Debug, Error)]
#[error("Failed to persist reading: {source}")]
pub struct PersistenceError {
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl PersistenceError {
    /// Wrap a storage backend error.
    pub fn new(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// Errors that end an acquisition run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The sensor could not be initialized; no valid sampling is possible.
    #[error("Sensor initialization failed: {0}")]
    FatalInit(#[source] SensorError),

    /// A blocking sensor task panicked or was cancelled.
    #[error("Sensor worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Result type alias using qualitair-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc_error_display() {
        let err = SensorError::Crc {
            context: "co2",
            expected: 0x92,
            actual: 0x00,
        };
        assert_eq!(err.to_string(), "CRC mismatch in co2: expected 0x92, got 0x00");
    }

    #[test]
    fn test_persistence_error_keeps_source() {
        let err = PersistenceError::new("database is locked");
        assert!(err.to_string().contains("database is locked"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_fatal_init_display() {
        let err = Error::FatalInit(SensorError::Unavailable("no ACK".to_string()));
        let display = err.to_string();
        assert!(display.contains("initialization failed"));
        assert!(display.contains("no ACK"));
    }
}
