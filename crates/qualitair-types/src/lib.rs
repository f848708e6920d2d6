//! Shared types for the qualitair air-quality logger.
//!
//! A [`Reading`] is produced once per acquisition tick. It is always fully
//! populated: a failed measurement is encoded as a sentinel value rather than
//! an absent field, so consumers only ever compare against
//! [`CO2_UNAVAILABLE`], [`VOC_UNAVAILABLE`] or `NaN`.
//!
//! # Example
//!
//! ```
//! use qualitair_types::{AirQuality, Reading};
//!
//! let reading = Reading::unavailable().with_air_quality(AirQuality {
//!     co2_eq_ppm: 412,
//!     tvoc_ppb: 3,
//! });
//!
//! assert!(reading.has_air_quality());
//! assert_eq!(reading.temperature(), None);
//! ```

pub mod types;

pub use types::{AirQuality, CO2_UNAVAILABLE, Reading, VOC_UNAVAILABLE};
