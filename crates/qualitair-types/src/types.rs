//! Reading types.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// CO2 value recorded when the air-quality sensor could not be read.
pub const CO2_UNAVAILABLE: i32 = -1;

/// VOC value recorded when the air-quality sensor could not be read.
pub const VOC_UNAVAILABLE: i32 = -1;

/// Raw result of one air-quality measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AirQuality {
    /// Equivalent CO2 in ppm.
    pub co2_eq_ppm: u16,
    /// Total volatile organic compounds in ppb.
    pub tvoc_ppb: u16,
}

impl AirQuality {
    #[must_use]
    pub const fn new(co2_eq_ppm: u16, tvoc_ppb: u16) -> Self {
        Self {
            co2_eq_ppm,
            tvoc_ppb,
        }
    }
}

/// One sample of the sensor pair.
///
/// `co2`/`voc` use `-1` and `temperature`/`humidity` use `NaN` for
/// "unavailable". The persistence timestamp is assigned by the store, not here.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Reading {
    /// Equivalent CO2 in ppm, or [`CO2_UNAVAILABLE`].
    pub co2: i32,
    /// Total VOC in ppb, or [`VOC_UNAVAILABLE`].
    pub voc: i32,
    /// Temperature in Celsius, or `NaN`.
    pub temperature: f64,
    /// Relative humidity in percent, or `NaN`.
    pub humidity: f64,
}

impl Reading {
    /// A reading with every field set to its sentinel.
    #[must_use]
    pub const fn unavailable() -> Self {
        Self {
            co2: CO2_UNAVAILABLE,
            voc: VOC_UNAVAILABLE,
            temperature: f64::NAN,
            humidity: f64::NAN,
        }
    }

    /// Build a reading from concrete values.
    #[must_use]
    pub const fn new(co2: i32, voc: i32, temperature: f64, humidity: f64) -> Self {
        Self {
            co2,
            voc,
            temperature,
            humidity,
        }
    }

    /// Replace the CO2/VOC pair with a successful measurement.
    #[must_use]
    pub fn with_air_quality(mut self, air_quality: AirQuality) -> Self {
        self.co2 = i32::from(air_quality.co2_eq_ppm);
        self.voc = i32::from(air_quality.tvoc_ppb);
        self
    }

    /// Whether the CO2/VOC pair holds a real measurement.
    #[must_use]
    pub fn has_air_quality(&self) -> bool {
        self.co2 != CO2_UNAVAILABLE && self.voc != VOC_UNAVAILABLE
    }

    /// Whether both temperature and humidity hold real measurements.
    #[must_use]
    pub fn has_climate(&self) -> bool {
        !self.temperature.is_nan() && !self.humidity.is_nan()
    }

    /// Temperature, or `None` for the `NaN` sentinel.
    #[must_use]
    pub fn temperature(&self) -> Option<f64> {
        (!self.temperature.is_nan()).then_some(self.temperature)
    }

    /// Humidity, or `None` for the `NaN` sentinel.
    #[must_use]
    pub fn humidity(&self) -> Option<f64> {
        (!self.humidity.is_nan()).then_some(self.humidity)
    }
}

impl Default for Reading {
    fn default() -> Self {
        Self::unavailable()
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "co2: {} ppm, voc: {} ppb, temperature: {}, humidity: {}",
            self.co2, self.voc, self.temperature, self.humidity
        )
    }
}
