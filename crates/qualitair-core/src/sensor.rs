//! Sensor abstractions.
//!
//! Drivers are synchronous: every call may block on bus I/O. The acquisition
//! loop runs them on tokio's blocking pool, so implementations only need to
//! be [`Send`].

use qualitair_types::AirQuality;

use crate::error::SensorError;

/// A combined eCO2/TVOC sensor such as the SGP30.
pub trait AirQualitySensor: Send {
    /// Start the sensor's air-quality algorithm. Called once, before any
    /// measurement.
    fn init_air_quality(&mut self) -> Result<(), SensorError>;

    /// Take one eCO2/TVOC measurement.
    fn measure_air_quality(&mut self) -> Result<AirQuality, SensorError>;
}

/// A temperature/humidity sensor such as the DHT22.
pub trait ClimateSensor: Send {
    /// Temperature in Celsius.
    fn temperature(&mut self) -> Result<f64, SensorError>;

    /// Relative humidity in percent.
    fn humidity(&mut self) -> Result<f64, SensorError>;
}

impl<T: AirQualitySensor + ?Sized> AirQualitySensor for Box<T> {
    fn init_air_quality(&mut self) -> Result<(), SensorError> {
        (**self).init_air_quality()
    }

    fn measure_air_quality(&mut self) -> Result<AirQuality, SensorError> {
        (**self).measure_air_quality()
    }
}

impl<T: ClimateSensor + ?Sized> ClimateSensor for Box<T> {
    fn temperature(&mut self) -> Result<f64, SensorError> {
        (**self).temperature()
    }

    fn humidity(&mut self) -> Result<f64, SensorError> {
        (**self).humidity()
    }
}
