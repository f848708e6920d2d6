//! One-shot sampling of the sensor pair.

use qualitair_types::{Reading, CO2_UNAVAILABLE, VOC_UNAVAILABLE};
use tracing::{info, warn};

use crate::error::SensorError;
use crate::sensor::{AirQualitySensor, ClimateSensor};

/// Reads every configured sensor and folds the results into one [`Reading`].
///
/// Sub-sensor failures never escape: each failed field keeps its sentinel
/// and the failure is logged at `warn`.
pub struct SampleReader {
    air_quality: Box<dyn AirQualitySensor>,
    climate: Option<Box<dyn ClimateSensor>>,
}

impl std::fmt::Debug for SampleReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleReader")
            .field("climate", &self.climate.is_some())
            .finish_non_exhaustive()
    }
}

impl SampleReader {
    pub fn new(air_quality: impl AirQualitySensor + 'static) -> Self {
        Self {
            air_quality: Box::new(air_quality),
            climate: None,
        }
    }

    /// Attach a temperature/humidity sensor.
    pub fn with_climate(mut self, climate: impl ClimateSensor + 'static) -> Self {
        self.climate = Some(Box::new(climate));
        self
    }

    pub fn has_climate(&self) -> bool {
        self.climate.is_some()
    }

    /// Send the air-quality init command. Blocking.
    pub fn init(&mut self) -> Result<(), SensorError> {
        self.air_quality.init_air_quality()
    }

    /// Take one sample. Blocking; never fails.
    pub fn read_sample(&mut self) -> Reading {
        let mut reading = Reading::unavailable();

        match self.air_quality.measure_air_quality() {
            Ok(quality) => reading = reading.with_air_quality(quality),
            Err(e) => {
                warn!("Failed to read sgp30: {e}");
                reading.co2 = CO2_UNAVAILABLE;
                reading.voc = VOC_UNAVAILABLE;
            }
        }

        if let Some(climate) = self.climate.as_mut() {
            match climate.temperature() {
                Ok(t) => reading.temperature = t,
                Err(e) => warn!("Failed to read dht22 temperature: {e}"),
            }
            match climate.humidity() {
                Ok(h) => reading.humidity = h,
                Err(e) => warn!("Failed to read dht22 humidity: {e}"),
            }
        }

        info!(
            co2 = reading.co2,
            voc = reading.voc,
            temperature = reading.temperature,
            humidity = reading.humidity,
            "Sample: {reading}"
        );
        reading
    }
}
