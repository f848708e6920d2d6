//! Sensor acquisition for qualitair.
//!
//! This crate drives an SGP30 eCO2/TVOC sensor and an optional DHT22
//! temperature/humidity sensor, suppresses readings while the SGP30 warms
//! up, and hands the rest to a [`PersistenceGateway`].
//!
//! # Example
//!
//! ```no_run
//! use qualitair_core::mock::{MockAirQuality, MockGateway};
//! use qualitair_core::{AcquisitionConfig, AcquisitionLoop, SampleReader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let reader = SampleReader::new(MockAirQuality::simulated());
//!     let acquisition = AcquisitionLoop::new(reader, MockGateway::new(), AcquisitionConfig::default());
//!
//!     let stop = acquisition.stop_handle();
//!     tokio::spawn(async move {
//!         let _ = tokio::signal::ctrl_c().await;
//!         stop.quit();
//!     });
//!
//!     let summary = acquisition.run().await?;
//!     println!("persisted {} samples", summary.persisted);
//!     Ok(())
//! }
//! ```

pub mod acquisition;
pub mod dht22;
pub mod error;
pub mod gateway;
pub mod mock;
pub mod reader;
pub mod sensor;
pub mod sgp30;
pub mod warmup;

pub use acquisition::{AcquisitionConfig, AcquisitionLoop, AcquisitionSummary, StopHandle};
pub use dht22::Dht22;
pub use error::{Error, PersistenceError, Result, SensorError};
pub use gateway::PersistenceGateway;
pub use reader::SampleReader;
pub use sensor::{AirQualitySensor, ClimateSensor};
pub use sgp30::Sgp30;
pub use warmup::{WarmupConfig, WarmupDetector, WarmupState};

// Re-export types for convenience
pub use qualitair_types::{AirQuality, Reading};
