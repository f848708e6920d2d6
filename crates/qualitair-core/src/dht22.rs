//! DHT22 temperature/humidity sensor via the Linux IIO `dht11` driver.
//!
//! The kernel driver (enabled with the `dht11` device-tree overlay) handles
//! the single-wire timing and exposes scaled values in sysfs:
//!
//! - `in_temp_input`: temperature in milli-degrees Celsius
//! - `in_humidityrelative_input`: relative humidity in milli-percent
//!
//! The device directory is found by its `name` attribute, `dht11@<pin>`
//! with the GPIO pin in hexadecimal.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::SensorError;
use crate::sensor::ClimateSensor;

/// Where the kernel publishes IIO devices.
pub const DEFAULT_IIO_ROOT: &str = "/sys/bus/iio/devices";

const TEMPERATURE_FILE: &str = "in_temp_input";
const HUMIDITY_FILE: &str = "in_humidityrelative_input";

/// DHT22 bound to one IIO device directory.
#[derive(Debug, Clone)]
pub struct Dht22 {
    device_dir: PathBuf,
}

impl Dht22 {
    /// Locate the sensor on `pin` under the default IIO root.
    pub fn open(pin: u8) -> Result<Self, SensorError> {
        Self::open_in(DEFAULT_IIO_ROOT, pin)
    }

    /// Locate the sensor on `pin` under `iio_root`.
    pub fn open_in(iio_root: impl AsRef<Path>, pin: u8) -> Result<Self, SensorError> {
        let iio_root = iio_root.as_ref();
        let wanted = format!("dht11@{pin:x}");

        for entry in fs::read_dir(iio_root)? {
            let dir = entry?.path();
            let Ok(name) = fs::read_to_string(dir.join("name")) else {
                continue;
            };
            if name.trim() == wanted {
                debug!(device = %dir.display(), "DHT22: found IIO device");
                return Ok(Self::from_device_dir(dir));
            }
        }

        Err(SensorError::Unavailable(format!(
            "no IIO device named {wanted} under {}",
            iio_root.display()
        )))
    }

    pub fn from_device_dir(device_dir: impl Into<PathBuf>) -> Self {
        Self {
            device_dir: device_dir.into(),
        }
    }

    pub fn device_dir(&self) -> &Path {
        &self.device_dir
    }

    fn read_milli(&self, file: &str) -> Result<f64, SensorError> {
        let raw = fs::read_to_string(self.device_dir.join(file))?;
        let milli: i64 = raw
            .trim()
            .parse()
            .map_err(|_| SensorError::InvalidData(format!("{file}: {:?}", raw.trim())))?;
        Ok(milli as f64 / 1000.0)
    }
}

impl ClimateSensor for Dht22 {
    fn temperature(&mut self) -> Result<f64, SensorError> {
        self.read_milli(TEMPERATURE_FILE)
    }

    fn humidity(&mut self) -> Result<f64, SensorError> {
        self.read_milli(HUMIDITY_FILE)
    }
}
