//! Sensirion SGP30 eCO2/TVOC driver.
//!
//! Generic over any [`embedded_hal::i2c::I2c`] bus. On Linux,
//! [`Sgp30::open`] binds the driver to an `/dev/i2c-N` character device.
//!
//! The SGP30 protocol sends 16-bit big-endian commands and answers with
//! 16-bit words, each followed by a CRC-8 checksum (polynomial 0x31,
//! initial value 0xFF).

use std::thread;
use std::time::Duration;

use embedded_hal::i2c::{Error as _, I2c};
use qualitair_types::AirQuality;
use tracing::debug;

use crate::error::SensorError;
use crate::sensor::AirQualitySensor;

/// Fixed I2C address of the SGP30.
pub const DEFAULT_ADDRESS: u8 = 0x58;

const CMD_INIT_AIR_QUALITY: [u8; 2] = [0x20, 0x03];
const CMD_MEASURE_AIR_QUALITY: [u8; 2] = [0x20, 0x08];

const INIT_DURATION: Duration = Duration::from_millis(10);
const MEASURE_DURATION: Duration = Duration::from_millis(12);

const CRC8_POLYNOMIAL: u8 = 0x31;
const CRC8_INIT: u8 = 0xFF;

/// Sensirion CRC-8 over a data word.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = CRC8_INIT;
    for byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ CRC8_POLYNOMIAL
            } else {
                crc << 1
            };
        }
    }
    crc
}

fn decode_word(chunk: &[u8], context: &'static str) -> Result<u16, SensorError> {
    let [msb, lsb, checksum] = chunk else {
        return Err(SensorError::InvalidData(format!(
            "{context}: expected 3 bytes, got {}",
            chunk.len()
        )));
    };
    let expected = crc8(&[*msb, *lsb]);
    if expected != *checksum {
        return Err(SensorError::Crc {
            context,
            expected,
            actual: *checksum,
        });
    }
    Ok(u16::from_be_bytes([*msb, *lsb]))
}

/// SGP30 driver.
pub struct Sgp30<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> Sgp30<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Give back the underlying bus.
    pub fn release(self) -> I2C {
        self.i2c
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    fn command(&mut self, command: [u8; 2], duration: Duration) -> Result<(), SensorError> {
        self.i2c
            .write(self.address, &command)
            .map_err(|e| SensorError::I2c(e.kind()))?;
        thread::sleep(duration);
        Ok(())
    }
}

impl<I2C: I2c + Send> AirQualitySensor for Sgp30<I2C> {
    fn init_air_quality(&mut self) -> Result<(), SensorError> {
        debug!(address = self.address, "SGP30: init_air_quality");
        self.command(CMD_INIT_AIR_QUALITY, INIT_DURATION)
    }

    fn measure_air_quality(&mut self) -> Result<AirQuality, SensorError> {
        self.command(CMD_MEASURE_AIR_QUALITY, MEASURE_DURATION)?;

        let mut buf = [0u8; 6];
        self.i2c
            .read(self.address, &mut buf)
            .map_err(|e| SensorError::I2c(e.kind()))?;

        let co2_eq_ppm = decode_word(&buf[0..3], "eCO2")?;
        let tvoc_ppb = decode_word(&buf[3..6], "TVOC")?;
        debug!(co2_eq_ppm, tvoc_ppb, "SGP30: measurement");

        Ok(AirQuality {
            co2_eq_ppm,
            tvoc_ppb,
        })
    }
}

#[cfg(target_os = "linux")]
impl Sgp30<linux_embedded_hal::I2cdev> {
    /// Open the SGP30 on a Linux I2C character device, e.g. `/dev/i2c-1`.
    pub fn open(bus: impl AsRef<std::path::Path>, address: u8) -> Result<Self, SensorError> {
        let bus = bus.as_ref();
        let i2c = linux_embedded_hal::I2cdev::new(bus)
            .map_err(|e| SensorError::Unavailable(format!("{}: {e}", bus.display())))?;
        Ok(Self::new(i2c, address))
    }
}
