//! Mock sensors and persistence for testing and simulation.
//!
//! These stand in for the SGP30, the DHT22 and the database so the
//! acquisition loop can run without hardware.
//!
//! # Features
//!
//! - **Scripted readings**: queue exact values that are returned in order
//! - **Failure injection**: queue failures, fail initialization, or fail every call
//! - **Latency simulation**: add a blocking delay to each measurement
//! - **Custom behavior**: a generator closure produces readings once the script runs out
//!
//! Counters are shared through [`Arc`], so a test can keep a handle after the
//! sensor has been moved into a [`SampleReader`](crate::SampleReader).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use qualitair_types::{AirQuality, Reading};

use crate::error::{PersistenceError, SensorError};
use crate::gateway::PersistenceGateway;
use crate::sensor::{AirQualitySensor, ClimateSensor};

type AirQualityGenerator = Box<dyn FnMut(u32) -> AirQuality + Send>;

#[derive(Debug)]
enum Scripted<T> {
    Value(T),
    Failure(String),
}

impl<T> Scripted<T> {
    fn into_result(self) -> Result<T, SensorError> {
        match self {
            Scripted::Value(v) => Ok(v),
            Scripted::Failure(msg) => Err(SensorError::Unavailable(msg)),
        }
    }
}

/// A mock SGP30.
///
/// ```
/// use qualitair_core::mock::MockAirQuality;
/// use qualitair_core::AirQualitySensor;
///
/// let mut sensor = MockAirQuality::new()
///     .with_reading(400, 0)
///     .with_failure("bus timeout")
///     .with_reading(415, 12);
///
/// sensor.init_air_quality().unwrap();
/// assert_eq!(sensor.measure_air_quality().unwrap().co2_eq_ppm, 400);
/// assert!(sensor.measure_air_quality().is_err());
/// assert_eq!(sensor.measure_air_quality().unwrap().tvoc_ppb, 12);
/// ```
pub struct MockAirQuality {
    script: VecDeque<Scripted<AirQuality>>,
    generator: AirQualityGenerator,
    init_failure: Option<String>,
    latency: Duration,
    reads: Arc<AtomicU32>,
    inits: Arc<AtomicU32>,
}

impl std::fmt::Debug for MockAirQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockAirQuality")
            .field("scripted", &self.script.len())
            .field("init_failure", &self.init_failure)
            .field("latency", &self.latency)
            .field("reads", &self.reads.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for MockAirQuality {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAirQuality {
    /// A sensor that reports the warm-up baseline (400 ppm, 0 ppb) forever.
    pub fn new() -> Self {
        Self::with_generator(|_| AirQuality::new(400, 0))
    }

    /// A sensor whose readings come from `generator`, called with the
    /// zero-based measurement index.
    pub fn with_generator(generator: impl FnMut(u32) -> AirQuality + Send + 'static) -> Self {
        Self {
            script: VecDeque::new(),
            generator: Box::new(generator),
            init_failure: None,
            latency: Duration::ZERO,
            reads: Arc::new(AtomicU32::new(0)),
            inits: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Plausible indoor values: a few baseline ticks, then a slow drift.
    pub fn simulated() -> Self {
        Self::with_generator(|n| {
            if n < 3 {
                AirQuality::new(400, 0)
            } else {
                let co2 = 420 + (n.wrapping_mul(37) % 180) as u16;
                let tvoc = (n.wrapping_mul(13) % 90) as u16;
                AirQuality::new(co2, tvoc)
            }
        })
    }

    /// Queue a successful measurement.
    pub fn with_reading(mut self, co2_eq_ppm: u16, tvoc_ppb: u16) -> Self {
        self.script
            .push_back(Scripted::Value(AirQuality::new(co2_eq_ppm, tvoc_ppb)));
        self
    }

    /// Queue several successful measurements.
    pub fn with_readings(mut self, readings: impl IntoIterator<Item = (u16, u16)>) -> Self {
        for (co2, tvoc) in readings {
            self = self.with_reading(co2, tvoc);
        }
        self
    }

    /// Queue a failed measurement.
    pub fn with_failure(mut self, message: &str) -> Self {
        self.script.push_back(Scripted::Failure(message.to_string()));
        self
    }

    /// Make `init_air_quality` fail.
    pub fn with_init_failure(mut self, message: &str) -> Self {
        self.init_failure = Some(message.to_string());
        self
    }

    /// Block for `latency` on every measurement.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Shared count of measurement attempts.
    pub fn read_counter(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.reads)
    }

    /// Shared count of initialization attempts.
    pub fn init_counter(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.inits)
    }
}

impl AirQualitySensor for MockAirQuality {
    fn init_air_quality(&mut self) -> Result<(), SensorError> {
        self.inits.fetch_add(1, Ordering::Relaxed);
        match &self.init_failure {
            Some(msg) => Err(SensorError::Unavailable(msg.clone())),
            None => Ok(()),
        }
    }

    fn measure_air_quality(&mut self) -> Result<AirQuality, SensorError> {
        let index = self.reads.fetch_add(1, Ordering::Relaxed);
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        match self.script.pop_front() {
            Some(scripted) => scripted.into_result(),
            None => Ok((self.generator)(index)),
        }
    }
}

/// A mock DHT22.
#[derive(Debug)]
pub struct MockClimate {
    temperature: Scripted<f64>,
    humidity: Scripted<f64>,
    drift: bool,
    reads: u32,
}

impl Default for MockClimate {
    fn default() -> Self {
        Self::new(21.0, 45.0)
    }
}

impl MockClimate {
    pub fn new(temperature: f64, humidity: f64) -> Self {
        Self {
            temperature: Scripted::Value(temperature),
            humidity: Scripted::Value(humidity),
            drift: false,
            reads: 0,
        }
    }

    /// Values that wander slightly around a comfortable room climate.
    pub fn simulated() -> Self {
        Self {
            drift: true,
            ..Self::default()
        }
    }

    /// Make every temperature read fail.
    pub fn with_temperature_failure(mut self, message: &str) -> Self {
        self.temperature = Scripted::Failure(message.to_string());
        self
    }

    /// Make every humidity read fail.
    pub fn with_humidity_failure(mut self, message: &str) -> Self {
        self.humidity = Scripted::Failure(message.to_string());
        self
    }

    fn read(value: &Scripted<f64>) -> Result<f64, SensorError> {
        match value {
            Scripted::Value(v) => Ok(*v),
            Scripted::Failure(msg) => Err(SensorError::Unavailable(msg.clone())),
        }
    }

    fn offset(&self) -> f64 {
        if self.drift {
            f64::from(self.reads % 10) / 10.0
        } else {
            0.0
        }
    }
}

impl ClimateSensor for MockClimate {
    fn temperature(&mut self) -> Result<f64, SensorError> {
        self.reads = self.reads.wrapping_add(1);
        Ok(Self::read(&self.temperature)? + self.offset())
    }

    fn humidity(&mut self) -> Result<f64, SensorError> {
        Ok(Self::read(&self.humidity)? - self.offset())
    }
}

#[derive(Debug, Default)]
struct GatewayState {
    saved: Vec<Reading>,
    attempts: u32,
    remaining_failures: u32,
    always_fail: bool,
}

/// In-memory [`PersistenceGateway`]. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MockGateway {
    state: Arc<Mutex<GatewayState>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` writes, then succeed.
    pub fn with_transient_failures(self, count: u32) -> Self {
        self.lock().remaining_failures = count;
        self
    }

    /// Fail every write.
    pub fn failing() -> Self {
        let gateway = Self::default();
        gateway.lock().always_fail = true;
        gateway
    }

    /// Readings stored so far.
    pub fn saved(&self) -> Vec<Reading> {
        self.lock().saved.clone()
    }

    /// Number of `create` calls, successful or not.
    pub fn attempts(&self) -> u32 {
        self.lock().attempts
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GatewayState> {
        // A poisoned lock only means another test thread panicked mid-write.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl PersistenceGateway for MockGateway {
    async fn create(&self, reading: &Reading) -> Result<(), PersistenceError> {
        let mut state = self.lock();
        state.attempts += 1;
        if state.always_fail {
            return Err(PersistenceError::new("mock database unavailable"));
        }
        if state.remaining_failures > 0 {
            state.remaining_failures -= 1;
            return Err(PersistenceError::new("mock transient failure"));
        }
        state.saved.push(*reading);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_then_generator() {
        let mut sensor = MockAirQuality::new().with_reading(500, 10);
        assert_eq!(sensor.measure_air_quality().unwrap(), AirQuality::new(500, 10));
        assert_eq!(sensor.measure_air_quality().unwrap(), AirQuality::new(400, 0));
        assert_eq!(sensor.read_counter().load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_init_failure() {
        let mut sensor = MockAirQuality::new().with_init_failure("no device");
        let counter = sensor.init_counter();
        assert!(sensor.init_air_quality().is_err());
        assert_eq!(counter.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_simulated_leaves_baseline() {
        let mut sensor = MockAirQuality::simulated();
        let readings: Vec<_> = (0..5)
            .map(|_| sensor.measure_air_quality().unwrap())
            .collect();
        assert_eq!(readings[0], AirQuality::new(400, 0));
        assert_ne!(readings[4], AirQuality::new(400, 0));
    }

    #[test]
    fn test_climate_failures() {
        let mut climate = MockClimate::new(20.0, 50.0).with_humidity_failure("checksum");
        assert_eq!(climate.temperature().unwrap(), 20.0);
        assert!(climate.humidity().is_err());
    }

    #[tokio::test]
    async fn test_gateway_transient_failures() {
        let gateway = MockGateway::new().with_transient_failures(1);
        let reading = Reading::new(410, 3, 21.0, 40.0);

        assert!(gateway.create(&reading).await.is_err());
        assert!(gateway.create(&reading).await.is_ok());
        assert_eq!(gateway.attempts(), 2);
        assert_eq!(gateway.saved(), vec![reading]);
    }
}
