//! SGP30 warm-up detection.
//!
//! After power-up the SGP30 reports exactly 400 ppm eCO2 and 0 ppb TVOC
//! until its baseline algorithm settles. Readings are not stored until the
//! sensor leaves that state, or until enough samples have passed that a
//! genuinely clean room is the likelier explanation.

use qualitair_types::Reading;
use tracing::info;

/// Warm-up thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarmupConfig {
    /// eCO2 value reported while warming up.
    pub baseline_co2: i32,
    /// TVOC value reported while warming up.
    pub baseline_voc: i32,
    /// Ticks after which the sensor counts as ready regardless of values.
    pub max_samples: u32,
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self {
            baseline_co2: 400,
            baseline_voc: 0,
            max_samples: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WarmupState {
    #[default]
    Warming,
    Ready,
}

/// Two-state warm-up machine. `Ready` is absorbing.
#[derive(Debug, Clone)]
pub struct WarmupDetector {
    config: WarmupConfig,
    state: WarmupState,
    samples: u32,
}

impl Default for WarmupDetector {
    fn default() -> Self {
        Self::new(WarmupConfig::default())
    }
}

impl WarmupDetector {
    pub fn new(config: WarmupConfig) -> Self {
        Self {
            config,
            state: WarmupState::Warming,
            samples: 0,
        }
    }

    pub fn state(&self) -> WarmupState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == WarmupState::Ready
    }

    /// Ticks observed while warming up.
    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// Feed one reading and return the resulting state.
    ///
    /// While warming, the counter is incremented first; the sensor becomes
    /// ready when either value leaves the baseline or the counter exceeds
    /// `max_samples`.
    pub fn observe(&mut self, reading: &Reading) -> WarmupState {
        if self.state == WarmupState::Warming {
            self.samples += 1;
            if reading.co2 != self.config.baseline_co2
                || reading.voc != self.config.baseline_voc
                || self.samples > self.config.max_samples
            {
                self.state = WarmupState::Ready;
                info!(samples = self.samples, "Air-quality sensor warmed up");
            }
        }
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(co2: i32, voc: i32) -> Reading {
        Reading::new(co2, voc, f64::NAN, f64::NAN)
    }

    #[test]
    fn test_baseline_keeps_warming() {
        let mut detector = WarmupDetector::default();
        assert_eq!(detector.observe(&reading(400, 0)), WarmupState::Warming);
        assert_eq!(detector.observe(&reading(400, 0)), WarmupState::Warming);
        assert_eq!(detector.samples(), 2);
    }

    #[test]
    fn test_co2_change_is_ready() {
        let mut detector = WarmupDetector::default();
        assert_eq!(detector.observe(&reading(401, 0)), WarmupState::Ready);
        assert_eq!(detector.samples(), 1);
    }

    #[test]
    fn test_voc_change_is_ready() {
        let mut detector = WarmupDetector::default();
        assert_eq!(detector.observe(&reading(400, 1)), WarmupState::Ready);
    }

    #[test]
    fn test_failed_read_is_not_baseline() {
        let mut detector = WarmupDetector::default();
        assert_eq!(detector.observe(&Reading::unavailable()), WarmupState::Ready);
    }

    #[test]
    fn test_twenty_first_tick_forces_ready() {
        let mut detector = WarmupDetector::default();
        for _ in 0..20 {
            assert_eq!(detector.observe(&reading(400, 0)), WarmupState::Warming);
        }
        assert_eq!(detector.observe(&reading(400, 0)), WarmupState::Ready);
        assert_eq!(detector.samples(), 21);
    }

    #[test]
    fn test_ready_is_absorbing() {
        let mut detector = WarmupDetector::default();
        detector.observe(&reading(450, 3));
        for _ in 0..5 {
            assert_eq!(detector.observe(&reading(400, 0)), WarmupState::Ready);
        }
        assert_eq!(detector.samples(), 1);
    }

    #[test]
    fn test_custom_config() {
        let mut detector = WarmupDetector::new(WarmupConfig {
            baseline_co2: 0,
            baseline_voc: 0,
            max_samples: 1,
        });
        assert_eq!(detector.observe(&reading(0, 0)), WarmupState::Warming);
        assert_eq!(detector.observe(&reading(0, 0)), WarmupState::Ready);
    }
}
