//! The acquisition loop.
//!
//! Initializes the air-quality sensor once, then repeatedly samples,
//! checks warm-up, persists and sleeps until stopped. Sensor I/O runs on
//! tokio's blocking pool; the sleep between ticks is interruptible.

use std::time::Duration;

use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::gateway::PersistenceGateway;
use crate::reader::SampleReader;
use crate::warmup::{WarmupConfig, WarmupDetector, WarmupState};

/// Loop timing and limits.
#[derive(Debug, Clone)]
pub struct AcquisitionConfig {
    /// Sleep between ticks.
    pub delay: Duration,
    pub warmup: WarmupConfig,
    /// Stop on its own after this many ticks.
    pub max_ticks: Option<u64>,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(1),
            warmup: WarmupConfig::default(),
            max_ticks: None,
        }
    }
}

impl AcquisitionConfig {
    fn limit_reached(&self, ticks: u64) -> bool {
        self.max_ticks.is_some_and(|max| ticks >= max)
    }
}

/// Requests a running [`AcquisitionLoop`] to stop.
///
/// Clones share the same flag, so a signal handler and the loop can each hold
/// one. A stop takes effect at the next tick boundary or immediately if the
/// loop is sleeping; an in-flight read or write completes first.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    token: CancellationToken,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the loop to exit. Idempotent.
    pub fn quit(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once [`quit`](Self::quit) has been called.
    pub async fn stopped(&self) {
        self.token.cancelled().await;
    }
}

/// Counters reported when the loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcquisitionSummary {
    /// Samples taken.
    pub ticks: u64,
    /// Samples skipped while the sensor warmed up.
    pub warmup_ticks: u64,
    /// Samples handed to the gateway successfully.
    pub persisted: u64,
    /// Samples dropped because the gateway failed.
    pub persist_failures: u64,
}

/// Samples the sensors and hands ready readings to a [`PersistenceGateway`].
pub struct AcquisitionLoop<G> {
    reader: SampleReader,
    gateway: G,
    config: AcquisitionConfig,
    stop: StopHandle,
}

impl<G: PersistenceGateway> AcquisitionLoop<G> {
    pub fn new(reader: SampleReader, gateway: G, config: AcquisitionConfig) -> Self {
        Self {
            reader,
            gateway,
            config,
            stop: StopHandle::new(),
        }
    }

    /// Share an existing stop flag instead of the loop's own.
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Run until stopped or `max_ticks` is reached.
    ///
    /// Returns [`Error::FatalInit`] without taking any sample if the
    /// air-quality sensor cannot be initialized. Sensor and persistence
    /// failures after that are logged and never end the loop.
    pub async fn run(self) -> Result<AcquisitionSummary> {
        let Self {
            mut reader,
            gateway,
            config,
            stop,
        } = self;

        info!("Initializing air-quality sensor");
        let (returned, init) = task::spawn_blocking(move || {
            let init = reader.init();
            (reader, init)
        })
        .await?;
        reader = returned;
        init.map_err(|e| {
            error!("Failed to initialize sgp30: {e}");
            Error::FatalInit(e)
        })?;
        info!(delay = ?config.delay, "Acquisition started");

        let mut detector = WarmupDetector::new(config.warmup);
        let mut summary = AcquisitionSummary::default();

        while !stop.is_stopped() && !config.limit_reached(summary.ticks) {
            let (returned, reading) = task::spawn_blocking(move || {
                let reading = reader.read_sample();
                (reader, reading)
            })
            .await?;
            reader = returned;
            summary.ticks += 1;

            if detector.observe(&reading) == WarmupState::Warming {
                summary.warmup_ticks += 1;
                debug!(samples = detector.samples(), "Sensor warming up, sample skipped");
            } else {
                match gateway.create(&reading).await {
                    Ok(()) => summary.persisted += 1,
                    Err(e) => {
                        summary.persist_failures += 1;
                        error!("Error saving to database: {e}");
                    }
                }
            }

            if config.limit_reached(summary.ticks) {
                break;
            }

            tokio::select! {
                _ = stop.stopped() => {
                    debug!("Stop requested during delay");
                }
                _ = tokio::time::sleep(config.delay) => {}
            }
        }

        info!(
            ticks = summary.ticks,
            persisted = summary.persisted,
            persist_failures = summary.persist_failures,
            "Acquisition stopped"
        );
        Ok(summary)
    }
}
