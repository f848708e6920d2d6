//! SQLite-backed persistence for the acquisition loop.

use std::sync::Arc;

use async_trait::async_trait;
use qualitair_core::{PersistenceError, PersistenceGateway, Reading};
use tracing::debug;

use crate::state::AppState;

/// Writes each ready reading to the shared [`Store`](qualitair_store::Store),
/// stamped with the current time.
#[derive(Clone)]
pub struct StoreGateway {
    state: Arc<AppState>,
}

impl StoreGateway {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl PersistenceGateway for StoreGateway {
    async fn create(&self, reading: &Reading) -> Result<(), PersistenceError> {
        let store = self.state.store.lock().await;
        let id = store.create(reading).map_err(PersistenceError::new)?;
        debug!(id, "Saved measurement");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use qualitair_core::mock::MockAirQuality;
    use qualitair_core::{AcquisitionConfig, AcquisitionLoop, SampleReader};
    use qualitair_store::Store;

    use super::*;
    use crate::config::Config;

    fn create_test_state() -> Arc<AppState> {
        AppState::new(Store::open_in_memory().unwrap(), Config::default())
    }

    #[tokio::test]
    async fn test_create_stores_sentinels_as_null() {
        let state = create_test_state();
        let gateway = StoreGateway::new(Arc::clone(&state));

        gateway.create(&Reading::new(-1, -1, f64::NAN, 48.0)).await.unwrap();

        let store = state.store.lock().await;
        let latest = store.latest_measurement().unwrap().unwrap();
        assert_eq!((latest.co2, latest.voc), (-1, -1));
        assert_eq!(latest.temperature, None);
        assert_eq!(latest.humidity, Some(48.0));
    }

    #[tokio::test]
    async fn test_acquisition_into_store() {
        let state = create_test_state();
        let reader = SampleReader::new(
            MockAirQuality::new().with_readings([(400, 0), (400, 0), (402, 5), (410, 9)]),
        );
        let config = AcquisitionConfig {
            delay: std::time::Duration::ZERO,
            max_ticks: Some(4),
            ..Default::default()
        };

        let summary = AcquisitionLoop::new(reader, StoreGateway::new(Arc::clone(&state)), config)
            .run()
            .await
            .unwrap();
        assert_eq!(summary.persisted, 2);

        let store = state.store.lock().await;
        assert_eq!(store.count_measurements().unwrap(), 2);
    }
}
