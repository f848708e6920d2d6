//! Persistence seam between acquisition and storage.

use std::sync::Arc;

use async_trait::async_trait;
use qualitair_types::Reading;

use crate::error::PersistenceError;

/// Accepts readings from the acquisition loop.
///
/// Implementations stamp the record with the current time. A failed call
/// drops that one sample; the loop does not retry.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    async fn create(&self, reading: &Reading) -> Result<(), PersistenceError>;
}

#[async_trait]
impl<G: PersistenceGateway + ?Sized> PersistenceGateway for Arc<G> {
    async fn create(&self, reading: &Reading) -> Result<(), PersistenceError> {
        (**self).create(reading).await
    }
}
