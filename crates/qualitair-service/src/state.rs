//! Application state shared across handlers and the acquisition loop.

use std::sync::Arc;

use qualitair_store::Store;
use tokio::sync::Mutex;

use crate::config::Config;

/// Shared application state.
///
/// The store is the only mutable resource. HTTP handlers and the
/// [`StoreGateway`](crate::StoreGateway) hold the lock for a single query
/// or insert at a time.
pub struct AppState {
    /// The data store.
    pub store: Mutex<Store>,
    /// Configuration the daemon was started with.
    pub config: Config,
}

impl AppState {
    pub fn new(store: Store, config: Config) -> Arc<Self> {
        Arc::new(Self {
            store: Mutex::new(store),
            config,
        })
    }
}
