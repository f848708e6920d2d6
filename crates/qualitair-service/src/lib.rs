//! Air-quality acquisition daemon and HTTP read API.
//!
//! This crate wires the pieces of qualitair together:
//! - Loads and validates the daemon configuration
//! - Stores ready readings in SQLite through [`StoreGateway`]
//! - Exposes a read-only REST API over the stored measurements
//!
//! # REST API Endpoints
//!
//! - `GET /api/health` - Service health check
//! - `GET /api/measurements` - Paginated measurements, newest first
//! - `GET /api/measurements/latest` - Most recent measurement
//! - `GET /api/measurements/buckets` - Averages per time bucket
//!
//! # Configuration
//!
//! The daemon reads `~/.config/qualitair/qualitair.toml`; every section is
//! optional:
//!
//! ```toml
//! [sensors]
//! i2c_bus = "/dev/i2c-1"
//! sgp30_address = 0x58
//! enable_dht22 = true
//! dht22_pin = 4
//!
//! [acquisition]
//! query_delay_secs = 1.0
//!
//! [storage]
//! path = "/var/lib/qualitair/qualitair.db"
//!
//! [server]
//! enabled = true
//! bind = "127.0.0.1:8080"
//! ```

pub mod api;
pub mod config;
pub mod gateway;
pub mod state;

pub use config::{
    AcquisitionSettings, Config, ConfigError, SensorConfig, ServerConfig, StorageConfig,
    ValidationError,
};
pub use gateway::StoreGateway;
pub use state::AppState;
