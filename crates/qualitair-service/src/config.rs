//! Daemon configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use qualitair_core::{AcquisitionConfig, WarmupConfig};
use serde::{Deserialize, Serialize};

/// Daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sensor wiring.
    pub sensors: SensorConfig,
    /// Sampling and warm-up settings.
    pub acquisition: AcquisitionSettings,
    /// Storage settings.
    pub storage: StorageConfig,
    /// HTTP server settings.
    pub server: ServerConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return every problem found.
    ///
    /// ```
    /// use qualitair_service::Config;
    ///
    /// let config = Config::default();
    /// config.validate().expect("Default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        errors.extend(self.sensors.validate());
        errors.extend(self.acquisition.validate());
        errors.extend(self.storage.validate());
        errors.extend(self.server.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load and validate configuration from a file.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Loop settings for the acquisition engine.
    pub fn acquisition_config(&self, max_ticks: Option<u64>) -> AcquisitionConfig {
        AcquisitionConfig {
            delay: self.acquisition.delay(),
            warmup: WarmupConfig {
                baseline_co2: self.acquisition.baseline_co2,
                baseline_voc: self.acquisition.baseline_voc,
                max_samples: self.acquisition.max_warmup_samples,
            },
            max_ticks,
        }
    }
}

/// Sensor wiring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// I2C character device the SGP30 sits on.
    pub i2c_bus: PathBuf,
    /// SGP30 I2C address.
    pub sgp30_address: u8,
    /// Read temperature/humidity from a DHT22.
    pub enable_dht22: bool,
    /// GPIO pin of the DHT22 data line.
    pub dht22_pin: u8,
    /// sysfs directory holding IIO devices.
    pub iio_root: PathBuf,
}

/// Highest GPIO number on the supported boards.
pub const MAX_GPIO_PIN: u8 = 63;

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            i2c_bus: PathBuf::from("/dev/i2c-1"),
            sgp30_address: qualitair_core::sgp30::DEFAULT_ADDRESS,
            enable_dht22: false,
            dht22_pin: 4,
            iio_root: PathBuf::from(qualitair_core::dht22::DEFAULT_IIO_ROOT),
        }
    }
}

impl SensorConfig {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.i2c_bus.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "sensors.i2c_bus".to_string(),
                message: "I2C bus path cannot be empty".to_string(),
            });
        }

        if self.sgp30_address > 0x7F {
            errors.push(ValidationError {
                field: "sensors.sgp30_address".to_string(),
                message: format!(
                    "address 0x{:02x} is not a 7-bit I2C address",
                    self.sgp30_address
                ),
            });
        }

        if self.dht22_pin > MAX_GPIO_PIN {
            errors.push(ValidationError {
                field: "sensors.dht22_pin".to_string(),
                message: format!(
                    "pin {} is out of range (maximum {})",
                    self.dht22_pin, MAX_GPIO_PIN
                ),
            });
        }

        errors
    }
}

/// Maximum delay between samples in seconds (1 hour).
pub const MAX_QUERY_DELAY_SECS: f64 = 3600.0;

/// Sampling and warm-up settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionSettings {
    /// Seconds to sleep between samples.
    pub query_delay_secs: f64,
    /// eCO2 reported while the SGP30 warms up.
    pub baseline_co2: i32,
    /// TVOC reported while the SGP30 warms up.
    pub baseline_voc: i32,
    /// Samples after which warm-up ends regardless of values.
    pub max_warmup_samples: u32,
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        let warmup = WarmupConfig::default();
        Self {
            query_delay_secs: 1.0,
            baseline_co2: warmup.baseline_co2,
            baseline_voc: warmup.baseline_voc,
            max_warmup_samples: warmup.max_samples,
        }
    }
}

impl AcquisitionSettings {
    /// The inter-sample delay. Falls back to one second for values that
    /// [`validate`](Self::validate) rejects.
    pub fn delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.query_delay_secs).unwrap_or(Duration::from_secs(1))
    }

    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if !self.query_delay_secs.is_finite() || self.query_delay_secs < 0.0 {
            errors.push(ValidationError {
                field: "acquisition.query_delay_secs".to_string(),
                message: format!(
                    "delay {} must be a non-negative number of seconds",
                    self.query_delay_secs
                ),
            });
        } else if self.query_delay_secs > MAX_QUERY_DELAY_SECS {
            errors.push(ValidationError {
                field: "acquisition.query_delay_secs".to_string(),
                message: format!(
                    "delay {} is too long (maximum {} seconds / 1 hour)",
                    self.query_delay_secs, MAX_QUERY_DELAY_SECS
                ),
            });
        }

        errors
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file path.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: qualitair_store::default_db_path(),
        }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.path".to_string(),
                message: "database path cannot be empty".to_string(),
            });
        }

        errors
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Serve the read API.
    pub enabled: bool,
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.bind.is_empty() {
            errors.push(ValidationError {
                field: "server.bind".to_string(),
                message: "bind address cannot be empty".to_string(),
            });
            return errors;
        }

        let Some((_, port)) = self.bind.rsplit_once(':') else {
            errors.push(ValidationError {
                field: "server.bind".to_string(),
                message: format!(
                    "invalid bind address '{}': expected format 'host:port'",
                    self.bind
                ),
            });
            return errors;
        };

        match port.parse::<u16>() {
            Ok(0) => errors.push(ValidationError {
                field: "server.bind".to_string(),
                message: "port cannot be 0".to_string(),
            }),
            Err(_) => errors.push(ValidationError {
                field: "server.bind".to_string(),
                message: format!("invalid port '{}': must be a number 1-65535", port),
            }),
            Ok(_) => {}
        }

        errors
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path (e.g., `server.bind`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("qualitair")
        .join("qualitair.toml")
}
