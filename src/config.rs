//! Configuration management for Phoros
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files.

use crate::error::{PhorosError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Portal backend connection configuration
    pub api: ApiConfig,

    /// Status polling cadence configuration
    pub polling: PollingConfig,

    /// Pricing policy for settlement amounts
    pub pricing: PricingConfig,

    /// Recovery store configuration
    pub persistence: PersistenceConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Portal backend connection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the reservation portal backend
    pub base_url: String,

    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
}

/// Status polling cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Poll interval at normal speed, in milliseconds
    pub base_interval_ms: u64,

    /// Poll interval at accelerated demo speed, in milliseconds
    pub accelerated_interval_ms: u64,
}

/// Pricing policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Unit price applied when the backend omits one for a session.
    /// Business policy inherited from the portal; override per deployment.
    pub fallback_price_per_kwh: f64,

    /// Currency symbol for display and summaries
    pub currency_symbol: String,
}

/// Recovery store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Path of the single-slot pending-payment record file
    pub state_file: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Path to log file or log directory
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000/api".to_string(),
            timeout_seconds: 10,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            base_interval_ms: 5000,
            accelerated_interval_ms: 500,
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            fallback_price_per_kwh: 4000.0,
            currency_symbol: "₫".to_string(),
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            state_file: "/data/phoros_state.json".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file: "/tmp/phoros.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the default locations
    pub fn load() -> Result<Self> {
        let default_paths = [
            "phoros_config.yaml",
            "/data/phoros_config.yaml",
            "/etc/phoros/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        // Fall back to default configuration
        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.is_empty() {
            return Err(PhorosError::validation(
                "api.base_url",
                "Base URL cannot be empty",
            ));
        }

        if self.api.timeout_seconds == 0 {
            return Err(PhorosError::validation(
                "api.timeout_seconds",
                "Must be greater than 0",
            ));
        }

        if self.polling.base_interval_ms == 0 {
            return Err(PhorosError::validation(
                "polling.base_interval_ms",
                "Must be greater than 0",
            ));
        }

        if self.polling.accelerated_interval_ms == 0 {
            return Err(PhorosError::validation(
                "polling.accelerated_interval_ms",
                "Must be greater than 0",
            ));
        }

        if self.polling.accelerated_interval_ms > self.polling.base_interval_ms {
            return Err(PhorosError::validation(
                "polling.accelerated_interval_ms",
                "Accelerated interval must not exceed the base interval",
            ));
        }

        if self.pricing.fallback_price_per_kwh <= 0.0 {
            return Err(PhorosError::validation(
                "pricing.fallback_price_per_kwh",
                "Must be positive",
            ));
        }

        if self.persistence.state_file.is_empty() {
            return Err(PhorosError::validation(
                "persistence.state_file",
                "State file path cannot be empty",
            ));
        }

        Ok(())
    }
}
