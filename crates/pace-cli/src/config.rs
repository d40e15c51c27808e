//! Configuration types for the load driver

use pace_meter::MeterConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Config errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Phase string is not `EVERY_MS:FOR_MS`
    #[error("invalid phase {0:?}, expected EVERY_MS:FOR_MS")]
    InvalidPhase(String),
    /// Phase with a zero step period
    #[error("phase step period must be greater than zero")]
    ZeroPeriod,
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed JSON
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One load phase: a step every `every_ms` for `for_ms`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    /// Period between steps
    pub every_ms: u64,
    /// Phase length
    pub for_ms: u64,
}

impl Phase {
    /// Period between steps
    pub fn every(&self) -> Duration {
        Duration::from_millis(self.every_ms)
    }

    /// Phase length
    pub fn length(&self) -> Duration {
        Duration::from_millis(self.for_ms)
    }
}

impl FromStr for Phase {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidPhase(s.to_string());
        let (every, length) = s.split_once(':').ok_or_else(invalid)?;
        let every_ms: u64 = every.trim().parse().map_err(|_| invalid())?;
        let for_ms: u64 = length.trim().parse().map_err(|_| invalid())?;
        if every_ms == 0 {
            return Err(ConfigError::ZeroPeriod);
        }
        Ok(Self { every_ms, for_ms })
    }
}

/// Load driver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Meter under load
    #[serde(default)]
    pub meter: MeterConfig,
    /// Load phases, run in order
    #[serde(default = "default_phases")]
    pub phases: Vec<Phase>,
    /// Idle time after the last phase
    #[serde(default)]
    pub idle_ms: u64,
}

/// Ramp from dense to sparse events, three seconds each
pub fn default_phases() -> Vec<Phase> {
    [1, 10, 100, 500]
        .into_iter()
        .map(|every_ms| Phase {
            every_ms,
            for_ms: 3000,
        })
        .collect()
}

impl DriverConfig {
    /// Idle time after the last phase
    pub fn idle(&self) -> Duration {
        Duration::from_millis(self.idle_ms)
    }

    /// Reject phases the driver cannot run
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.phases.iter().any(|p| p.every_ms == 0) {
            return Err(ConfigError::ZeroPeriod);
        }
        Ok(())
    }
}

/// Load driver configuration from a JSON file
pub fn load_config_file(path: &Path) -> Result<DriverConfig, ConfigError> {
    tracing::info!("Loading config from {:?}", path);
    let content = std::fs::read_to_string(path)?;
    let config: DriverConfig = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}
