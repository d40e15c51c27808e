//! Meter configuration

use crate::format::Precision;
use crate::reporter::{LogReporter, Reporter};
use crate::stall::StallReporter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Reference reporter selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReporterKind {
    /// [`LogReporter`]
    #[default]
    Log,
    /// [`StallReporter`]
    Stall,
}

/// Meter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterConfig {
    /// Display label
    pub label: String,
    /// Report interval in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Reporter used for automatic flushes
    #[serde(default)]
    pub reporter: ReporterKind,
    /// Fractional digits; `None` keeps the reporter's own default
    #[serde(default)]
    pub precision: Option<usize>,
}

fn default_interval_ms() -> u64 {
    1000
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            label: "items".to_string(),
            interval_ms: default_interval_ms(),
            reporter: ReporterKind::default(),
            precision: None,
        }
    }
}

impl MeterConfig {
    /// Report interval
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Build the configured reporter
    pub fn build_reporter(&self) -> Arc<dyn Reporter> {
        let precision = self.precision.map(Precision::Fixed);
        match self.reporter {
            ReporterKind::Log => {
                let reporter = LogReporter::new();
                Arc::new(match precision {
                    Some(p) => reporter.with_precision(p),
                    None => reporter,
                })
            }
            ReporterKind::Stall => {
                let reporter = StallReporter::new();
                Arc::new(match precision {
                    Some(p) => reporter.with_precision(p),
                    None => reporter,
                })
            }
        }
    }
}
