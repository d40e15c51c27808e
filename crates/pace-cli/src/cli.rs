//! CLI argument parsing for the load driver

use crate::config::{default_phases, DriverConfig, Phase};
use clap::{Parser, ValueEnum};
use pace_meter::{MeterConfig, ReporterKind};
use std::path::PathBuf;

/// Reporter selection on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReporterArg {
    /// One line per flush
    Log,
    /// Collapse empty flushes into "stalled for" lines
    Stall,
}

impl From<ReporterArg> for ReporterKind {
    fn from(arg: ReporterArg) -> Self {
        match arg {
            ReporterArg::Log => ReporterKind::Log,
            ReporterArg::Stall => ReporterKind::Stall,
        }
    }
}

/// Drive synthetic load through a pace meter
#[derive(Parser, Debug, Clone)]
#[command(name = "pace")]
#[command(about = "Drive synthetic load through a pace meter")]
#[command(version)]
pub struct Cli {
    /// Meter label
    #[arg(long, default_value = "items")]
    pub label: String,

    /// Report interval in milliseconds
    #[arg(long, default_value = "1000")]
    pub interval_ms: u64,

    /// Reporter for automatic flushes
    #[arg(long, value_enum, default_value_t = ReporterArg::Stall)]
    pub reporter: ReporterArg,

    /// Fractional digits for reported values
    #[arg(long)]
    pub precision: Option<usize>,

    /// Load phase as EVERY_MS:FOR_MS (repeatable, defaults to a 1/10/100/500 ms ramp)
    #[arg(long = "phase")]
    pub phases: Vec<Phase>,

    /// Idle time after the last phase, in milliseconds
    #[arg(long, default_value = "3000")]
    pub idle_ms: u64,

    /// JSON config file (replaces the meter and load flags)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Driver configuration described by the flags
    pub fn driver_config(&self) -> DriverConfig {
        let phases = if self.phases.is_empty() {
            default_phases()
        } else {
            self.phases.clone()
        };
        DriverConfig {
            meter: MeterConfig {
                label: self.label.clone(),
                interval_ms: self.interval_ms,
                reporter: self.reporter.into(),
                precision: self.precision,
            },
            phases,
            idle_ms: self.idle_ms,
        }
    }
}
