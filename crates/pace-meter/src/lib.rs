//! # pace-meter
//!
//! Thread-safe rate meter: count events from many producers and report
//! the rate they arrive at.
//!
//! Features:
//! - Weighted step counting from any number of threads
//! - Periodic flush to a pluggable reporter
//! - Pause/resume and manual reports
//! - Log and stall-coalescing reference reporters

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod error;
mod format;
mod meter;
mod reporter;
mod stall;

pub use config::{MeterConfig, ReporterKind};
pub use error::{MeterError, MeterResult};
pub use format::{format_rate, Precision};
pub use meter::{Meter, MeterBuilder, MIN_INTERVAL};
pub use reporter::{LogReporter, Reporter};
pub use stall::StallReporter;

/// Maximum distance between the measured timeframe and the configured
/// interval for the timeframe to be reported as the interval itself.
pub const SNAP_TOLERANCE: std::time::Duration = std::time::Duration::from_millis(10);
