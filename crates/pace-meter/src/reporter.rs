//! Reporting capability and the default log reporter

use crate::format::{format_rate, Precision};
use std::time::Duration;

/// Receives the result of every meter flush.
///
/// Reporters run while the meter holds its state lock, so concurrent
/// [`Meter::step`](crate::Meter::step) calls wait until `report` returns.
/// Keep implementations fast and hand expensive work off elsewhere. A
/// reporter may keep private state but must never call back into the meter
/// that invokes it.
pub trait Reporter: Send + Sync {
    /// Report `value` accumulated by the meter `label` over `timeframe`
    fn report(&self, label: &str, timeframe: Duration, value: f64);
}

impl<F> Reporter for F
where
    F: Fn(&str, Duration, f64) + Send + Sync,
{
    fn report(&self, label: &str, timeframe: Duration, value: f64) {
        self(label, timeframe, value)
    }
}

/// Default reporter: one `info` event per flush, values in natural precision
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter {
    precision: Precision,
}

impl LogReporter {
    /// Create a log reporter with natural precision
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the value precision
    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    /// Render the line this reporter logs for a flush
    pub fn render(&self, label: &str, timeframe: Duration, value: f64) -> String {
        format_rate(label, timeframe, value, self.precision)
    }
}

impl Reporter for LogReporter {
    fn report(&self, label: &str, timeframe: Duration, value: f64) {
        tracing::info!(target: "pace", "{}", self.render(label, timeframe, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_closure_reporter() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let reporter = move |label: &str, timeframe: Duration, value: f64| {
            sink.lock().push((label.to_string(), timeframe, value));
        };

        reporter.report("items", Duration::from_secs(1), 3.0);

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], ("items".to_string(), Duration::from_secs(1), 3.0));
    }

    #[test]
    fn test_log_reporter_render() {
        let reporter = LogReporter::new();
        assert_eq!(
            reporter.render("items", Duration::from_secs(1), 1000.0),
            "items: 1000/s in 1s"
        );

        let reporter = reporter.with_precision(Precision::Fixed(3));
        assert_eq!(
            reporter.render("items", Duration::from_secs(1), 1000.0),
            "items: 1000.000/s in 1s"
        );
    }
}
