//! Stall-coalescing reporter

use crate::format::{format_rate, Precision};
use crate::reporter::Reporter;
use crate::SNAP_TOLERANCE;
use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Default)]
struct StallState {
    /// Last non-zero value reported
    previous: f64,
    /// Start of the current run of zero flushes
    stalled_since: Option<Instant>,
}

/// Reporter that collapses runs of empty flushes.
///
/// Non-zero flushes are logged as rate lines with three fractional digits.
/// Once the flow of events stops, each empty flush logs how long the meter
/// has been stalled instead of a `0.000/s` line. Only empty flushes before
/// the first non-zero value stay silent.
#[derive(Debug)]
pub struct StallReporter {
    precision: Precision,
    state: Mutex<StallState>,
}

impl StallReporter {
    /// Create a stall reporter with three-digit precision
    pub fn new() -> Self {
        Self {
            precision: Precision::Fixed(3),
            state: Mutex::new(StallState::default()),
        }
    }

    /// Override the value precision
    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    /// Advance the stall state for one flush observed at `now` and return
    /// the line to log, if any.
    pub fn render(
        &self,
        label: &str,
        timeframe: Duration,
        value: f64,
        now: Instant,
    ) -> Option<String> {
        let mut state = self.state.lock();

        if value == 0.0 {
            if state.previous == 0.0 {
                return None;
            }
            let stalled = match state.stalled_since {
                Some(since) => snap_to_multiple(now.saturating_duration_since(since), timeframe),
                None => {
                    state.stalled_since = Some(now.checked_sub(timeframe).unwrap_or(now));
                    timeframe
                }
            };
            return Some(format!("{}: stalled for {:?}", label, stalled));
        }

        state.previous = value;
        state.stalled_since = None;
        Some(format_rate(label, timeframe, value, self.precision))
    }
}

impl Default for StallReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for StallReporter {
    fn report(&self, label: &str, timeframe: Duration, value: f64) {
        if let Some(line) = self.render(label, timeframe, value, Instant::now()) {
            tracing::info!(target: "pace", "{}", line);
        }
    }
}

/// Round `elapsed` down to a whole number of `timeframe`s when the
/// remainder is only scheduler jitter.
fn snap_to_multiple(elapsed: Duration, timeframe: Duration) -> Duration {
    let step = timeframe.as_nanos();
    if step == 0 {
        return elapsed;
    }
    let whole = Duration::from_nanos((elapsed.as_nanos() / step * step) as u64);
    if elapsed - whole < SNAP_TOLERANCE {
        whole
    } else {
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEC: Duration = Duration::from_secs(1);

    #[test]
    fn test_stall_coalescing() {
        let reporter = StallReporter::new();
        let t0 = Instant::now();

        let lines: Vec<_> = [5.0, 0.0, 0.0, 0.0, 5.0]
            .iter()
            .enumerate()
            .filter_map(|(i, v)| reporter.render("items", SEC, *v, t0 + SEC * (i as u32 + 1)))
            .collect();

        assert_eq!(
            lines,
            vec![
                "items: 5.000/s in 1s",
                "items: stalled for 1s",
                "items: stalled for 2s",
                "items: stalled for 3s",
                "items: 5.000/s in 1s",
            ]
        );
        assert_eq!(lines.iter().filter(|l| l.contains("stalled for 3s")).count(), 1);
        assert!(!lines.iter().any(|l| l.contains("0.000/s")));
    }

    #[test]
    fn test_leading_zeros_are_silent() {
        let reporter = StallReporter::new();
        let t0 = Instant::now();

        assert_eq!(reporter.render("items", SEC, 0.0, t0 + SEC), None);
        assert_eq!(reporter.render("items", SEC, 0.0, t0 + SEC * 2), None);
        assert_eq!(
            reporter.render("items", SEC, 2.0, t0 + SEC * 3).as_deref(),
            Some("items: 2.000/s in 1s")
        );
    }

    #[test]
    fn test_stall_duration_absorbs_jitter() {
        let reporter = StallReporter::new();
        let t0 = Instant::now();

        reporter.render("items", SEC, 1.0, t0 + SEC);
        reporter.render("items", SEC, 0.0, t0 + SEC * 2);
        let line = reporter.render("items", SEC, 0.0, t0 + SEC * 3 + Duration::from_millis(4));
        assert_eq!(line.as_deref(), Some("items: stalled for 2s"));

        let line = reporter.render("items", SEC, 0.0, t0 + SEC * 4 + Duration::from_millis(500));
        assert_eq!(line.as_deref(), Some("items: stalled for 3.5s"));
    }

    #[test]
    fn test_new_stall_after_recovery() {
        let reporter = StallReporter::new();
        let t0 = Instant::now();

        reporter.render("items", SEC, 1.0, t0 + SEC);
        reporter.render("items", SEC, 0.0, t0 + SEC * 2);
        reporter.render("items", SEC, 0.0, t0 + SEC * 3);
        reporter.render("items", SEC, 4.0, t0 + SEC * 4);

        let line = reporter.render("items", SEC, 0.0, t0 + SEC * 5);
        assert_eq!(line.as_deref(), Some("items: stalled for 1s"));
    }

    #[test]
    fn test_snap_to_multiple() {
        assert_eq!(snap_to_multiple(Duration::from_millis(3009), SEC), SEC * 3);
        assert_eq!(
            snap_to_multiple(Duration::from_millis(3010), SEC),
            Duration::from_millis(3010)
        );
        assert_eq!(
            snap_to_multiple(Duration::from_millis(7), Duration::ZERO),
            Duration::from_millis(7)
        );
    }
}
