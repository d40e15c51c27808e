//! Rate line formatting shared by the reference reporters

use serde::{Deserialize, Serialize};
use std::time::Duration;

const SECOND: Duration = Duration::from_secs(1);
const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(60 * 60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// How values are rendered in a rate line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    /// Shortest representation that round-trips (`1000`, `0.25`)
    #[default]
    Natural,
    /// Fixed number of fractional digits (`1000.000`)
    Fixed(usize),
}

impl Precision {
    /// Render a value with this precision
    pub fn fmt(self, value: f64) -> String {
        match self {
            Precision::Natural => value.to_string(),
            Precision::Fixed(digits) => format!("{:.*}", digits, value),
        }
    }
}

/// Format one flush as a human-readable rate line.
///
/// Timeframes of exactly one second, minute, hour or day use the compact
/// `label: value/unit in timeframe` form. Any other timeframe falls back to
/// `value label in timeframe (pace: rate/s)`, where the rate is normalized
/// per second.
pub fn format_rate(label: &str, timeframe: Duration, value: f64, precision: Precision) -> String {
    let unit = [(SECOND, "s"), (MINUTE, "m"), (HOUR, "h"), (DAY, "day")]
        .into_iter()
        .find(|(unit, _)| *unit == timeframe)
        .map(|(_, name)| name);

    match unit {
        Some(unit) => format!(
            "{}: {}/{} in {:?}",
            label,
            precision.fmt(value),
            unit,
            timeframe
        ),
        None => format!(
            "{} {} in {:?} (pace: {}/s)",
            precision.fmt(value),
            label,
            timeframe,
            precision.fmt(per_second(timeframe, value))
        ),
    }
}

fn per_second(timeframe: Duration, value: f64) -> f64 {
    let secs = timeframe.as_secs_f64();
    if secs > 0.0 {
        value / secs
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_templates() {
        let p = Precision::Fixed(3);
        assert_eq!(
            format_rate("items", SECOND, 1000.0, p),
            "items: 1000.000/s in 1s"
        );
        assert_eq!(format_rate("items", MINUTE, 5.0, p), "items: 5.000/m in 60s");
        assert_eq!(format_rate("items", HOUR, 5.0, p), "items: 5.000/h in 3600s");
        assert_eq!(
            format_rate("items", DAY, 5.0, p),
            "items: 5.000/day in 86400s"
        );
    }

    #[test]
    fn test_fallback_template() {
        let line = format_rate("items", Duration::from_secs(3), 30.0, Precision::Natural);
        assert_eq!(line, "30 items in 3s (pace: 10/s)");

        let line = format_rate(
            "items",
            Duration::from_millis(500),
            2.0,
            Precision::Fixed(3),
        );
        assert_eq!(line, "2.000 items in 500ms (pace: 4.000/s)");
    }

    #[test]
    fn test_natural_precision() {
        assert_eq!(Precision::Natural.fmt(1000.0), "1000");
        assert_eq!(Precision::Natural.fmt(0.25), "0.25");
        assert_eq!(Precision::Fixed(1).fmt(0.26), "0.3");
    }

    #[test]
    fn test_zero_timeframe() {
        let line = format_rate("items", Duration::ZERO, 4.0, Precision::Natural);
        assert_eq!(line, "4 items in 0ns (pace: 0/s)");
    }
}
