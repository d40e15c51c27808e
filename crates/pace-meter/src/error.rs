//! Meter error types

use thiserror::Error;

/// Meter construction errors
#[derive(Debug, Error)]
pub enum MeterError {
    /// No tokio runtime to host the timer task
    #[error("no tokio runtime available for the meter timer")]
    NoRuntime,

    /// Report interval is zero
    #[error("report interval must be greater than zero")]
    ZeroInterval,

    /// Invalid configuration
    #[error("invalid config: {0}")]
    Config(String),
}

/// Result type for meter operations
pub type MeterResult<T> = Result<T, MeterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            MeterError::ZeroInterval.to_string(),
            "report interval must be greater than zero"
        );
        assert_eq!(
            MeterError::Config("empty label".into()).to_string(),
            "invalid config: empty label"
        );
    }
}
