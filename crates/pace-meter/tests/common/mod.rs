//! Shared helpers for meter integration tests

#![allow(dead_code)]

use pace_meter::{Meter, Reporter};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// One recorded flush
#[derive(Debug, Clone, PartialEq)]
pub struct Flush {
    pub label: String,
    pub timeframe: Duration,
    pub value: f64,
}

/// Reporter that records every flush it receives
#[derive(Default)]
pub struct Recorder {
    flushes: Mutex<Vec<Flush>>,
}

impl Recorder {
    pub fn flushes(&self) -> Vec<Flush> {
        self.flushes.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.flushes.lock().len()
    }

    pub fn last(&self) -> Option<Flush> {
        self.flushes.lock().last().cloned()
    }
}

impl Reporter for Recorder {
    fn report(&self, label: &str, timeframe: Duration, value: f64) {
        self.flushes.lock().push(Flush {
            label: label.to_string(),
            timeframe,
            value,
        });
    }
}

/// Meter labelled `items` that reports into a fresh recorder
pub fn recorded_meter(interval: Duration) -> (Meter, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let reporter: Arc<dyn Reporter> = recorder.clone();
    (Meter::new("items", interval, Some(reporter)), recorder)
}
