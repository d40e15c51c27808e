//! Meter state machine and its timer task

use crate::config::MeterConfig;
use crate::error::{MeterError, MeterResult};
use crate::reporter::{LogReporter, Reporter};
use crate::SNAP_TOLERANCE;
use parking_lot::Mutex;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{watch, Notify};
use tokio::time::Instant;

/// Shortest automatic flush period; shorter intervals are raised to it
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Mutable meter state, always accessed under one lock
struct State {
    /// Sum of steps since the last flush
    value: f64,
    /// Automatic flush period
    interval: Duration,
    /// When the accumulator was last reset
    last_flush: Instant,
    paused: bool,
    closed: bool,
    /// Next automatic flush; `None` while the timer is stopped
    deadline: Option<Instant>,
}

impl State {
    /// Hand the accumulated value to `reporter` and start a new timeframe
    fn flush(&mut self, label: &str, reporter: &dyn Reporter) {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.last_flush);
        let timeframe = snap_timeframe(elapsed, self.interval);
        let value = self.value;
        let reported = panic::catch_unwind(AssertUnwindSafe(|| {
            reporter.report(label, timeframe, value)
        }));
        if reported.is_err() {
            tracing::warn!(label = %label, value, "reporter panicked, flush dropped");
        }
        self.value = 0.0;
        self.last_flush = now;
    }
}

struct Shared {
    label: String,
    reporter: Arc<dyn Reporter>,
    state: Mutex<State>,
    /// Wakes the timer task after the deadline moved
    rearm: Arc<Notify>,
    shutdown: watch::Sender<bool>,
}

impl Shared {
    /// Schedule the next automatic flush one interval after the last one
    fn arm(&self, state: &mut State) {
        if state.closed {
            return;
        }
        state.deadline = Some(state.last_flush + state.interval);
        self.rearm.notify_one();
    }

    fn on_timer(&self) {
        let mut state = self.state.lock();
        match state.deadline {
            Some(deadline) if !state.paused && deadline <= Instant::now() => {}
            // Stopped or moved while the task was sleeping
            _ => return,
        }
        tracing::trace!(label = %self.label, value = state.value, "timer flush");
        state.flush(&self.label, self.reporter.as_ref());
        state.deadline = Some(state.last_flush + state.interval);
    }
}

/// Thread-safe rate meter.
///
/// Producers record events with [`step`](Meter::step); every `interval` the
/// accumulated sum is handed to the meter's [`Reporter`] together with the
/// timeframe it covers, and the accumulator starts again from zero.
///
/// `Meter` is a cheap handle: clones share the same accumulator and timer.
/// The timer task stops on [`shutdown`](Meter::shutdown) or once the last
/// handle is dropped.
#[derive(Clone)]
pub struct Meter {
    shared: Arc<Shared>,
}

impl Meter {
    /// Create a meter on the current tokio runtime.
    ///
    /// Without a reporter, flushes go to [`LogReporter`].
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime. Use
    /// [`Meter::builder`] to get an error instead.
    ///
    /// # Notes
    ///
    /// Intervals below [`MIN_INTERVAL`], including zero, are raised to it.
    pub fn new(
        label: impl Into<String>,
        interval: Duration,
        reporter: Option<Arc<dyn Reporter>>,
    ) -> Self {
        let reporter = reporter.unwrap_or_else(|| Arc::new(LogReporter::new()));
        Self::spawn(&Handle::current(), label.into(), interval, reporter)
    }

    /// Start building a meter
    pub fn builder(label: impl Into<String>) -> MeterBuilder {
        MeterBuilder::new(label)
    }

    /// Create a meter from configuration on the current tokio runtime
    pub fn from_config(config: &MeterConfig) -> MeterResult<Self> {
        if config.label.trim().is_empty() {
            return Err(MeterError::Config("label must not be empty".into()));
        }
        Self::builder(config.label.clone())
            .interval(config.interval())
            .reporter(config.build_reporter())
            .build()
    }

    fn spawn(
        handle: &Handle,
        label: String,
        interval: Duration,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        let interval = interval.max(MIN_INTERVAL);
        let now = Instant::now();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let rearm = Arc::new(Notify::new());

        let shared = Arc::new(Shared {
            label,
            reporter,
            state: Mutex::new(State {
                value: 0.0,
                interval,
                last_flush: now,
                paused: false,
                closed: false,
                deadline: Some(now + interval),
            }),
            rearm: Arc::clone(&rearm),
            shutdown,
        });

        handle.spawn(run_timer(Arc::downgrade(&shared), rearm, shutdown_rx));
        tracing::debug!(label = %shared.label, ?interval, "meter started");

        Self { shared }
    }

    /// Add `delta` to the accumulator.
    ///
    /// Never blocks beyond the brief state lock and never triggers a flush.
    /// Negative deltas are accepted as corrections.
    pub fn step(&self, delta: f64) {
        self.shared.state.lock().value += delta;
    }

    /// Flush what has accumulated so far and stop automatic reporting.
    ///
    /// Steps keep accumulating while paused.
    pub fn pause(&self) {
        let shared = &*self.shared;
        let mut state = shared.state.lock();
        state.deadline = None;
        state.flush(&shared.label, shared.reporter.as_ref());
        state.paused = true;
        tracing::debug!(label = %shared.label, "meter paused");
    }

    /// Flush what has accumulated so far and restart automatic reporting.
    ///
    /// A non-zero `interval` replaces the configured one; `None` or
    /// [`Duration::ZERO`] keeps it.
    pub fn resume(&self, interval: Option<Duration>) {
        let shared = &*self.shared;
        let mut state = shared.state.lock();
        state.flush(&shared.label, shared.reporter.as_ref());
        state.paused = false;
        if let Some(interval) = interval.filter(|d| !d.is_zero()) {
            tracing::debug!(label = %shared.label, ?interval, "meter interval changed");
            state.interval = interval.max(MIN_INTERVAL);
        }
        shared.arm(&mut state);
        tracing::debug!(label = %shared.label, "meter resumed");
    }

    /// Flush now with the meter's own reporter
    pub fn report(&self) {
        self.report_inner(None);
    }

    /// Flush now with `reporter` instead of the meter's own.
    ///
    /// The override applies to this flush only.
    pub fn report_with(&self, reporter: &dyn Reporter) {
        self.report_inner(Some(reporter));
    }

    fn report_inner(&self, reporter: Option<&dyn Reporter>) {
        let shared = &*self.shared;
        let mut state = shared.state.lock();
        state.deadline = None;
        match reporter {
            Some(reporter) => state.flush(&shared.label, reporter),
            None => state.flush(&shared.label, shared.reporter.as_ref()),
        }
        if !state.paused {
            shared.arm(&mut state);
        }
    }

    /// Stop the timer task for good.
    ///
    /// Pending steps are not flushed; call [`report`](Meter::report) first
    /// to emit them. Steps and manual reports keep working afterwards.
    pub fn shutdown(&self) {
        let shared = &*self.shared;
        {
            let mut state = shared.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            state.deadline = None;
        }
        shared.shutdown.send_replace(true);
        tracing::debug!(label = %shared.label, "meter shut down");
    }

    /// Display label
    pub fn label(&self) -> &str {
        &self.shared.label
    }

    /// Current automatic flush period
    pub fn interval(&self) -> Duration {
        self.shared.state.lock().interval
    }

    /// Whether automatic reporting is paused
    pub fn is_paused(&self) -> bool {
        self.shared.state.lock().paused
    }

    /// Whether [`shutdown`](Meter::shutdown) was called
    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    /// Sum of steps since the last flush
    pub fn pending(&self) -> f64 {
        self.shared.state.lock().value
    }
}

impl fmt::Debug for Meter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Meter")
            .field("label", &self.shared.label)
            .field("interval", &state.interval)
            .field("value", &state.value)
            .field("paused", &state.paused)
            .field("closed", &state.closed)
            .finish()
    }
}

/// Fallible [`Meter`] construction
pub struct MeterBuilder {
    label: String,
    interval: Duration,
    reporter: Option<Arc<dyn Reporter>>,
    runtime: Option<Handle>,
}

impl MeterBuilder {
    /// Builder with a one second interval and the log reporter
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            interval: Duration::from_secs(1),
            reporter: None,
            runtime: None,
        }
    }

    /// Automatic flush period
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Reporter for automatic flushes
    pub fn reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Runtime hosting the timer task, instead of the current one
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Build the meter and start its timer
    pub fn build(self) -> MeterResult<Meter> {
        if self.interval.is_zero() {
            return Err(MeterError::ZeroInterval);
        }
        let handle = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| MeterError::NoRuntime)?,
        };
        let reporter = self
            .reporter
            .unwrap_or_else(|| Arc::new(LogReporter::new()));
        Ok(Meter::spawn(&handle, self.label, self.interval, reporter))
    }
}

async fn run_timer(
    shared: Weak<Shared>,
    rearm: Arc<Notify>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let deadline = match shared.upgrade() {
            Some(shared) => shared.state.lock().deadline,
            None => break,
        };

        tokio::select! {
            _ = sleep_until(deadline) => match shared.upgrade() {
                Some(shared) => shared.on_timer(),
                None => break,
            },
            _ = rearm.notified() => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    tracing::trace!("meter timer task exited");
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Report the configured interval when the measured timeframe is within
/// [`SNAP_TOLERANCE`] of it.
pub(crate) fn snap_timeframe(elapsed: Duration, interval: Duration) -> Duration {
    let drift = if elapsed > interval {
        elapsed - interval
    } else {
        interval - elapsed
    };
    if drift < SNAP_TOLERANCE {
        interval
    } else {
        elapsed
    }
}
