//! Synthetic load driver

use crate::config::{DriverConfig, Phase};
use pace_meter::Meter;
use tokio::time::{interval, sleep, Instant, MissedTickBehavior};

/// Run every load phase against `meter`, then idle.
///
/// Returns the number of steps recorded.
pub async fn run(meter: &Meter, config: &DriverConfig) -> u64 {
    let mut total = 0;
    for (i, phase) in config.phases.iter().enumerate() {
        tracing::debug!(
            phase = i,
            every = ?phase.every(),
            length = ?phase.length(),
            "load phase started"
        );
        total += push(meter, phase).await;
    }

    if !config.idle().is_zero() {
        tracing::debug!(idle = ?config.idle(), "load finished, idling");
        sleep(config.idle()).await;
    }
    total
}

/// Step once per `phase.every()` until the phase length has passed
async fn push(meter: &Meter, phase: &Phase) -> u64 {
    let mut tick = interval(phase.every());
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let start = Instant::now();
    let mut steps = 0;
    loop {
        tick.tick().await;
        meter.step(1.0);
        steps += 1;
        if start.elapsed() > phase.length() {
            break;
        }
    }
    steps
}
