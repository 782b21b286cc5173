//! Fixed-period tick loop shared by the periodic workers.

use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Drive `on_tick` once per `period` until `shutdown` is cancelled.
///
/// The first tick fires one full period after entry, never immediately.
/// Waits are scheduled against the tick deadlines themselves, so a slow tick
/// does not shift the schedule, and ticks that were missed entirely are
/// skipped rather than delivered in a burst. Cancellation is only observed
/// while waiting: a tick that has started always runs to completion, and
/// after cancellation no further tick fires.
///
/// `on_tick` is synchronous: the wait for the next tick is the loop's only
/// suspension point. An `Err` from `on_tick` ends the loop and propagates to
/// the caller, which must log it; there is no retry.
pub async fn run<E, F>(
    period: Duration,
    shutdown: &CancellationToken,
    mut on_tick: F,
) -> Result<(), E>
where
    F: FnMut() -> Result<(), E>,
{
    let mut interval = time::interval_at(time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => return Ok(()),
            _ = interval.tick() => on_tick()?,
        }
    }
}
