//! Dice-rolling ticker worker.
//!
//! Once per period this worker rolls a die, records the value into a
//! histogram, bumps a push counter, and bumps an atomic cumulative count that
//! a pull-based counter reads at collection time. Each roll is bounded by a
//! trace span and logged with the `dice` field.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use instruments::{Counter, Histogram, InstrumentRegistry, Meter, TraceSource};
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::WorkerError;
use crate::metrics_constants::{DICE_ROLLS, ROLLS_OBSERVED, ROLL_COUNT, TICKER_METER};
use crate::scheduler;
use crate::worker::Worker;

pub struct TickerWorker {
    period: Duration,
    meter: Meter,
    traces: TraceSource,
    rolls: Histogram,
    roll_count: Counter,
    rolled: Arc<AtomicU64>,
}

impl TickerWorker {
    /// Register the worker's meter, instruments, and trace source.
    ///
    /// The observable counter's callback only ever loads the shared atomic;
    /// the mutable side stays with the tick loop.
    pub fn new(registry: &InstrumentRegistry, period: Duration) -> Result<Self, WorkerError> {
        let meter = registry.meter(TICKER_METER)?;
        let traces = registry.trace_source(TICKER_METER)?;
        let rolls = meter.histogram(DICE_ROLLS)?;
        let roll_count = meter.counter(ROLL_COUNT)?;

        let rolled = Arc::new(AtomicU64::new(0));
        let observed = Arc::clone(&rolled);
        meter.observable_counter(ROLLS_OBSERVED, move || {
            Ok(observed.load(Ordering::Relaxed))
        })?;

        Ok(Self {
            period,
            meter,
            traces,
            rolls,
            roll_count,
            rolled,
        })
    }

    fn tick(&self) -> Result<(), WorkerError> {
        let span = self.traces.span("dice_roll");
        let _guard = span.enter();

        let dice: u64 = rand::thread_rng().gen_range(1..=6);
        self.rolled.fetch_add(1, Ordering::Relaxed);
        self.roll_count.add(1);
        self.rolls.record(dice);
        info!(dice, "rolled the dice");
        Ok(())
    }
}

#[async_trait]
impl Worker for TickerWorker {
    fn name(&self) -> &str {
        "ticker"
    }

    async fn run(&mut self, shutdown: CancellationToken) -> Result<(), WorkerError> {
        scheduler::run(self.period, &shutdown, || self.tick()).await
    }

    fn dispose(&mut self) {
        self.meter.release();
        self.traces.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_record_one_sample_each_in_range() {
        let registry = InstrumentRegistry::new();
        let worker = TickerWorker::new(&registry, Duration::from_secs(1)).unwrap();

        for _ in 0..25 {
            worker.tick().unwrap();
        }

        let snapshot = registry.collect();
        let meter = snapshot.meter(TICKER_METER).unwrap();

        let dice = meter.histogram(DICE_ROLLS).unwrap();
        assert_eq!(dice.count, 25);
        assert!(dice.min.unwrap() >= 1);
        assert!(dice.max.unwrap() <= 6);

        assert_eq!(meter.counter(ROLL_COUNT).unwrap().value, 25);
        // The pull-based counter reads the same cumulative state.
        assert_eq!(meter.observable(ROLLS_OBSERVED).unwrap().value, Ok(25));
    }

    #[test]
    fn dispose_twice_is_harmless() {
        let registry = InstrumentRegistry::new();
        let mut worker = TickerWorker::new(&registry, Duration::from_secs(1)).unwrap();
        worker.tick().unwrap();

        worker.dispose();
        worker.dispose();
        assert!(registry.collect().meter(TICKER_METER).is_none());

        // The names are free again for a replacement worker.
        assert!(TickerWorker::new(&registry, Duration::from_secs(1)).is_ok());
    }
}
