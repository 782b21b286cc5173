//! Periodic drain of the instrument registry into the process log.
//!
//! The telemetry pipeline proper is an external collaborator; what ships
//! here is the bootstrap-side drain. On a fixed period it collects the
//! registry and logs one record per instrument, so operators see the workers'
//! activity (and notice its absence) without any export surface. Failed pull
//! callbacks are logged at error severity rather than flattened to a value.

use std::time::Duration;

use instruments::{InstrumentRegistry, MetricsSnapshot};
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Run the snapshot reporter until `shutdown` is cancelled.
pub async fn run(registry: InstrumentRegistry, shutdown: CancellationToken, period: Duration) {
    let mut interval = time::interval_at(time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("snapshot reporter stopping");
                return;
            }
            _ = interval.tick() => log_snapshot(&registry.collect()),
        }
    }
}

fn log_snapshot(snapshot: &MetricsSnapshot) {
    for meter in &snapshot.meters {
        for counter in &meter.counters {
            info!(meter = %meter.meter, name = %counter.name, value = counter.value, "counter");
        }
        for hist in &meter.histograms {
            info!(
                meter = %meter.meter,
                name = %hist.name,
                count = hist.count,
                sum = hist.sum,
                min = hist.min,
                max = hist.max,
                "histogram"
            );
        }
        for observable in &meter.observables {
            match &observable.value {
                Ok(value) => info!(
                    meter = %meter.meter,
                    name = %observable.name,
                    value = *value,
                    unit = observable.unit.as_deref().unwrap_or(""),
                    "observable"
                ),
                Err(e) => error!(
                    meter = %meter.meter,
                    name = %observable.name,
                    error = %e,
                    "observable callback failed"
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn reporter_stops_on_cancellation() {
        let registry = InstrumentRegistry::new();
        let meter = registry.meter("ticker").unwrap();
        meter.counter("rolls").unwrap().add(1);

        let shutdown = CancellationToken::new();
        let task = tokio::spawn(run(
            registry,
            shutdown.clone(),
            Duration::from_secs(5),
        ));

        // Let a couple of reports happen, then cancel.
        tokio::time::sleep(Duration::from_secs(11)).await;
        shutdown.cancel();
        task.await.unwrap();
    }
}
