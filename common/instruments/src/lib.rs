//! In-process instrumentation registry.
//!
//! Workers create a named [`Meter`] once at construction, register their
//! instruments on it, and release it exactly once on disposal. Push
//! instruments ([`Counter`], [`Histogram`]) are updated from the worker's own
//! task; pull instruments ([`ObservableCounter`], [`ObservableGauge`]) hold a
//! callback that only runs when the registry is drained with
//! [`InstrumentRegistry::collect`], on the collecting context rather than the
//! worker's loop. Named [`TraceSource`]s live alongside the meters and open
//! spans bounding a worker's units of work.
//!
//! Instrument names are unique within a meter and meter names are unique
//! among live meters; duplicates are construction-time errors, so a running
//! worker can never race another registration under the same name.

mod error;
mod instrument;
mod snapshot;
mod trace;

pub use error::{InstrumentError, ObserveError};
pub use instrument::{Counter, Histogram, ObservableCounter, ObservableGauge};
pub use snapshot::{
    CounterSample, HistogramSample, MeterSnapshot, MetricsSnapshot, ObservableKind,
    ObservableSample,
};
pub use trace::TraceSource;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use instrument::HistogramState;

/// Value produced by a pull-based instrument's callback.
pub type CallbackResult = Result<u64, Box<dyn std::error::Error + Send + Sync>>;

type Callback = Box<dyn Fn() -> CallbackResult + Send + Sync>;

struct ObservableState {
    name: String,
    unit: Option<String>,
    kind: ObservableKind,
    callback: Callback,
}

#[derive(Default)]
struct MeterState {
    counters: Vec<(String, Arc<AtomicU64>)>,
    histograms: Vec<(String, Arc<Mutex<HistogramState>>)>,
    observables: Vec<ObservableState>,
}

impl MeterState {
    fn has_instrument(&self, name: &str) -> bool {
        self.counters.iter().any(|(n, _)| n == name)
            || self.histograms.iter().any(|(n, _)| n == name)
            || self.observables.iter().any(|o| o.name == name)
    }
}

#[derive(Default)]
pub(crate) struct Shared {
    meters: RwLock<HashMap<String, MeterState>>,
    pub(crate) trace_sources: RwLock<HashSet<String>>,
}

/// Process-wide registry handle. Cheap to clone; every clone sees the same
/// meters and trace sources.
#[derive(Clone, Default)]
pub struct InstrumentRegistry {
    shared: Arc<Shared>,
}

impl InstrumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a named meter. The name stays reserved until the meter is
    /// released.
    pub fn meter(&self, name: &str) -> Result<Meter, InstrumentError> {
        let mut meters = self
            .shared
            .meters
            .write()
            .expect("poisoned instrument registry lock");
        if meters.contains_key(name) {
            return Err(InstrumentError::MeterExists(name.to_string()));
        }
        meters.insert(name.to_string(), MeterState::default());
        Ok(Meter {
            name: name.to_string(),
            live: Arc::new(AtomicBool::new(true)),
            shared: Arc::clone(&self.shared),
        })
    }

    /// Register a named trace source. The name stays reserved until the
    /// source is released.
    pub fn trace_source(&self, name: &str) -> Result<TraceSource, InstrumentError> {
        let mut sources = self
            .shared
            .trace_sources
            .write()
            .expect("poisoned trace source lock");
        if !sources.insert(name.to_string()) {
            return Err(InstrumentError::TraceSourceExists(name.to_string()));
        }
        Ok(TraceSource::new(name.to_string(), Arc::clone(&self.shared)))
    }

    /// Drain a point-in-time snapshot of every live instrument.
    ///
    /// Pull callbacks run here, on the collecting context. A failing callback
    /// is carried in the snapshot as an explicit [`ObserveError`]; it is never
    /// flattened to a default value. Callbacks must not register or release
    /// instruments: the registry lock is held while they run.
    pub fn collect(&self) -> MetricsSnapshot {
        let meters = self
            .shared
            .meters
            .read()
            .expect("poisoned instrument registry lock");
        let mut out: Vec<MeterSnapshot> = meters
            .iter()
            .map(|(name, state)| MeterSnapshot {
                meter: name.clone(),
                counters: state
                    .counters
                    .iter()
                    .map(|(n, v)| CounterSample {
                        name: n.clone(),
                        value: v.load(Ordering::Relaxed),
                    })
                    .collect(),
                histograms: state
                    .histograms
                    .iter()
                    .map(|(n, h)| {
                        let state = *h.lock().expect("poisoned histogram lock");
                        HistogramSample {
                            name: n.clone(),
                            count: state.count,
                            sum: state.sum,
                            min: state.min,
                            max: state.max,
                        }
                    })
                    .collect(),
                observables: state
                    .observables
                    .iter()
                    .map(|o| ObservableSample {
                        name: o.name.clone(),
                        unit: o.unit.clone(),
                        kind: o.kind,
                        value: (o.callback)().map_err(|e| ObserveError::new(e.to_string())),
                    })
                    .collect(),
            })
            .collect();
        out.sort_by(|a, b| a.meter.cmp(&b.meter));
        MetricsSnapshot { meters: out }
    }
}

/// A named instrument scope owned by one worker.
///
/// Dropping the meter releases it, so instruments are unregistered even when
/// a worker dies without a clean disposal. [`Meter::release`] is idempotent.
pub struct Meter {
    name: String,
    live: Arc<AtomicBool>,
    shared: Arc<Shared>,
}

impl Meter {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a monotonic push counter.
    pub fn counter(&self, name: &str) -> Result<Counter, InstrumentError> {
        self.with_state(name, |state| {
            let value = Arc::new(AtomicU64::new(0));
            state.counters.push((name.to_string(), Arc::clone(&value)));
            Counter { value }
        })
    }

    /// Register a push distribution instrument.
    pub fn histogram(&self, name: &str) -> Result<Histogram, InstrumentError> {
        self.with_state(name, |state| {
            let hist = Arc::new(Mutex::new(HistogramState::default()));
            state.histograms.push((name.to_string(), Arc::clone(&hist)));
            Histogram { state: hist }
        })
    }

    /// Register a pull-based counter whose value is computed by `callback`
    /// at collection time.
    pub fn observable_counter<F>(
        &self,
        name: &str,
        callback: F,
    ) -> Result<ObservableCounter, InstrumentError>
    where
        F: Fn() -> CallbackResult + Send + Sync + 'static,
    {
        self.with_state(name, |state| {
            state.observables.push(ObservableState {
                name: name.to_string(),
                unit: None,
                kind: ObservableKind::Counter,
                callback: Box::new(callback),
            });
            ObservableCounter {
                live: Arc::clone(&self.live),
            }
        })
    }

    /// Register a pull-based gauge whose value is computed by `callback` at
    /// collection time.
    pub fn observable_gauge<F>(
        &self,
        name: &str,
        unit: &str,
        callback: F,
    ) -> Result<ObservableGauge, InstrumentError>
    where
        F: Fn() -> CallbackResult + Send + Sync + 'static,
    {
        self.with_state(name, |state| {
            state.observables.push(ObservableState {
                name: name.to_string(),
                unit: Some(unit.to_string()),
                kind: ObservableKind::Gauge,
                callback: Box::new(callback),
            });
            ObservableGauge {
                live: Arc::clone(&self.live),
            }
        })
    }

    /// Unregister the meter and every instrument on it. Idempotent: repeated
    /// calls are no-ops. Instrument handles held by the worker keep working
    /// on their own state but no longer appear in snapshots.
    pub fn release(&self) {
        if !self.live.swap(false, Ordering::SeqCst) {
            return;
        }
        let mut meters = self
            .shared
            .meters
            .write()
            .expect("poisoned instrument registry lock");
        meters.remove(&self.name);
        tracing::debug!(meter = %self.name, "meter released");
    }

    fn with_state<T>(
        &self,
        instrument: &str,
        register: impl FnOnce(&mut MeterState) -> T,
    ) -> Result<T, InstrumentError> {
        if !self.live.load(Ordering::Relaxed) {
            return Err(InstrumentError::MeterReleased(self.name.clone()));
        }
        let mut meters = self
            .shared
            .meters
            .write()
            .expect("poisoned instrument registry lock");
        let state = meters
            .get_mut(&self.name)
            .ok_or_else(|| InstrumentError::MeterReleased(self.name.clone()))?;
        if state.has_instrument(instrument) {
            return Err(InstrumentError::InstrumentExists {
                meter: self.name.clone(),
                name: instrument.to_string(),
            });
        }
        Ok(register(state))
    }
}

impl Drop for Meter {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Meter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Meter")
            .field("name", &self.name)
            .field("live", &self.live.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for InstrumentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let meter_count = self
            .shared
            .meters
            .try_read()
            .map(|m| m.len())
            .unwrap_or(0);
        f.debug_struct("InstrumentRegistry")
            .field("meter_count", &meter_count)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meter_names_are_unique_while_live() {
        let registry = InstrumentRegistry::new();
        let meter = registry.meter("ticker").unwrap();
        assert_eq!(
            registry.meter("ticker").unwrap_err(),
            InstrumentError::MeterExists("ticker".to_string())
        );

        // The name is free again once the meter is released.
        meter.release();
        assert!(registry.meter("ticker").is_ok());
    }

    #[test]
    fn duplicate_instrument_is_a_construction_error() {
        let registry = InstrumentRegistry::new();
        let meter = registry.meter("ticker").unwrap();
        meter.counter("rolls").unwrap();

        // Same name rejected across instrument kinds.
        let err = meter.histogram("rolls").unwrap_err();
        assert_eq!(
            err,
            InstrumentError::InstrumentExists {
                meter: "ticker".to_string(),
                name: "rolls".to_string(),
            }
        );
    }

    #[test]
    fn counters_and_histograms_aggregate() {
        let registry = InstrumentRegistry::new();
        let meter = registry.meter("ticker").unwrap();
        let counter = meter.counter("rolls").unwrap();
        let hist = meter.histogram("dice").unwrap();

        counter.add(2);
        counter.add(1);
        hist.record(4);
        hist.record(1);
        hist.record(6);

        let snapshot = registry.collect();
        let meter_snap = snapshot.meter("ticker").unwrap();
        assert_eq!(meter_snap.counter("rolls").unwrap().value, 3);

        let dice = meter_snap.histogram("dice").unwrap();
        assert_eq!(dice.count, 3);
        assert_eq!(dice.sum, 11);
        assert_eq!(dice.min, Some(1));
        assert_eq!(dice.max, Some(6));
    }

    #[test]
    fn observable_callbacks_run_on_collect() {
        let registry = InstrumentRegistry::new();
        let meter = registry.meter("ticker").unwrap();
        let rolled = Arc::new(AtomicU64::new(0));
        let observed = Arc::clone(&rolled);
        meter
            .observable_counter("rolled", move || Ok(observed.load(Ordering::Relaxed)))
            .unwrap();

        rolled.store(5, Ordering::Relaxed);
        let sample = registry.collect();
        let sample = sample.meter("ticker").unwrap().observable("rolled").unwrap().clone();
        assert_eq!(sample.kind, ObservableKind::Counter);
        assert_eq!(sample.value, Ok(5));

        rolled.store(7, Ordering::Relaxed);
        let sample = registry.collect();
        assert_eq!(
            sample.meter("ticker").unwrap().observable("rolled").unwrap().value,
            Ok(7)
        );
    }

    #[test]
    fn failing_callback_surfaces_as_error() {
        let registry = InstrumentRegistry::new();
        let meter = registry.meter("system").unwrap();
        meter
            .observable_gauge("disk_free", "bytes", || Err("no root volume".into()))
            .unwrap();

        let snapshot = registry.collect();
        let sample = snapshot.meter("system").unwrap().observable("disk_free").unwrap();
        assert_eq!(sample.unit.as_deref(), Some("bytes"));
        let err = sample.value.clone().unwrap_err();
        assert_eq!(err.message(), "no root volume");
    }

    #[test]
    fn released_meter_is_dropped_from_snapshots() {
        let registry = InstrumentRegistry::new();
        let meter = registry.meter("ticker").unwrap();
        let counter = meter.counter("rolls").unwrap();
        let gauge = meter
            .observable_gauge("free", "bytes", || Ok(1))
            .unwrap();
        counter.add(1);
        assert!(gauge.is_enabled());
        assert!(registry.collect().meter("ticker").is_some());

        meter.release();
        meter.release();
        assert!(!gauge.is_enabled());
        assert!(registry.collect().meter("ticker").is_none());

        // Updating a handle after release is harmless; registering is not.
        counter.add(1);
        assert_eq!(
            meter.counter("more").unwrap_err(),
            InstrumentError::MeterReleased("ticker".to_string())
        );
    }

    #[test]
    fn dropping_a_meter_releases_it() {
        let registry = InstrumentRegistry::new();
        {
            let meter = registry.meter("ticker").unwrap();
            meter.counter("rolls").unwrap();
            assert!(registry.collect().meter("ticker").is_some());
        }
        assert!(registry.collect().meter("ticker").is_none());
    }

    #[test]
    fn trace_source_names_are_unique_and_released() {
        let registry = InstrumentRegistry::new();
        let source = registry.trace_source("ticker").unwrap();
        assert_eq!(source.name(), "ticker");
        assert_eq!(
            registry.trace_source("ticker").unwrap_err(),
            InstrumentError::TraceSourceExists("ticker".to_string())
        );

        source.release();
        source.release();
        // A released source never emits; its name is free for re-registration.
        assert!(source.span("dice_roll").is_none());
        assert!(registry.trace_source("ticker").is_ok());
    }
}
