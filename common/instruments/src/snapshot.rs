//! Point-in-time view of every live instrument, produced by
//! [`InstrumentRegistry::collect`](crate::InstrumentRegistry::collect).

use crate::ObserveError;

/// Which pull-based instrument kind produced a sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObservableKind {
    Counter,
    Gauge,
}

/// All live meters, sorted by name.
#[derive(Clone, Debug, Default)]
pub struct MetricsSnapshot {
    pub meters: Vec<MeterSnapshot>,
}

impl MetricsSnapshot {
    pub fn meter(&self, name: &str) -> Option<&MeterSnapshot> {
        self.meters.iter().find(|m| m.meter == name)
    }
}

/// One meter's instruments, in registration order.
#[derive(Clone, Debug)]
pub struct MeterSnapshot {
    pub meter: String,
    pub counters: Vec<CounterSample>,
    pub histograms: Vec<HistogramSample>,
    pub observables: Vec<ObservableSample>,
}

impl MeterSnapshot {
    pub fn counter(&self, name: &str) -> Option<&CounterSample> {
        self.counters.iter().find(|c| c.name == name)
    }

    pub fn histogram(&self, name: &str) -> Option<&HistogramSample> {
        self.histograms.iter().find(|h| h.name == name)
    }

    pub fn observable(&self, name: &str) -> Option<&ObservableSample> {
        self.observables.iter().find(|o| o.name == name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CounterSample {
    pub name: String,
    pub value: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistogramSample {
    pub name: String,
    pub count: u64,
    pub sum: u64,
    pub min: Option<u64>,
    pub max: Option<u64>,
}

/// A pull sample. A failing callback is carried as an error so the drain can
/// report it explicitly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObservableSample {
    pub name: String,
    pub unit: Option<String>,
    pub kind: ObservableKind,
    pub value: Result<u64, ObserveError>,
}
