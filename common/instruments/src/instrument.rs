//! Push and pull instrument handles.
//!
//! Handles are cheap clones over shared state and are safe to update from any
//! task. Pull handles carry no value of their own; the registered callback
//! produces it at collection time.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Monotonic push counter. Lock-free.
#[derive(Clone, Debug)]
pub struct Counter {
    pub(crate) value: Arc<AtomicU64>,
}

impl Counter {
    pub fn add(&self, delta: u64) {
        self.value.fetch_add(delta, Ordering::Relaxed);
    }
}

/// Running aggregate backing a [`Histogram`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct HistogramState {
    pub count: u64,
    pub sum: u64,
    pub min: Option<u64>,
    pub max: Option<u64>,
}

/// Push distribution instrument tracking count, sum, min and max.
#[derive(Clone, Debug)]
pub struct Histogram {
    pub(crate) state: Arc<Mutex<HistogramState>>,
}

impl Histogram {
    pub fn record(&self, value: u64) {
        let mut state = self.state.lock().expect("poisoned histogram lock");
        state.count += 1;
        state.sum += value;
        state.min = Some(state.min.map_or(value, |m| m.min(value)));
        state.max = Some(state.max.map_or(value, |m| m.max(value)));
    }
}

/// Pull-based monotonic counter. The value is computed by the callback
/// registered with [`Meter::observable_counter`](crate::Meter::observable_counter)
/// when the registry is collected.
#[derive(Debug)]
pub struct ObservableCounter {
    pub(crate) live: Arc<AtomicBool>,
}

impl ObservableCounter {
    /// True while the owning meter is registered.
    pub fn is_enabled(&self) -> bool {
        self.live.load(Ordering::Relaxed)
    }
}

/// Pull-based gauge. See [`ObservableCounter`].
#[derive(Debug)]
pub struct ObservableGauge {
    pub(crate) live: Arc<AtomicBool>,
}

impl ObservableGauge {
    /// True while the owning meter is registered.
    pub fn is_enabled(&self) -> bool {
        self.live.load(Ordering::Relaxed)
    }
}
