//! Worker and host error types.

use instruments::InstrumentError;
use thiserror::Error;

/// Errors a worker can produce at construction or from its run loop.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Instrument registration was rejected (duplicate name or released meter).
    #[error(transparent)]
    Instrument(#[from] InstrumentError),

    /// A tick's unit of work failed. The loop does not survive this; the
    /// host logs it and leaves the worker dead.
    #[error("tick failed: {0}")]
    Tick(String),
}

/// Errors reported by [`RunningHost::stop`](crate::host::RunningHost::stop).
#[derive(Debug, Error)]
pub enum HostError {
    #[error("worker '{name}' failed: {source}")]
    WorkerFailed {
        name: String,
        #[source]
        source: WorkerError,
    },

    #[error("worker '{name}' panicked")]
    WorkerPanicked { name: String },

    #[error("worker '{name}' did not stop within the shutdown grace period")]
    StopTimeout { name: String },
}
