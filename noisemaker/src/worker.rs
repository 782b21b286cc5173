//! The hosted worker contract.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;

/// A long-running unit managed by the host's start/stop lifecycle.
///
/// The host is the sole caller: it spawns [`Worker::run`] on its own task at
/// startup, cancels the shared token at shutdown, and calls
/// [`Worker::dispose`] once the task has been joined.
#[async_trait]
pub trait Worker: Send + 'static {
    /// Stable identifier used in logs and shutdown reporting.
    fn name(&self) -> &str;

    /// Run until `shutdown` is cancelled. Returning `Err` means the worker's
    /// loop aborted; the host logs it and leaves the worker dead, so its
    /// metrics simply stop updating.
    async fn run(&mut self, shutdown: CancellationToken) -> Result<(), WorkerError>;

    /// Release the worker's instruments and trace sources. Must be
    /// idempotent: the host calls it once per worker, but instrument
    /// ownership also releases on drop.
    fn dispose(&mut self);
}
