//! Worker host: concurrent start, coordinated stop.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::{HostError, WorkerError};
use crate::worker::Worker;

/// Owns the worker set and the process-wide cancellation signal.
///
/// The signal is created here at construction and transitions exactly once,
/// when [`RunningHost::stop`] is called; every worker observes the same
/// token. Workers are independent: one failing never prevents the clean
/// shutdown and disposal of the others.
pub struct Host {
    name: String,
    grace: Duration,
    shutdown: CancellationToken,
    workers: Vec<Box<dyn Worker>>,
}

impl Host {
    pub fn new(name: &str, grace: Duration) -> Self {
        Self {
            name: name.to_string(),
            grace,
            shutdown: CancellationToken::new(),
            workers: Vec::new(),
        }
    }

    /// The shared shutdown signal, for collaborators that want to observe it.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn add_worker(&mut self, worker: Box<dyn Worker>) {
        self.workers.push(worker);
    }

    /// Spawn every worker concurrently, each on its own task.
    ///
    /// A worker whose loop aborts is logged at error severity the moment it
    /// dies; the host does not restart it and its siblings keep running.
    pub fn start(self) -> RunningHost {
        let tasks: Vec<WorkerTask> = self
            .workers
            .into_iter()
            .map(|mut worker| {
                let name = worker.name().to_string();
                let task_name = name.clone();
                let token = self.shutdown.clone();
                let handle = tokio::spawn(async move {
                    let result = worker.run(token).await;
                    if let Err(e) = &result {
                        // Dead from here on; its metrics go stale.
                        error!(worker = %task_name, error = %e, "worker loop aborted");
                    }
                    (worker, result)
                });
                WorkerTask { name, handle }
            })
            .collect();

        info!(host = %self.name, workers = tasks.len(), "host started");
        RunningHost {
            name: self.name,
            grace: self.grace,
            shutdown: self.shutdown,
            tasks,
        }
    }
}

struct WorkerTask {
    name: String,
    handle: JoinHandle<(Box<dyn Worker>, Result<(), WorkerError>)>,
}

/// Handle over the started workers; consumed by [`RunningHost::stop`].
pub struct RunningHost {
    name: String,
    grace: Duration,
    shutdown: CancellationToken,
    tasks: Vec<WorkerTask>,
}

impl RunningHost {
    /// The shared shutdown signal, for collaborators that want to observe it.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Cancel the shared signal once, wait for every worker to stop within
    /// the grace period, then dispose each one.
    ///
    /// The grace period bounds the whole stop phase, not each worker.
    /// Failures (an aborted loop, a panic, a worker that outlives the grace
    /// period) are recorded and the first is returned, but only after every
    /// worker has been joined and disposed.
    pub async fn stop(self) -> Result<(), HostError> {
        info!(host = %self.name, "stopping workers");
        self.shutdown.cancel();

        let deadline = Instant::now() + self.grace;
        let mut first_failure: Option<HostError> = None;

        for task in self.tasks {
            let abort = task.handle.abort_handle();
            let remaining = deadline.saturating_duration_since(Instant::now());
            match tokio::time::timeout(remaining, task.handle).await {
                Ok(Ok((mut worker, result))) => {
                    match result {
                        Ok(()) => info!(worker = %task.name, "worker stopped"),
                        // Already logged when the loop aborted; just record it.
                        Err(e) => {
                            first_failure = first_failure.or(Some(HostError::WorkerFailed {
                                name: task.name.clone(),
                                source: e,
                            }));
                        }
                    }
                    worker.dispose();
                }
                Ok(Err(join_error)) => {
                    error!(worker = %task.name, error = %join_error, "worker task panicked");
                    first_failure = first_failure.or(Some(HostError::WorkerPanicked {
                        name: task.name.clone(),
                    }));
                }
                Err(_) => {
                    warn!(
                        worker = %task.name,
                        grace = ?self.grace,
                        "worker did not stop within the grace period"
                    );
                    abort.abort();
                    first_failure = first_failure.or(Some(HostError::StopTimeout {
                        name: task.name.clone(),
                    }));
                }
            }
        }

        match first_failure {
            None => {
                info!(host = %self.name, "host stopped cleanly");
                Ok(())
            }
            Some(e) => Err(e),
        }
    }
}
