//! Free-disk-space monitor worker.
//!
//! Registers a pull-based gauge reporting free bytes on the primary storage
//! volume. There is no loop of its own: the value is computed on demand when
//! the registry is collected, on the collecting context.

use std::path::Path;

use async_trait::async_trait;
use instruments::{InstrumentRegistry, Meter, ObservableGauge};
use sysinfo::Disks;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::WorkerError;
use crate::metrics_constants::{DISK_FREE_BYTES, SYSTEM_METER};
use crate::worker::Worker;

/// Failures while resolving the primary storage volume.
///
/// These surface through the gauge callback as explicit errors. A silent 0
/// would be indistinguishable from a full disk.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiskSpaceError {
    #[error("no root volume designator is known for this platform")]
    UnsupportedPlatform,

    #[error("no mounted volume matches the root designator '{0}'")]
    RootVolumeNotFound(String),
}

/// Root mount point designator for the current platform.
fn root_mount_point() -> Result<&'static Path, DiskSpaceError> {
    if cfg!(any(target_os = "linux", target_os = "macos")) {
        Ok(Path::new("/"))
    } else {
        // Multi-drive systems have no single well-known root; refusing beats
        // guessing.
        Err(DiskSpaceError::UnsupportedPlatform)
    }
}

/// Select the volume mounted at `root` from an enumerated list and return its
/// free space. Pure so the no-match path is testable without real disks.
fn free_space_at<'a, I>(volumes: I, root: &Path) -> Result<u64, DiskSpaceError>
where
    I: IntoIterator<Item = (&'a Path, u64)>,
{
    volumes
        .into_iter()
        .find(|(mount, _)| *mount == root)
        .map(|(_, free)| free)
        .ok_or_else(|| DiskSpaceError::RootVolumeNotFound(root.display().to_string()))
}

/// Free bytes on the primary volume. Runs inside the gauge callback.
pub fn free_disk_space() -> Result<u64, DiskSpaceError> {
    let root = root_mount_point()?;
    let disks = Disks::new_with_refreshed_list();
    free_space_at(
        disks
            .list()
            .iter()
            .map(|d| (d.mount_point(), d.available_space())),
        root,
    )
}

pub struct DiskMonitor {
    meter: Meter,
    gauge: ObservableGauge,
}

impl DiskMonitor {
    pub fn new(registry: &InstrumentRegistry) -> Result<Self, WorkerError> {
        let meter = registry.meter(SYSTEM_METER)?;
        let gauge = meter.observable_gauge(DISK_FREE_BYTES, "bytes", || {
            free_disk_space().map_err(Into::into)
        })?;
        Ok(Self { meter, gauge })
    }
}

#[async_trait]
impl Worker for DiskMonitor {
    fn name(&self) -> &str {
        "disk-monitor"
    }

    async fn run(&mut self, shutdown: CancellationToken) -> Result<(), WorkerError> {
        info!(
            instrument_enabled = self.gauge.is_enabled(),
            "disk space monitoring started"
        );
        shutdown.cancelled().await;
        Ok(())
    }

    fn dispose(&mut self) {
        self.meter.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_the_volume_mounted_at_root() {
        let volumes = [
            (Path::new("/boot"), 11u64),
            (Path::new("/"), 42u64),
            (Path::new("/home"), 7u64),
        ];
        let free = free_space_at(volumes.iter().copied(), Path::new("/")).unwrap();
        assert_eq!(free, 42);
    }

    #[test]
    fn missing_root_volume_is_an_explicit_error() {
        let volumes = [(Path::new("/boot"), 11u64), (Path::new("/home"), 7u64)];
        let err = free_space_at(volumes.iter().copied(), Path::new("/")).unwrap_err();
        assert_eq!(err, DiskSpaceError::RootVolumeNotFound("/".to_string()));
    }

    #[cfg(any(target_os = "linux", target_os = "macos"))]
    #[test]
    fn root_designator_resolves_on_unix() {
        assert_eq!(root_mount_point().unwrap(), Path::new("/"));
    }

    #[cfg(any(target_os = "linux", target_os = "macos"))]
    #[test]
    fn gauge_reports_a_value_for_the_real_root() {
        let registry = InstrumentRegistry::new();
        let _monitor = DiskMonitor::new(&registry).unwrap();

        let snapshot = registry.collect();
        let sample = snapshot
            .meter(SYSTEM_METER)
            .unwrap()
            .observable(DISK_FREE_BYTES)
            .unwrap();
        assert_eq!(sample.unit.as_deref(), Some("bytes"));
        assert!(sample.value.is_ok());
    }
}
