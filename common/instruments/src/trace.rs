//! Named trace sources.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::Shared;

/// A named span factory registered on the registry.
///
/// `tracing` span names are static strings, so the operation name rides in
/// the span's `operation` field rather than the span identity. Dropping the
/// source releases it; [`TraceSource::release`] is idempotent.
pub struct TraceSource {
    name: String,
    released: AtomicBool,
    shared: Arc<Shared>,
}

impl TraceSource {
    pub(crate) fn new(name: String, shared: Arc<Shared>) -> Self {
        Self {
            name,
            released: AtomicBool::new(false),
            shared,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Open a span bounding one unit of work. Enter it for the duration of
    /// the work; dropping the entered guard closes the span, including on
    /// early exit. A released source yields a disabled span.
    pub fn span(&self, operation: &str) -> tracing::Span {
        if self.released.load(Ordering::Relaxed) {
            return tracing::Span::none();
        }
        tracing::info_span!("tick", source = %self.name, operation)
    }

    /// Unregister the source. Idempotent.
    pub fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut sources = self
            .shared
            .trace_sources
            .write()
            .expect("poisoned trace source lock");
        sources.remove(&self.name);
        tracing::debug!(source = %self.name, "trace source released");
    }
}

impl Drop for TraceSource {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for TraceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceSource")
            .field("name", &self.name)
            .field("released", &self.released.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
