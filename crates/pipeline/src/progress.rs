//! Run progress notifications.

/// Receives `(current, total)` updates while a dataset is scanned.
///
/// Fire-and-forget: implementations must not fail and have no effect on
/// the counts.
pub trait ProgressSink: Send + Sync {
    fn report(&self, dataset: &str, current: usize, total: usize);
}

/// Logs every update at `info` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn report(&self, dataset: &str, current: usize, total: usize) {
        tracing::info!(dataset = %dataset, current, total, "Scan progress");
    }
}

/// Discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _dataset: &str, _current: usize, _total: usize) {}
}
