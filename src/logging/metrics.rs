use std::sync::{Arc, RwLock};

/// Metrics interface allowing pluggable sinks. Nothing is recorded until one is installed.
pub trait StreamConfigMetrics: Send + Sync {
    /// Record that a requested stream name matched no entry.
    fn record_lookup_miss(&self, _stream: &str) {}
    /// Record that an entry was excluded by settings constraints.
    fn record_constraint_rejected(&self, _stream: &str) {}
    /// Record a completed query; `requested` is `None` when all streams were selected.
    fn record_query(&self, _requested: Option<usize>, _returned: usize) {}
}

static METRICS_SINK: RwLock<Option<Arc<dyn StreamConfigMetrics>>> = RwLock::new(None);

fn with_sink(op: impl FnOnce(&dyn StreamConfigMetrics)) {
    let guard = METRICS_SINK
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(sink) = guard.as_ref() {
        op(sink.as_ref());
    }
}

/// Install a metrics sink, returning the one it replaces.
pub fn install_metrics(
    metrics: Arc<dyn StreamConfigMetrics>,
) -> Option<Arc<dyn StreamConfigMetrics>> {
    METRICS_SINK
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .replace(metrics)
}

pub fn record_lookup_miss(stream: &str) {
    with_sink(|sink| sink.record_lookup_miss(stream));
}

pub fn record_constraint_rejected(stream: &str) {
    with_sink(|sink| sink.record_constraint_rejected(stream));
}

pub fn record_query(requested: Option<usize>, returned: usize) {
    with_sink(|sink| sink.record_query(requested, returned));
}
