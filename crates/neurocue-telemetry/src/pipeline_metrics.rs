use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared metrics for cross-thread pipeline monitoring. Cheap to clone;
/// every copy observes the same counters.
#[derive(Clone, Default)]
pub struct PipelineMetrics {
    // Throughput counters
    pub samples_recorded: Arc<AtomicU64>,
    pub markers_recorded: Arc<AtomicU64>,

    // Error tracking
    pub samples_rejected: Arc<AtomicU64>, // channel-count mismatches
    pub read_failures: Arc<AtomicU64>,    // transient poll errors, both sources

    // Burst observation: largest marker batch drained in one iteration
    pub max_marker_burst: Arc<AtomicU64>,

    // Label currently being assigned to incoming samples
    pub current_label: Arc<RwLock<String>>,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sample(&self) {
        self.samples_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_marker(&self) {
        self.markers_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_sample(&self) {
        self.samples_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_read_failure(&self) {
        self.read_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_marker_burst(&self, size: u64) {
        self.max_marker_burst.fetch_max(size, Ordering::Relaxed);
    }

    pub fn set_current_label(&self, label: &str) {
        let mut current = self.current_label.write();
        if *current != label {
            current.clear();
            current.push_str(label);
        }
    }

    pub fn snapshot_label(&self) -> String {
        self.current_label.read().clone()
    }
}
