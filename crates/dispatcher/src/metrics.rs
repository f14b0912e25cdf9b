//! Dispatcher counters for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters shared by the submission and poll paths
#[derive(Debug, Default)]
pub struct DispatcherMetrics {
    /// Commands accepted by the engine
    submitted: AtomicU64,
    /// Completions handed back to callers
    released: AtomicU64,
    /// Poll calls that returned not-ready
    not_ready: AtomicU64,
    /// Completions pulled from engine channels
    drained: AtomicU64,
    /// Refused reorder inserts and capacity overruns
    protocol_violations: AtomicU64,
    /// Engine refusals
    engine_errors: AtomicU64,
    /// Policy conflicts and unavailable channels
    rejected: AtomicU64,
    /// Largest reorder buffer occupancy seen
    peak_buffered: AtomicUsize,
}

impl DispatcherMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    pub fn inc_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn released(&self) -> u64 {
        self.released.load(Ordering::Relaxed)
    }

    pub fn inc_released(&self) {
        self.released.fetch_add(1, Ordering::Relaxed);
    }

    pub fn not_ready(&self) -> u64 {
        self.not_ready.load(Ordering::Relaxed)
    }

    pub fn inc_not_ready(&self) {
        self.not_ready.fetch_add(1, Ordering::Relaxed);
    }

    pub fn drained(&self) -> u64 {
        self.drained.load(Ordering::Relaxed)
    }

    pub fn inc_drained(&self) {
        self.drained.fetch_add(1, Ordering::Relaxed);
    }

    pub fn protocol_violations(&self) -> u64 {
        self.protocol_violations.load(Ordering::Relaxed)
    }

    pub fn inc_protocol_violations(&self) {
        self.protocol_violations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn engine_errors(&self) -> u64 {
        self.engine_errors.load(Ordering::Relaxed)
    }

    pub fn inc_engine_errors(&self) {
        self.engine_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn inc_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn peak_buffered(&self) -> usize {
        self.peak_buffered.load(Ordering::Relaxed)
    }

    /// Raise the occupancy high-water mark
    pub fn observe_buffered(&self, buffered: usize) {
        self.peak_buffered.fetch_max(buffered, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            submitted: self.submitted(),
            released: self.released(),
            not_ready: self.not_ready(),
            drained: self.drained(),
            protocol_violations: self.protocol_violations(),
            engine_errors: self.engine_errors(),
            rejected: self.rejected(),
            peak_buffered: self.peak_buffered(),
        }
    }
}

/// Snapshot of dispatcher metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub submitted: u64,
    pub released: u64,
    pub not_ready: u64,
    pub drained: u64,
    pub protocol_violations: u64,
    pub engine_errors: u64,
    pub rejected: u64,
    pub peak_buffered: usize,
}
