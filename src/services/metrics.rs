use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters owned by a single gate.
#[derive(Debug, Default)]
pub struct GateMetrics {
    admissions: AtomicU64,
    waits: AtomicU64,
    cancellations: AtomicU64,
    releases: AtomicU64,
}

impl GateMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_admissions(&self) {
        self.admissions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_waits(&self) {
        self.waits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_cancellations(&self) {
        self.cancellations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_releases(&self) {
        self.releases.fetch_add(1, Ordering::Relaxed);
    }

    pub fn admissions(&self) -> u64 {
        self.admissions.load(Ordering::Relaxed)
    }

    pub fn cancellations(&self) -> u64 {
        self.cancellations.load(Ordering::Relaxed)
    }

    pub fn get_stats(&self) -> HashMap<String, u64> {
        let mut stats = HashMap::new();
        stats.insert("admissions".to_string(), self.admissions());
        stats.insert("waits".to_string(), self.waits.load(Ordering::Relaxed));
        stats.insert("cancellations".to_string(), self.cancellations());
        stats.insert("releases".to_string(), self.releases.load(Ordering::Relaxed));
        stats
    }
}
