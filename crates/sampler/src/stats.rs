//! Sampler Counters

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters advanced by the sampler, readable from anywhere without locking
#[derive(Debug, Default)]
pub struct Counters {
    updates: AtomicU64,
    alerts: AtomicU64,
    /// Reserved, nothing in the pipeline currently fails
    last_error: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub updates: u64,
    pub alerts: u64,
    pub last_error: u64,
}

impl Counters {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Account one produced sample (sampler only).
    ///
    /// `updates` is bumped before `alerts`; `snapshot` loads them in the
    /// opposite order, so readers never see more alerts than updates.
    pub(crate) fn record_sample(&self, crossed: bool) {
        self.updates.fetch_add(1, Ordering::Release);
        metrics::counter!("simtemp_samples_total").increment(1);
        if crossed {
            self.alerts.fetch_add(1, Ordering::Release);
            metrics::counter!("simtemp_alerts_total").increment(1);
        }
    }

    /// Total samples produced
    pub fn updates(&self) -> u64 {
        self.updates.load(Ordering::Acquire)
    }

    /// Samples flagged THRESHOLD_CROSSED
    pub fn alerts(&self) -> u64 {
        self.alerts.load(Ordering::Acquire)
    }

    /// Last recorded error code, 0 if none
    pub fn last_error(&self) -> u64 {
        self.last_error.load(Ordering::Acquire)
    }

    /// Read all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        let alerts = self.alerts();
        let updates = self.updates();
        StatsSnapshot {
            updates,
            alerts,
            last_error: self.last_error(),
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "updates={} alerts={} last_error={}",
            self.updates, self.alerts, self.last_error
        )
    }
}
