//! Shared health state for the /health endpoint.
//! Updated by the route handlers around each analysis run.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Shared health metrics. Written by handlers, read by /health.
#[derive(Default)]
pub struct HealthState {
    /// Unix milliseconds of the last completed dashboard analysis (0 = none).
    pub last_dashboard_at_ms: AtomicI64,
    /// Dashboard analyses completed since start.
    pub dashboard_runs: AtomicU64,
    /// Requests that failed because the upstream API could not be reached.
    pub upstream_failures: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_dashboard_run(&self, at_ms: i64) {
        self.last_dashboard_at_ms.store(at_ms, Ordering::Relaxed);
        self.dashboard_runs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_upstream_failures(&self) {
        self.upstream_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn last_dashboard_at_ms(&self) -> i64 {
        self.last_dashboard_at_ms.load(Ordering::Relaxed)
    }

    pub fn dashboard_runs(&self) -> u64 {
        self.dashboard_runs.load(Ordering::Relaxed)
    }

    pub fn upstream_failures(&self) -> u64 {
        self.upstream_failures.load(Ordering::Relaxed)
    }
}
