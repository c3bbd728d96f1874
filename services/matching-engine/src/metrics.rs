//! Per-engine metrics
//!
//! Atomic counters plus a bounded ring of recent submit latencies.
//! The latency ring keeps the last 1000 samples; the snapshot reports
//! mean and p99 in microseconds.

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

const LATENCY_SAMPLES: usize = 1000;

/// Live counters for one symbol engine
#[derive(Debug, Default)]
pub struct EngineMetrics {
    orders_accepted: AtomicU64,
    orders_rejected: AtomicU64,
    orders_cancelled: AtomicU64,
    trades_executed: AtomicU64,
    persistence_lag: AtomicU64,
    persistence_failures: AtomicU64,
    health_degraded: AtomicBool,
    submit_latencies_us: Mutex<VecDeque<u64>>,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_accept(&self) {
        self.orders_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reject(&self) {
        self.orders_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancel(&self) {
        self.orders_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_trades(&self, count: u64) {
        self.trades_executed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_persistence_lag(&self) {
        self.persistence_lag.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persistence_failure(&self) {
        self.persistence_failures.fetch_add(1, Ordering::Relaxed);
        self.health_degraded.store(true, Ordering::Relaxed);
    }

    pub fn set_health_degraded(&self, degraded: bool) {
        self.health_degraded.store(degraded, Ordering::Relaxed);
    }

    pub fn record_submit_latency(&self, elapsed: Duration) {
        let mut samples = self
            .submit_latencies_us
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if samples.len() >= LATENCY_SAMPLES {
            samples.pop_front();
        }
        samples.push_back(elapsed.as_micros() as u64);
    }

    /// Point-in-time copy of all counters and latency statistics
    pub fn snapshot(&self) -> MetricsSnapshot {
        let samples = self
            .submit_latencies_us
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let (mean, p99) = if samples.is_empty() {
            (0.0, 0.0)
        } else {
            let mut sorted: Vec<u64> = samples.iter().copied().collect();
            sorted.sort_unstable();
            let sum: u64 = sorted.iter().sum();
            let mean = sum as f64 / sorted.len() as f64;
            let index = ((sorted.len() as f64) * 0.99).ceil() as usize;
            let p99 = sorted[index.min(sorted.len()) - 1] as f64;
            (mean, p99)
        };

        MetricsSnapshot {
            orders_accepted: self.orders_accepted.load(Ordering::Relaxed),
            orders_rejected: self.orders_rejected.load(Ordering::Relaxed),
            orders_cancelled: self.orders_cancelled.load(Ordering::Relaxed),
            trades_executed: self.trades_executed.load(Ordering::Relaxed),
            persistence_lag: self.persistence_lag.load(Ordering::Relaxed),
            persistence_failures: self.persistence_failures.load(Ordering::Relaxed),
            health_degraded: self.health_degraded.load(Ordering::Relaxed),
            mean_submit_latency_us: mean,
            p99_submit_latency_us: p99,
        }
    }
}

/// Serializable metrics view for the query surface
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub orders_accepted: u64,
    pub orders_rejected: u64,
    pub orders_cancelled: u64,
    pub trades_executed: u64,
    pub persistence_lag: u64,
    pub persistence_failures: u64,
    pub health_degraded: bool,
    pub mean_submit_latency_us: f64,
    pub p99_submit_latency_us: f64,
}
