//! Counters for the query bridge.
//!
//! Anomalies that are contained rather than surfaced (malformed messages,
//! unmatched correlation ids, foreign traffic) stay observable here, and
//! sustained in-flight pressure shows up as a gap between `requests` and
//! the settled/timed-out counters instead of as a hard failure.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct BridgeMetrics {
    requests: AtomicU64,
    settled: AtomicU64,
    timeouts: AtomicU64,
    remote_failures: AtomicU64,
    publish_failures: AtomicU64,
    dropped_malformed: AtomicU64,
    dropped_foreign: AtomicU64,
    dropped_unmatched: AtomicU64,
}

/// Point-in-time copy of the counters, serializable for a metrics endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub settled: u64,
    pub timeouts: u64,
    pub remote_failures: u64,
    pub publish_failures: u64,
    pub dropped_malformed: u64,
    pub dropped_foreign: u64,
    pub dropped_unmatched: u64,
}

impl BridgeMetrics {
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_settled(&self) {
        self.settled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_remote_failure(&self) {
        self.remote_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_publish_failure(&self) {
        self.publish_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped_malformed(&self) {
        self.dropped_malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped_foreign(&self) {
        self.dropped_foreign.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped_unmatched(&self) {
        self.dropped_unmatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            settled: self.settled.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            remote_failures: self.remote_failures.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
            dropped_malformed: self.dropped_malformed.load(Ordering::Relaxed),
            dropped_foreign: self.dropped_foreign.load(Ordering::Relaxed),
            dropped_unmatched: self.dropped_unmatched.load(Ordering::Relaxed),
        }
    }
}
