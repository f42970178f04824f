//! # Timeout Supervisor
//!
//! One background timer task per in-flight request. On expiry the task
//! calls [`CorrelationRegistry::expire`], which re-checks presence, so a
//! timer that loses the race against the response dispatcher is a no-op.
//! The returned [`AbortHandle`] lets the registry cancel the timer when a
//! response wins, keeping the number of live timers bounded by the number
//! of in-flight requests.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::AbortHandle;
use tracing::warn;

use super::metrics::BridgeMetrics;
use super::registry::{CorrelationRegistry, RequestId};

pub struct TimeoutSupervisor<T> {
    registry: Arc<CorrelationRegistry<T>>,
    timeout: Duration,
    metrics: Arc<BridgeMetrics>,
}

impl<T: Send + Sync + 'static> TimeoutSupervisor<T> {
    pub fn new(
        registry: Arc<CorrelationRegistry<T>>,
        timeout: Duration,
        metrics: Arc<BridgeMetrics>,
    ) -> Self {
        Self {
            registry,
            timeout,
            metrics,
        }
    }

    /// Starts the expiry timer for a registered request.
    pub fn watch(&self, request_id: RequestId) -> AbortHandle {
        let registry = self.registry.clone();
        let metrics = self.metrics.clone();
        let timeout = self.timeout;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if registry.expire(&request_id) {
                metrics.record_timeout();
                warn!(request_id, timeout_ms = timeout.as_millis() as u64, "request timed out");
            }
        });
        handle.abort_handle()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
