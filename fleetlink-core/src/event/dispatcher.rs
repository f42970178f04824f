//! # Response Dispatcher
//!
//! The single long-lived subscriber on the vehicle response topic. Each
//! inbound message is parsed defensively and routed to its pending entry.
//! Anything that cannot be routed (malformed JSON, foreign event types,
//! correlation ids with no pending entry) is logged, counted and dropped,
//! so one bad message never blocks the loop or any caller.
//!
//! A dispatcher that cannot subscribe retries with capped exponential
//! backoff and stays not-ready; health checks must treat a not-ready
//! dispatcher as a failing service, because no outstanding or future
//! request can ever settle without it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::config::BridgeConfig;
use crate::model::Vehicle;

use super::bus::{MessageBus, MessageStream};
use super::envelope::{EventEnvelope, EventType, VehicleDataResponse};
use super::metrics::BridgeMetrics;
use super::registry::{CorrelationRegistry, RequestError};

pub struct ResponseDispatcher {
    bus: Arc<dyn MessageBus>,
    registry: Arc<CorrelationRegistry<Vec<Vehicle>>>,
    metrics: Arc<BridgeMetrics>,
    topic: String,
    initial_backoff: Duration,
    max_backoff: Duration,
    ready: AtomicBool,
}

impl ResponseDispatcher {
    pub fn new(
        bus: Arc<dyn MessageBus>,
        registry: Arc<CorrelationRegistry<Vec<Vehicle>>>,
        metrics: Arc<BridgeMetrics>,
        config: &BridgeConfig,
    ) -> Self {
        Self {
            bus,
            registry,
            metrics,
            topic: config.vehicle_response_topic.clone(),
            initial_backoff: config.subscribe_initial_backoff,
            max_backoff: config.subscribe_max_backoff,
            ready: AtomicBool::new(false),
        }
    }

    /// Whether the dispatcher holds a live subscription. False before the
    /// first successful subscribe and after the stream ends.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Runs the consumption loop on a background task.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let dispatcher = self.clone();
        tokio::spawn(async move { dispatcher.run().await })
    }

    /// Subscribes (retrying with backoff) and consumes the response topic
    /// sequentially until the stream ends.
    pub async fn run(&self) {
        let mut stream = self.subscribe_with_backoff().await;
        self.ready.store(true, Ordering::SeqCst);
        info!(topic = %self.topic, "response dispatcher started");

        while let Some(payload) = stream.next().await {
            self.handle_message(&payload);
        }

        self.ready.store(false, Ordering::SeqCst);
        warn!(topic = %self.topic, "response stream ended, dispatcher stopped");
    }

    async fn subscribe_with_backoff(&self) -> MessageStream {
        let mut backoff = self.initial_backoff;
        loop {
            match self.bus.subscribe(&self.topic).await {
                Ok(stream) => return stream,
                Err(err) => {
                    error!(
                        topic = %self.topic,
                        error = %err,
                        retry_in_ms = backoff.as_millis() as u64,
                        "failed to subscribe to response topic"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(self.max_backoff);
                }
            }
        }
    }

    /// Routes one inbound message. Never fails: anomalies are contained
    /// here so they cannot reach the loop or a caller.
    pub fn handle_message(&self, payload: &[u8]) {
        let envelope = match EventEnvelope::parse(payload) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(error = %err, "dropping malformed message on response topic");
                self.metrics.record_dropped_malformed();
                return;
            }
        };

        if envelope.event_type != EventType::VehicleDataResponse {
            trace!(event_type = %envelope.event_type, "ignoring foreign event type");
            self.metrics.record_dropped_foreign();
            return;
        }

        let response: VehicleDataResponse = match envelope.data_as() {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    event_id = %envelope.event_id,
                    error = %err,
                    "dropping response with malformed payload"
                );
                self.metrics.record_dropped_malformed();
                return;
            }
        };

        let outcome = if response.success {
            Ok(response.vehicles.unwrap_or_default())
        } else {
            self.metrics.record_remote_failure();
            Err(RequestError::Remote(
                response
                    .error
                    .unwrap_or_else(|| "Failed to fetch vehicle data".to_string()),
            ))
        };

        if self.registry.settle(&response.request_id, outcome) {
            self.metrics.record_settled();
            debug!(request_id = %response.request_id, "response dispatched");
        } else {
            // Expected for timed-out, duplicate or foreign requests.
            debug!(
                request_id = %response.request_id,
                "no pending request for response"
            );
            self.metrics.record_dropped_unmatched();
        }
    }
}
