//! # Request Initiator
//!
//! Turns the fire-and-forget bus into a synchronous-style query: build a
//! request envelope, register a pending entry, publish, hand the caller a
//! future. The pending entry and its timeout are in place *before* the
//! publish, closing the race where a response could arrive ahead of the
//! entry it settles.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::config::BridgeConfig;
use crate::model::{Vehicle, VehicleFilter};

use super::bus::MessageBus;
use super::envelope::{EventEnvelope, EventType, VehicleDataRequest, VehicleRequestKind};
use super::metrics::BridgeMetrics;
use super::registry::{CorrelationRegistry, RequestError, SettleResult};
use super::supervisor::TimeoutSupervisor;

/// Issues vehicle data queries to the vehicle service over the bus.
///
/// Callers may invoke the fetch operations concurrently from any number of
/// tasks; each call awaits only its own future and never blocks the
/// response dispatcher or other callers.
pub struct VehicleDataRequester {
    bus: Arc<dyn MessageBus>,
    registry: Arc<CorrelationRegistry<Vec<Vehicle>>>,
    supervisor: TimeoutSupervisor<Vec<Vehicle>>,
    metrics: Arc<BridgeMetrics>,
    source: String,
    request_topic: String,
}

impl VehicleDataRequester {
    pub fn new(bus: Arc<dyn MessageBus>, config: &BridgeConfig, metrics: Arc<BridgeMetrics>) -> Self {
        let registry = Arc::new(CorrelationRegistry::new());
        let supervisor =
            TimeoutSupervisor::new(registry.clone(), config.request_timeout, metrics.clone());
        Self {
            bus,
            registry,
            supervisor,
            metrics,
            source: config.source.clone(),
            request_topic: config.vehicle_request_topic.clone(),
        }
    }

    /// The registry this requester's dispatcher must settle into.
    pub fn registry(&self) -> Arc<CorrelationRegistry<Vec<Vehicle>>> {
        self.registry.clone()
    }

    pub fn metrics(&self) -> Arc<BridgeMetrics> {
        self.metrics.clone()
    }

    /// Number of requests currently awaiting a response or timeout.
    pub fn in_flight(&self) -> usize {
        self.registry.len()
    }

    /// Fetches all vehicles matching the caller's filter.
    pub async fn fetch_all(&self, filter: VehicleFilter) -> SettleResult<Vec<Vehicle>> {
        self.request(VehicleRequestKind::All, filter.into_filters())
            .await
    }

    /// Fetches the vehicles owned by one user.
    pub async fn fetch_by_owner(&self, owner_id: &str) -> SettleResult<Vec<Vehicle>> {
        let mut filters = Map::new();
        filters.insert("ownerId".to_string(), Value::String(owner_id.to_string()));
        self.request(VehicleRequestKind::ByOwner, filters).await
    }

    /// Fetches a single vehicle by its id.
    pub async fn fetch_by_id(&self, vehicle_id: &str) -> SettleResult<Vec<Vehicle>> {
        let mut filters = Map::new();
        filters.insert("vehicleId".to_string(), Value::String(vehicle_id.to_string()));
        self.request(VehicleRequestKind::ById, filters).await
    }

    /// Registers a pending entry, arms its timeout, publishes the request
    /// and awaits settlement.
    ///
    /// # Errors
    ///
    /// * `RequestError::Timeout` - no response within the deadline
    /// * `RequestError::Remote` - the far side answered `success: false`
    /// * `RequestError::Transport` - publish failed; the entry is
    ///   unregistered before this returns
    /// * `RequestError::ChannelClosed` - the pending entry vanished without
    ///   an outcome (should not happen in practice)
    #[instrument(skip(self, filters), fields(kind = %kind))]
    async fn request(
        &self,
        kind: VehicleRequestKind,
        filters: Map<String, Value>,
    ) -> SettleResult<Vec<Vehicle>> {
        let request_id = Uuid::new_v4().to_string();

        let receiver = self.registry.register(&request_id)?;
        let timer = self.supervisor.watch(request_id.clone());
        self.registry.arm(&request_id, timer);

        let envelope = EventEnvelope::new(
            EventType::VehicleDataRequest,
            &self.source,
            VehicleDataRequest {
                request_id: request_id.clone(),
                request_type: kind,
                requested_by: self.source.clone(),
                filters,
            },
        );
        let payload = match envelope.to_bytes() {
            Ok(payload) => payload,
            Err(err) => {
                self.registry.discard(&request_id);
                return Err(err.into());
            }
        };

        self.metrics.record_request();
        if let Err(err) = self.bus.publish(&self.request_topic, payload).await {
            self.registry.discard(&request_id);
            self.metrics.record_publish_failure();
            return Err(RequestError::Transport(err));
        }
        debug!(request_id, "vehicle data request published");

        match receiver.await {
            Ok(outcome) => outcome,
            Err(_) => Err(RequestError::ChannelClosed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::bus::{BusError, MockMessageBus};
    use pretty_assertions::assert_eq;

    fn config() -> BridgeConfig {
        BridgeConfig::default()
    }

    #[tokio::test]
    async fn test_publish_failure_unregisters_entry() {
        let mut bus = MockMessageBus::new();
        bus.expect_publish()
            .withf(|topic, _| topic == "vehicle-requests")
            .returning(|topic, _| {
                Err(BusError::PublishFailed {
                    topic: topic.to_string(),
                    message: "broker unavailable".to_string(),
                })
            });

        let requester = VehicleDataRequester::new(
            Arc::new(bus),
            &config(),
            Arc::new(BridgeMetrics::default()),
        );

        let result = requester.fetch_by_owner("u1").await;
        assert!(matches!(result, Err(RequestError::Transport(_))));
        assert_eq!(requester.in_flight(), 0);
        assert_eq!(requester.metrics().snapshot().publish_failures, 1);
    }

    #[tokio::test]
    async fn test_request_carries_kind_specific_filter() {
        let published: Arc<std::sync::Mutex<Vec<Vec<u8>>>> = Arc::default();
        let sink = published.clone();

        let mut bus = MockMessageBus::new();
        bus.expect_publish()
            .withf(|topic, _| topic == "vehicle-requests")
            .returning(move |_, payload| {
                sink.lock().unwrap().push(payload);
                Ok(())
            });

        let metrics = Arc::new(BridgeMetrics::default());
        let requester = VehicleDataRequester::new(Arc::new(bus), &config(), metrics);
        let registry = requester.registry();

        let fetch = requester.fetch_by_owner("u1");
        tokio::pin!(fetch);

        // Drive the request until the publish happened, then inspect it and
        // settle from the side, as the dispatcher would.
        tokio::select! {
            _ = &mut fetch => panic!("request settled before a response was produced"),
            _ = tokio::time::sleep(std::time::Duration::from_millis(10)) => {}
        }

        let payload = published.lock().unwrap().pop().expect("request published");
        let envelope = EventEnvelope::parse(&payload).unwrap();
        assert_eq!(envelope.event_type, EventType::VehicleDataRequest);
        assert_eq!(envelope.source, "user-service");

        let data: VehicleDataRequest = envelope.data_as().unwrap();
        assert_eq!(data.request_type, VehicleRequestKind::ByOwner);
        assert_eq!(data.filters.get("ownerId"), Some(&"u1".into()));
        assert_eq!(data.requested_by, "user-service");
        // Correlation key and tracing id live in separate namespaces.
        assert_ne!(data.request_id, envelope.event_id);

        assert_eq!(registry.len(), 1);
        assert!(registry.settle(&data.request_id, Ok(vec![])));

        let vehicles = fetch.await.unwrap();
        assert!(vehicles.is_empty());
        assert!(registry.is_empty());
    }
}
