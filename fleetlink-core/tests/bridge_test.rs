//! End-to-end tests of the query bridge over the in-memory bus: a real
//! requester, dispatcher and timeout supervisor on one side, a scripted
//! vehicle service on the other.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use pretty_assertions::assert_eq;
use tokio::sync::Notify;

use fleetlink_core::RequestError;
use fleetlink_core::config::BridgeConfig;
use fleetlink_core::event::{
    BridgeMetrics, EventEnvelope, EventType, MemoryBus, MessageBus, ResponseDispatcher,
    VehicleDataRequest, VehicleDataRequester, VehicleDataResponse,
};
use fleetlink_core::model::{Vehicle, VehicleFilter};

struct Bridge {
    bus: Arc<MemoryBus>,
    requester: Arc<VehicleDataRequester>,
    dispatcher: Arc<ResponseDispatcher>,
    metrics: Arc<BridgeMetrics>,
}

async fn setup() -> Bridge {
    let config = BridgeConfig::default();
    let bus = Arc::new(MemoryBus::new(64));
    let metrics = Arc::new(BridgeMetrics::default());
    let requester = Arc::new(VehicleDataRequester::new(
        bus.clone(),
        &config,
        metrics.clone(),
    ));
    let dispatcher = Arc::new(ResponseDispatcher::new(
        bus.clone(),
        requester.registry(),
        metrics.clone(),
        &config,
    ));
    dispatcher.spawn();
    while !dispatcher.is_ready() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    Bridge {
        bus,
        requester,
        dispatcher,
        metrics,
    }
}

fn vehicle(id: &str, owner: &str) -> Vehicle {
    Vehicle {
        id: id.to_string(),
        owner_id: Some(owner.to_string()),
        make: None,
        model: None,
        year: None,
        status: None,
        extra: Default::default(),
    }
}

fn response_payload(request_id: &str, vehicles: Vec<Vehicle>) -> Vec<u8> {
    EventEnvelope::new(
        EventType::VehicleDataResponse,
        "vehicle-service",
        VehicleDataResponse {
            request_id: request_id.to_string(),
            success: true,
            vehicles: Some(vehicles),
            error: None,
        },
    )
    .to_bytes()
    .unwrap()
}

fn error_payload(request_id: &str, error: &str) -> Vec<u8> {
    EventEnvelope::new(
        EventType::VehicleDataResponse,
        "vehicle-service",
        VehicleDataResponse {
            request_id: request_id.to_string(),
            success: false,
            vehicles: None,
            error: Some(error.to_string()),
        },
    )
    .to_bytes()
    .unwrap()
}

fn parse_request(payload: &[u8]) -> VehicleDataRequest {
    EventEnvelope::parse(payload).unwrap().data_as().unwrap()
}

/// Starts a scripted vehicle service answering every request with one
/// vehicle for the requested owner. The subscription is opened before this
/// returns, so requests published afterwards cannot be missed.
async fn start_echo_service(bus: Arc<MemoryBus>) {
    let mut requests = bus.subscribe("vehicle-requests").await.unwrap();
    tokio::spawn(async move {
        while let Some(payload) = requests.next().await {
            let request = parse_request(&payload);
            let owner = request
                .filters
                .get("ownerId")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string();
            let response = response_payload(&request.request_id, vec![vehicle("v1", &owner)]);
            bus.publish("vehicle-responses", response).await.unwrap();
        }
    });
}

#[tokio::test(start_paused = true)]
async fn test_round_trip_by_owner() {
    let bridge = setup().await;
    start_echo_service(bridge.bus.clone()).await;

    let vehicles = bridge.requester.fetch_by_owner("u1").await.unwrap();
    assert_eq!(vehicles.len(), 1);
    assert_eq!(vehicles[0].owner_id.as_deref(), Some("u1"));

    assert_eq!(bridge.requester.in_flight(), 0);
    assert_eq!(bridge.metrics.snapshot().settled, 1);
}

#[tokio::test(start_paused = true)]
async fn test_remote_error_is_surfaced() {
    let bridge = setup().await;
    let mut requests = bridge.bus.subscribe("vehicle-requests").await.unwrap();
    let bus = bridge.bus.clone();
    tokio::spawn(async move {
        let request = parse_request(&requests.next().await.unwrap());
        bus.publish(
            "vehicle-responses",
            error_payload(&request.request_id, "not found"),
        )
        .await
        .unwrap();
    });

    let result = bridge.requester.fetch_by_id("v-missing").await;
    assert!(matches!(
        result,
        Err(RequestError::Remote(message)) if message == "not found"
    ));
    assert_eq!(bridge.requester.in_flight(), 0);
    assert_eq!(bridge.metrics.snapshot().remote_failures, 1);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_fires_at_deadline_not_earlier() {
    let bridge = setup().await;
    // Nobody answers on the request topic.
    let started = tokio::time::Instant::now();
    let result = bridge.requester.fetch_by_owner("u1").await;

    assert!(matches!(result, Err(RequestError::Timeout(_))));
    assert!(started.elapsed() >= Duration::from_secs(10));
    assert_eq!(bridge.requester.in_flight(), 0);
    assert_eq!(bridge.metrics.snapshot().timeouts, 1);
}

#[tokio::test(start_paused = true)]
async fn test_late_response_after_timeout_is_noop() {
    let bridge = setup().await;
    let mut requests = bridge.bus.subscribe("vehicle-requests").await.unwrap();

    let request_id = Arc::new(std::sync::Mutex::new(String::new()));
    let seen = request_id.clone();
    let captured = Arc::new(Notify::new());
    let captured_tx = captured.clone();
    tokio::spawn(async move {
        let request = parse_request(&requests.next().await.unwrap());
        *seen.lock().unwrap() = request.request_id;
        captured_tx.notify_one();
    });

    let result = bridge.requester.fetch_by_owner("u1").await;
    assert!(matches!(result, Err(RequestError::Timeout(_))));
    captured.notified().await;

    // The response arrives well past the deadline.
    let id = request_id.lock().unwrap().clone();
    bridge
        .bus
        .publish("vehicle-responses", response_payload(&id, vec![]))
        .await
        .unwrap();

    // Give the dispatcher its turn, then verify: nothing settled, nothing
    // leaked, one unmatched drop counted.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let snapshot = bridge.metrics.snapshot();
    assert_eq!(snapshot.settled, 0);
    assert_eq!(snapshot.dropped_unmatched, 1);
    assert_eq!(bridge.requester.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_responses_resolve_in_arrival_order_not_issue_order() {
    let bridge = setup().await;
    let mut requests = bridge.bus.subscribe("vehicle-requests").await.unwrap();

    // Collect both requests, then answer them in reverse order.
    let bus = bridge.bus.clone();
    tokio::spawn(async move {
        let mut pending = Vec::new();
        for _ in 0..2 {
            let request = parse_request(&requests.next().await.unwrap());
            let owner = request
                .filters
                .get("ownerId")
                .and_then(|v| v.as_str())
                .unwrap()
                .to_string();
            pending.push((request.request_id, owner));
        }
        for (id, owner) in pending.into_iter().rev() {
            bus.publish(
                "vehicle-responses",
                response_payload(&id, vec![vehicle("v1", &owner)]),
            )
            .await
            .unwrap();
        }
    });

    let completion_order: Arc<std::sync::Mutex<Vec<&'static str>>> = Arc::default();

    let order_a = completion_order.clone();
    let requester_a = bridge.requester.clone();
    let task_a = tokio::spawn(async move {
        let vehicles = requester_a.fetch_by_owner("owner-a").await.unwrap();
        order_a.lock().unwrap().push("a");
        vehicles
    });
    // Issue A strictly before B.
    tokio::time::sleep(Duration::from_millis(5)).await;

    let order_b = completion_order.clone();
    let requester_b = bridge.requester.clone();
    let task_b = tokio::spawn(async move {
        let vehicles = requester_b.fetch_by_owner("owner-b").await.unwrap();
        order_b.lock().unwrap().push("b");
        vehicles
    });

    let (vehicles_a, vehicles_b) = (task_a.await.unwrap(), task_b.await.unwrap());
    assert_eq!(vehicles_a[0].owner_id.as_deref(), Some("owner-a"));
    assert_eq!(vehicles_b[0].owner_id.as_deref(), Some("owner-b"));

    // B's response was published first, so B settled first.
    assert_eq!(*completion_order.lock().unwrap(), vec!["b", "a"]);
    assert_eq!(bridge.requester.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_message_does_not_block_next_response() {
    let bridge = setup().await;
    let mut requests = bridge.bus.subscribe("vehicle-requests").await.unwrap();
    let bus = bridge.bus.clone();
    tokio::spawn(async move {
        let request = parse_request(&requests.next().await.unwrap());

        // Garbage first, then the real response immediately after.
        bus.publish("vehicle-responses", b"this is not json".to_vec())
            .await
            .unwrap();
        bus.publish(
            "vehicle-responses",
            response_payload(&request.request_id, vec![]),
        )
        .await
        .unwrap();
    });

    let vehicles = bridge
        .requester
        .fetch_all(VehicleFilter::default())
        .await
        .unwrap();
    assert!(vehicles.is_empty());
    assert_eq!(bridge.metrics.snapshot().dropped_malformed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_delivery_settles_once() {
    let bridge = setup().await;
    let mut requests = bridge.bus.subscribe("vehicle-requests").await.unwrap();
    let bus = bridge.bus.clone();
    tokio::spawn(async move {
        let request = parse_request(&requests.next().await.unwrap());

        // At-least-once delivery: the same response twice.
        let response = response_payload(&request.request_id, vec![]);
        bus.publish("vehicle-responses", response.clone())
            .await
            .unwrap();
        bus.publish("vehicle-responses", response).await.unwrap();
    });

    let vehicles = bridge.requester.fetch_by_owner("u1").await.unwrap();
    assert!(vehicles.is_empty());

    tokio::time::sleep(Duration::from_millis(50)).await;
    let snapshot = bridge.metrics.snapshot();
    assert_eq!(snapshot.settled, 1);
    assert_eq!(snapshot.dropped_unmatched, 1);
    assert_eq!(bridge.requester.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_concurrent_requests_all_settle_without_leak() {
    const BURST: usize = 32;

    let bridge = setup().await;
    start_echo_service(bridge.bus.clone()).await;

    let mut tasks = Vec::with_capacity(BURST);
    for i in 0..BURST {
        let requester = bridge.requester.clone();
        tasks.push(tokio::spawn(async move {
            requester.fetch_by_owner(&format!("owner-{i}")).await
        }));
    }
    for (i, task) in tasks.into_iter().enumerate() {
        let vehicles = task.await.unwrap().unwrap();
        assert_eq!(
            vehicles[0].owner_id.as_deref(),
            Some(format!("owner-{i}").as_str())
        );
    }

    // Bounded-registry check: nothing left behind after the burst.
    assert_eq!(bridge.requester.in_flight(), 0);
    let snapshot = bridge.metrics.snapshot();
    assert_eq!(snapshot.requests, BURST as u64);
    assert_eq!(snapshot.settled, BURST as u64);
    assert_eq!(snapshot.timeouts, 0);
}

#[tokio::test(start_paused = true)]
async fn test_dispatcher_readiness_reflects_subscription() {
    let bridge = setup().await;
    assert!(bridge.dispatcher.is_ready());
}
