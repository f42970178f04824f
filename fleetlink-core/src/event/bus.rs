//! # Message Bus Abstraction
//!
//! The bus is a black box with two primitives: `publish(topic, payload)`
//! and `subscribe(topic) -> stream`, assumed at-least-once delivery with
//! per-topic ordering and no ordering across topics. Broker specifics
//! (partitioning, offsets, clustering) live behind this seam.
//!
//! [`MemoryBus`] is the in-process implementation used by tests and local
//! runs. It keeps one broadcast channel per topic; like any lossy
//! transport, a subscriber that lags far behind skips messages instead of
//! blocking publishers.

use async_trait::async_trait;
use dashmap::DashMap;
use futures::stream::{BoxStream, StreamExt};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::{BroadcastStream, errors::BroadcastStreamRecvError};
use tracing::{trace, warn};

pub type BusResult<T> = Result<T, BusError>;

/// Stream of raw message payloads for a single topic subscription.
pub type MessageStream = BoxStream<'static, Vec<u8>>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BusError {
    #[error("Publish to '{topic}' failed: {message}")]
    PublishFailed { topic: String, message: String },
    #[error("Subscribe to '{topic}' failed: {message}")]
    SubscribeFailed { topic: String, message: String },
}

/// Transport seam between this service and the rest of the fleet.
#[mockall::automock]
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publishes one message to a topic. Fire-and-forget: an `Ok` means the
    /// transport accepted the message, not that anyone consumed it.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> BusResult<()>;

    /// Opens a long-lived subscription to a topic. Messages for a topic are
    /// yielded one at a time in the transport's delivery order.
    async fn subscribe(&self, topic: &str) -> BusResult<MessageStream>;
}

/// In-process bus backed by one broadcast channel per topic.
pub struct MemoryBus {
    topics: DashMap<String, broadcast::Sender<Vec<u8>>>,
    capacity: usize,
}

impl MemoryBus {
    /// Creates a bus whose per-topic buffer holds `capacity` messages.
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: DashMap::new(),
            capacity,
        }
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<Vec<u8>> {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }
}

#[async_trait]
impl MessageBus for MemoryBus {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> BusResult<()> {
        // A send error only means no live subscribers, which is fine for a
        // fire-and-forget transport.
        if self.sender(topic).send(payload).is_err() {
            trace!(topic, "published with no subscribers");
        }
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> BusResult<MessageStream> {
        let receiver = self.sender(topic).subscribe();
        let topic = topic.to_string();
        let stream = BroadcastStream::new(receiver).filter_map(move |item| {
            let topic = topic.clone();
            async move {
                match item {
                    Ok(payload) => Some(payload),
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        warn!(topic, skipped, "subscriber lagged, messages skipped");
                        None
                    }
                }
            }
        });
        Ok(stream.boxed())
    }
}
