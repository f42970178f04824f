//! # User Data Responder
//!
//! The mirror image of the vehicle bridge: peer services query *us* for
//! user data over the bus. The responder consumes `USER_DATA_REQUEST`
//! messages, looks the users up in a [`UserDirectory`], and publishes a
//! `USER_DATA_RESPONSE` carrying either the result or the error message.
//! A directory failure becomes a `success: false` response for that one
//! request; it never stops the loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::config::BridgeConfig;
use crate::model::{UserFilter, UserSummary};

use super::bus::{MessageBus, MessageStream};
use super::envelope::{EventEnvelope, EventType, UserDataRequest, UserDataResponse};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DirectoryError {
    #[error("Directory lookup failed: {0}")]
    Lookup(String),
}

/// Source of user records for inbound data requests.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find(&self, filter: &UserFilter) -> Result<Vec<UserSummary>, DirectoryError>;
}

/// Directory backed by an in-memory list, for tests and local runs.
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<Vec<UserSummary>>,
}

impl InMemoryUserDirectory {
    pub fn new(users: Vec<UserSummary>) -> Self {
        Self {
            users: RwLock::new(users),
        }
    }

    pub async fn insert(&self, user: UserSummary) {
        self.users.write().await.push(user);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find(&self, filter: &UserFilter) -> Result<Vec<UserSummary>, DirectoryError> {
        let users = self.users.read().await;
        Ok(users.iter().filter(|u| filter.matches(u)).cloned().collect())
    }
}

/// Long-lived consumer answering user data requests from peer services.
pub struct UserDataResponder {
    bus: Arc<dyn MessageBus>,
    directory: Arc<dyn UserDirectory>,
    source: String,
    request_topic: String,
    response_topic: String,
    initial_backoff: Duration,
    max_backoff: Duration,
    ready: AtomicBool,
}

impl UserDataResponder {
    pub fn new(
        bus: Arc<dyn MessageBus>,
        directory: Arc<dyn UserDirectory>,
        config: &BridgeConfig,
    ) -> Self {
        Self {
            bus,
            directory,
            source: config.source.clone(),
            request_topic: config.user_request_topic.clone(),
            response_topic: config.user_response_topic.clone(),
            initial_backoff: config.subscribe_initial_backoff,
            max_backoff: config.subscribe_max_backoff,
            ready: AtomicBool::new(false),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let responder = self.clone();
        tokio::spawn(async move { responder.run().await })
    }

    pub async fn run(&self) {
        let mut stream = self.subscribe_with_backoff().await;
        self.ready.store(true, Ordering::SeqCst);
        info!(topic = %self.request_topic, "user data responder started");

        while let Some(payload) = stream.next().await {
            self.handle_message(&payload).await;
        }

        self.ready.store(false, Ordering::SeqCst);
        warn!(topic = %self.request_topic, "request stream ended, responder stopped");
    }

    async fn subscribe_with_backoff(&self) -> MessageStream {
        let mut backoff = self.initial_backoff;
        loop {
            match self.bus.subscribe(&self.request_topic).await {
                Ok(stream) => return stream,
                Err(err) => {
                    error!(
                        topic = %self.request_topic,
                        error = %err,
                        retry_in_ms = backoff.as_millis() as u64,
                        "failed to subscribe to request topic"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(self.max_backoff);
                }
            }
        }
    }

    pub async fn handle_message(&self, payload: &[u8]) {
        let envelope = match EventEnvelope::parse(payload) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(error = %err, "dropping malformed message on request topic");
                return;
            }
        };

        if envelope.event_type != EventType::UserDataRequest {
            trace!(event_type = %envelope.event_type, "ignoring foreign event type");
            return;
        }

        let request: UserDataRequest = match envelope.data_as() {
            Ok(request) => request,
            Err(err) => {
                warn!(
                    event_id = %envelope.event_id,
                    error = %err,
                    "dropping request with malformed payload"
                );
                return;
            }
        };
        debug!(
            request_id = %request.request_id,
            requested_by = %request.requested_by,
            "received user data request"
        );

        let response = match self.directory.find(&request.filters).await {
            Ok(users) => UserDataResponse {
                request_id: request.request_id.clone(),
                success: true,
                users: Some(users),
                error: None,
            },
            Err(err) => {
                error!(
                    request_id = %request.request_id,
                    error = %err,
                    "directory lookup failed"
                );
                UserDataResponse {
                    request_id: request.request_id.clone(),
                    success: false,
                    users: None,
                    error: Some(err.to_string()),
                }
            }
        };

        let envelope = EventEnvelope::new(EventType::UserDataResponse, &self.source, response);
        let payload = match envelope.to_bytes() {
            Ok(payload) => payload,
            Err(err) => {
                error!(error = %err, "failed to encode user data response");
                return;
            }
        };
        if let Err(err) = self.bus.publish(&self.response_topic, payload).await {
            error!(
                request_id = %request.request_id,
                error = %err,
                "failed to publish user data response"
            );
        }
    }
}
