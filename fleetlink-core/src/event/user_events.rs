//! Fire-and-forget user lifecycle events.
//!
//! Published on the user events topic whenever a user record changes, so
//! peer services can keep their caches and projections current. No
//! response is expected and no correlation state is kept.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::InternalResult;
use crate::config::BridgeConfig;
use crate::model::UserSummary;

use super::bus::MessageBus;
use super::envelope::{
    EventEnvelope, EventType, UserCreatedData, UserDeletedData, UserUpdatedData,
};

pub struct UserEventPublisher {
    bus: Arc<dyn MessageBus>,
    source: String,
    topic: String,
}

impl UserEventPublisher {
    pub fn new(bus: Arc<dyn MessageBus>, config: &BridgeConfig) -> Self {
        Self {
            bus,
            source: config.source.clone(),
            topic: config.user_event_topic.clone(),
        }
    }

    pub async fn user_created(&self, user: &UserSummary) -> InternalResult<()> {
        let data = UserCreatedData {
            user_id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            roles: user.roles.clone(),
        };
        self.publish(EventType::UserCreated, data).await
    }

    pub async fn user_updated(
        &self,
        user_id: &str,
        changes: Map<String, Value>,
    ) -> InternalResult<()> {
        let data = UserUpdatedData {
            user_id: user_id.to_string(),
            changes,
        };
        self.publish(EventType::UserUpdated, data).await
    }

    pub async fn user_deleted(&self, user_id: &str) -> InternalResult<()> {
        let data = UserDeletedData {
            user_id: user_id.to_string(),
        };
        self.publish(EventType::UserDeleted, data).await
    }

    async fn publish<T: serde::Serialize>(
        &self,
        event_type: EventType,
        data: T,
    ) -> InternalResult<()> {
        let envelope = EventEnvelope::new(event_type, &self.source, data);
        let event_id = envelope.event_id.clone();
        self.bus.publish(&self.topic, envelope.to_bytes()?).await?;
        debug!(%event_id, event_type = %event_type, "user lifecycle event published");
        Ok(())
    }
}
