//! # Event Envelope
//!
//! The wire schema shared by every message on the bus, in both directions.
//! An envelope carries a fresh `eventId` (tracing only, never correlation),
//! an `eventType` discriminant, a creation timestamp, the producing
//! service's logical name, a schema version string, and a typed payload.
//!
//! ## Defensive parsing
//!
//! Inbound messages are parsed in two phases: first the envelope itself
//! with an opaque JSON payload, then the payload into its concrete type
//! once the `eventType` has been checked. Unknown discriminants map to
//! [`EventType::Unknown`] instead of failing, so a consumer loop can drop
//! foreign traffic without treating it as an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::model::{UserFilter, UserSummary, Vehicle};

/// Current envelope schema version, stamped into every outbound message.
pub const SCHEMA_VERSION: &str = "1.0";

/// Discriminant tag of an envelope.
///
/// Values this service has never heard of deserialize to [`Unknown`]
/// rather than erroring the consuming loop.
///
/// [`Unknown`]: EventType::Unknown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum EventType {
    #[serde(rename = "VEHICLE_DATA_REQUEST")]
    #[strum(serialize = "VEHICLE_DATA_REQUEST")]
    VehicleDataRequest,
    #[serde(rename = "VEHICLE_DATA_RESPONSE")]
    #[strum(serialize = "VEHICLE_DATA_RESPONSE")]
    VehicleDataResponse,
    #[serde(rename = "USER_DATA_REQUEST")]
    #[strum(serialize = "USER_DATA_REQUEST")]
    UserDataRequest,
    #[serde(rename = "USER_DATA_RESPONSE")]
    #[strum(serialize = "USER_DATA_RESPONSE")]
    UserDataResponse,
    #[serde(rename = "USER_CREATED")]
    #[strum(serialize = "USER_CREATED")]
    UserCreated,
    #[serde(rename = "USER_UPDATED")]
    #[strum(serialize = "USER_UPDATED")]
    UserUpdated,
    #[serde(rename = "USER_DELETED")]
    #[strum(serialize = "USER_DELETED")]
    UserDeleted,
    #[serde(other, rename = "UNKNOWN")]
    #[strum(serialize = "UNKNOWN")]
    Unknown,
}

/// The common wrapper format for all messages on the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope<T> {
    /// Globally unique per message, for tracing only.
    pub event_id: String,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    /// Logical name of the producing service.
    pub source: String,
    /// Schema version for forward compatibility.
    pub version: String,
    pub data: T,
}

impl<T: Serialize> EventEnvelope<T> {
    /// Builds an outbound envelope: fresh event id, current timestamp,
    /// current schema version.
    pub fn new(event_type: EventType, source: &str, data: T) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            event_type,
            timestamp: Utc::now(),
            source: source.to_string(),
            version: SCHEMA_VERSION.to_string(),
            data,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, EnvelopeError> {
        Ok(serde_json::to_vec(self)?)
    }
}

impl EventEnvelope<Value> {
    /// First parse phase: the envelope with its payload left opaque.
    pub fn parse(payload: &[u8]) -> Result<Self, EnvelopeError> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// Second parse phase: the payload into its concrete type.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, EnvelopeError> {
        Ok(serde_json::from_value(self.data.clone())?)
    }
}

#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Kind discriminant of a vehicle data request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum VehicleRequestKind {
    #[serde(rename = "ALL")]
    #[strum(serialize = "ALL")]
    All,
    #[serde(rename = "BY_OWNER")]
    #[strum(serialize = "BY_OWNER")]
    ByOwner,
    #[serde(rename = "BY_ID")]
    #[strum(serialize = "BY_ID")]
    ById,
}

/// Payload of a `VEHICLE_DATA_REQUEST` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDataRequest {
    /// Correlation key linking this request to its eventual response.
    pub request_id: String,
    pub request_type: VehicleRequestKind,
    pub requested_by: String,
    #[serde(default)]
    pub filters: Map<String, Value>,
}

/// Payload of a `VEHICLE_DATA_RESPONSE` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDataResponse {
    pub request_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicles: Option<Vec<Vehicle>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Payload of a `USER_DATA_REQUEST` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDataRequest {
    pub request_id: String,
    pub requested_by: String,
    #[serde(default)]
    pub filters: UserFilter,
}

/// Payload of a `USER_DATA_RESPONSE` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDataResponse {
    pub request_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<UserSummary>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Payload of a `USER_CREATED` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCreatedData {
    pub user_id: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Payload of a `USER_UPDATED` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdatedData {
    pub user_id: String,
    #[serde(default)]
    pub changes: Map<String, Value>,
}

/// Payload of a `USER_DELETED` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDeletedData {
    pub user_id: String,
}
