//! Domain models exchanged with peer services.
//!
//! The vehicle schema is owned by the vehicle service; we keep the fields we
//! rely on typed and carry everything else through a flattened map so a
//! schema addition on the far side never breaks deserialization here.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A vehicle record as published by the vehicle service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Fields the vehicle service added that we do not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Caller-supplied filter for vehicle queries.
///
/// Serialized into the request's filter map; kind-specific keys
/// (`ownerId`, `vehicleId`) are merged in by the request initiator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

impl VehicleFilter {
    /// Flattens the filter into the wire-level filter map, dropping unset
    /// fields.
    pub fn into_filters(self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// The slice of a user record this service shares with peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Filter carried by inbound `USER_DATA_REQUEST` messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl UserFilter {
    /// Whether a user matches this filter. An empty filter matches everyone;
    /// a roles filter matches on any shared role.
    pub fn matches(&self, user: &UserSummary) -> bool {
        if let Some(active) = self.is_active {
            if user.is_active != active {
                return false;
            }
        }
        if let Some(roles) = &self.roles {
            if !roles.is_empty() && !roles.iter().any(|r| user.roles.contains(r)) {
                return false;
            }
        }
        true
    }
}
