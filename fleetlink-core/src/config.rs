//! Configuration for the event bridge.
//!
//! All values are serde-deserializable with per-field defaults so a partial
//! JSON document (or an empty one) yields a runnable configuration.
//! Durations are encoded as integer milliseconds on the wire.

use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path, time::Duration};

use crate::{Error, InternalResult};

/// Configuration of the cross-service query bridge and its topics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Logical name of this service, stamped into every outbound envelope.
    #[serde(default = "default_source")]
    pub source: String,

    /// Topic on which vehicle data requests are published.
    #[serde(default = "default_vehicle_request_topic")]
    pub vehicle_request_topic: String,

    /// Topic on which vehicle data responses arrive.
    #[serde(default = "default_vehicle_response_topic")]
    pub vehicle_response_topic: String,

    /// Topic on which peer services request user data from us.
    #[serde(default = "default_user_request_topic")]
    pub user_request_topic: String,

    /// Topic on which we answer user data requests.
    #[serde(default = "default_user_response_topic")]
    pub user_response_topic: String,

    /// Topic carrying user lifecycle events (created/updated/deleted).
    #[serde(default = "default_user_event_topic")]
    pub user_event_topic: String,

    /// Deadline for a single cross-service request.
    #[serde(default = "default_request_timeout", with = "duration_ms")]
    pub request_timeout: Duration,

    /// Initial delay between subscribe attempts at consumer startup.
    #[serde(default = "default_subscribe_initial_backoff", with = "duration_ms")]
    pub subscribe_initial_backoff: Duration,

    /// Cap for the exponential subscribe backoff.
    #[serde(default = "default_subscribe_max_backoff", with = "duration_ms")]
    pub subscribe_max_backoff: Duration,

    /// Buffer capacity per topic for the in-memory bus.
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            vehicle_request_topic: default_vehicle_request_topic(),
            vehicle_response_topic: default_vehicle_response_topic(),
            user_request_topic: default_user_request_topic(),
            user_response_topic: default_user_response_topic(),
            user_event_topic: default_user_event_topic(),
            request_timeout: default_request_timeout(),
            subscribe_initial_backoff: default_subscribe_initial_backoff(),
            subscribe_max_backoff: default_subscribe_max_backoff(),
            bus_capacity: default_bus_capacity(),
        }
    }
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> InternalResult<T> {
    let file = File::open(path)
        .map_err(|e| Error::Internal(format!("Failed to open config file: {}", e)))?;
    let reader = BufReader::new(file);
    let config = serde_json::from_reader(reader)
        .map_err(|e| Error::Internal(format!("Failed to parse config file: {}", e)))?;
    Ok(config)
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> InternalResult<T> {
    let config = serde_json::from_str(s)
        .map_err(|e| Error::Internal(format!("Failed to parse config: {}", e)))?;
    Ok(config)
}

fn default_source() -> String {
    "user-service".to_string()
}
fn default_vehicle_request_topic() -> String {
    "vehicle-requests".to_string()
}
fn default_vehicle_response_topic() -> String {
    "vehicle-responses".to_string()
}
fn default_user_request_topic() -> String {
    "user-requests".to_string()
}
fn default_user_response_topic() -> String {
    "user-responses".to_string()
}
fn default_user_event_topic() -> String {
    "user-events".to_string()
}
fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}
fn default_subscribe_initial_backoff() -> Duration {
    Duration::from_millis(500)
}
fn default_subscribe_max_backoff() -> Duration {
    Duration::from_secs(30)
}
fn default_bus_capacity() -> usize {
    1000
}

pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
