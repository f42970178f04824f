//! # Event System
//!
//! Everything that touches the bus lives here.
//!
//! The request path for an outbound vehicle query:
//!
//! ```text
//! caller -> VehicleDataRequester -> registry insert + publish
//!        ... time passes ...
//! ResponseDispatcher -> registry lookup/remove -> settle future -> caller resumes
//! ```
//!
//! The [`supervisor::TimeoutSupervisor`] races the dispatcher for each
//! entry; whichever removes the entry first delivers the outcome, the
//! loser is a no-op by construction.
//!
//! Inbound, the [`responder::UserDataResponder`] answers peer services'
//! user data requests, and [`user_events::UserEventPublisher`] announces
//! user record changes.

pub mod bus;
pub mod dispatcher;
pub mod envelope;
pub mod metrics;
pub mod registry;
pub mod requester;
pub mod responder;
pub mod supervisor;
pub mod user_events;

pub use bus::{BusError, BusResult, MemoryBus, MessageBus, MessageStream};
pub use dispatcher::ResponseDispatcher;
pub use envelope::{
    EnvelopeError, EventEnvelope, EventType, SCHEMA_VERSION, UserCreatedData, UserDataRequest, UserDataResponse,
    UserDeletedData, UserUpdatedData, VehicleDataRequest, VehicleDataResponse, VehicleRequestKind,
};
pub use metrics::{BridgeMetrics, MetricsSnapshot};
pub use registry::{CorrelationRegistry, RegistryError, RequestError, RequestId, SettleResult};
pub use requester::VehicleDataRequester;
pub use responder::{DirectoryError, InMemoryUserDirectory, UserDataResponder, UserDirectory};
pub use supervisor::TimeoutSupervisor;
pub use user_events::UserEventPublisher;
