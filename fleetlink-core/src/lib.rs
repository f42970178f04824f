//! # Fleetlink User Service Core
//!
//! Core library of the fleetlink user service: the asynchronous
//! cross-service query bridge that lets this service issue a logical,
//! synchronous-style query ("all vehicles owned by user X") to a peer
//! service reachable only through fire-and-forget publish/subscribe
//! messaging, and receive a typed result or a bounded-time failure.
//!
//! ## Architecture
//!
//! The bridge is built from five cooperating pieces, all under [`event`]:
//!
//! - **Envelope** ([`event::envelope`]): the wire schema every message on
//!   the bus shares, parsed defensively so one malformed or foreign
//!   message never interrupts a consumer loop.
//! - **Correlation Registry** ([`event::registry`]): the in-memory table
//!   of outstanding requests keyed by request id, safe under concurrent
//!   insert/lookup/remove. Remove-on-settle semantics guarantee at most
//!   one settlement per request.
//! - **Timeout Supervisor** ([`event::supervisor`]): one expiry timer per
//!   in-flight request, racing the dispatcher; the loser is a no-op.
//! - **Request Initiator** ([`event::requester`]): registers a pending
//!   entry, publishes the request envelope and hands the caller a future.
//! - **Response Dispatcher** ([`event::dispatcher`]): the long-lived
//!   subscriber that demultiplexes inbound responses to pending entries.
//!
//! The bus itself is a seam: the [`event::bus::MessageBus`] trait with an
//! in-memory broadcast-backed implementation for tests and local runs.
//!
//! Around the bridge sit the peer-facing pieces the service also carries:
//! the user-side responder ([`event::responder`]) answering
//! `USER_DATA_REQUEST` queries from other services, and the lifecycle
//! event publisher ([`event::user_events`]).

pub mod config;
pub mod error;
pub mod event;
pub mod model;

// Re-exports
pub use error::*;
pub use event::*;
