//! # Correlation Registry
//!
//! In-memory table of outstanding requests keyed by correlation id
//! (`requestId`, a namespace independent from the envelope's `eventId`).
//! Safe under concurrent insert/lookup/remove from many callers and the
//! single response dispatcher.
//!
//! ## Settlement semantics
//!
//! An id is present in the registry if and only if its logical request is
//! still awaiting an outcome. Settlement is remove-then-send: whichever of
//! the response dispatcher and the timeout supervisor removes the entry
//! first delivers the outcome; the loser finds nothing and is a no-op.
//! This makes the race deterministic and late or duplicate responses
//! harmless without any caller-side locking.

use std::time::Instant;

use dashmap::{DashMap, mapref::entry::Entry};
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tracing::{debug, trace};

use super::bus::BusError;
use super::envelope::EnvelopeError;

/// Correlation identifier linking a request to its eventual response.
pub type RequestId = String;

/// Outcome delivered to a waiting caller.
pub type SettleResult<T> = Result<T, RequestError>;

/// Errors surfaced through a request's future.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Request timed out: {0}")]
    Timeout(RequestId),
    #[error("Remote service reported failure: {0}")]
    Remote(String),
    #[error("Transport failure: {0}")]
    Transport(#[from] BusError),
    #[error("Failed to encode request: {0}")]
    Encode(#[from] EnvelopeError),
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("Response channel closed")]
    ChannelClosed,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    /// Ids come from a collision-resistant generator; a duplicate is a
    /// guarded precondition violation, never a silent overwrite.
    #[error("Request id already registered: {0}")]
    DuplicateRequestId(RequestId),
}

/// An in-memory record of one outstanding logical request.
struct PendingEntry<T> {
    sender: oneshot::Sender<SettleResult<T>>,
    /// Expiry timer, attached after registration. Aborting it on early
    /// settlement is hygiene, not correctness: expiry re-checks presence.
    timer: Option<AbortHandle>,
    created_at: Instant,
}

/// Map of `requestId -> pending request`, the only shared mutable
/// structure of the bridge.
pub struct CorrelationRegistry<T> {
    pending: DashMap<RequestId, PendingEntry<T>>,
}

impl<T> Default for CorrelationRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CorrelationRegistry<T> {
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
        }
    }

    /// Inserts a new pending entry and returns the receiver its outcome
    /// will be delivered on.
    ///
    /// # Errors
    ///
    /// * `RegistryError::DuplicateRequestId` - if the id is already
    ///   registered; the existing entry is left untouched.
    pub fn register(
        &self,
        request_id: &str,
    ) -> Result<oneshot::Receiver<SettleResult<T>>, RegistryError> {
        match self.pending.entry(request_id.to_string()) {
            Entry::Occupied(_) => Err(RegistryError::DuplicateRequestId(request_id.to_string())),
            Entry::Vacant(vacant) => {
                let (sender, receiver) = oneshot::channel();
                vacant.insert(PendingEntry {
                    sender,
                    timer: None,
                    created_at: Instant::now(),
                });
                Ok(receiver)
            }
        }
    }

    /// Attaches the expiry timer handle to a registered entry. If the entry
    /// settled in the meantime the timer is aborted right away.
    pub fn arm(&self, request_id: &str, timer: AbortHandle) {
        match self.pending.get_mut(request_id) {
            Some(mut entry) => entry.timer = Some(timer),
            None => timer.abort(),
        }
    }

    /// Removes the entry and resolves its future with `outcome`.
    ///
    /// Returns `false` without effect when the id is absent (already
    /// settled, timed out, or never existed) - the property that makes
    /// late and duplicate responses harmless.
    pub fn settle(&self, request_id: &str, outcome: SettleResult<T>) -> bool {
        match self.pending.remove(request_id) {
            Some((_, entry)) => {
                if let Some(timer) = entry.timer {
                    timer.abort();
                }
                trace!(
                    request_id,
                    elapsed_ms = entry.created_at.elapsed().as_millis() as u64,
                    "settling pending request"
                );
                // The caller may have dropped its future; nothing to do then.
                let _ = entry.sender.send(outcome);
                true
            }
            None => false,
        }
    }

    /// Identical removal path invoked by the timeout supervisor; settles
    /// the future with a timeout error.
    pub fn expire(&self, request_id: &str) -> bool {
        match self.pending.remove(request_id) {
            Some((_, entry)) => {
                debug!(
                    request_id,
                    waited_ms = entry.created_at.elapsed().as_millis() as u64,
                    "expiring pending request"
                );
                let _ = entry
                    .sender
                    .send(Err(RequestError::Timeout(request_id.to_string())));
                true
            }
            None => false,
        }
    }

    /// Removes an entry without settling it, used when the request could
    /// not be published in the first place.
    pub fn discard(&self, request_id: &str) {
        if let Some((_, entry)) = self.pending.remove(request_id) {
            if let Some(timer) = entry.timer {
                timer.abort();
            }
        }
    }

    /// Number of requests currently awaiting an outcome.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
