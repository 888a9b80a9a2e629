//! Duplex messaging channel to a single peer context.
//!
//! Patterns supported:
//!   - **Send**: fire-and-forget, no correlation id
//!   - **Request**: correlation id + one-shot callback, answered at most once
//!   - **Events**: inbound fan-out to every handler registered for a kind,
//!     in registration order, each given a shared [`Responder`]
//!
//! Delivery is best-effort. Transport failures, orphan responses and kinds
//! nobody listens to are absorbed and logged; nothing here returns an error
//! to the caller. Requests never time out, so callers must tolerate a
//! callback that never fires.
//!
//! Callbacks only run from [`Channel::dispatch`], which the owning event loop
//! calls for each inbound envelope. Internal state is never locked while a
//! callback runs, so callbacks may freely use the channel again.

mod envelope;

pub use envelope::{Envelope, EnvelopeClass, RESPONSE_MARKER};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::transport::PeerEndpoint;
use crate::types::{ChannelConfig, CorrelationId};

/// One-shot callback awaiting a response payload.
pub type ResponseCallback = Box<dyn FnOnce(Value) + Send>;

/// Handler for an inbound event or request kind.
pub type EventHandler = Arc<dyn Fn(&Value, &Responder) + Send + Sync>;

/// Statistics about channel usage.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub envelopes_sent: u64,
    pub requests_issued: u64,
    pub responses_delivered: u64,
    pub events_dispatched: u64,
    pub orphans_dropped: u64,
    pub unhandled_dropped: u64,
    pub transport_failures: u64,
    pub pending_calls: usize,
}

#[derive(Default)]
struct ChannelState {
    /// correlation id -> callback, removed exactly once
    pending: HashMap<CorrelationId, ResponseCallback>,

    /// kind -> handlers in registration order
    subscriptions: HashMap<String, Vec<EventHandler>>,

    stats: ChannelStats,
}

struct Inner {
    peer: PeerEndpoint,
    config: ChannelConfig,
    state: Mutex<ChannelState>,
}

/// Messaging channel bound to one peer for its whole life.
///
/// Cheap to clone; clones share the pending calls and subscriptions.
#[derive(Clone)]
pub struct Channel {
    inner: Arc<Inner>,
}

impl Channel {
    pub fn new(peer: PeerEndpoint, config: ChannelConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                peer,
                config,
                state: Mutex::new(ChannelState::default()),
            }),
        }
    }

    pub fn peer(&self) -> &PeerEndpoint {
        &self.inner.peer
    }

    // =========================================================================
    // Outbound
    // =========================================================================

    /// Fire-and-forget send.
    pub fn send(&self, kind: impl Into<String>, payload: Value) {
        self.transmit(Envelope::event(kind, payload));
    }

    /// Send a request whose answer is handed to `on_response`.
    ///
    /// The callback fires at most once, and never if the peer does not answer.
    pub fn request<F>(&self, kind: impl Into<String>, payload: Value, on_response: F)
    where
        F: FnOnce(Value) + Send + 'static,
    {
        let id = CorrelationId::new();
        let pending = {
            let mut state = self.lock_state();
            state.pending.insert(id.clone(), Box::new(on_response));
            state.stats.requests_issued += 1;
            state.pending.len()
        };

        if pending > self.inner.config.pending_warn_threshold {
            tracing::warn!(
                peer = %self.inner.peer.name(),
                pending,
                "Pending calls above threshold, peer may not be answering"
            );
        }

        let envelope = Envelope::request(kind, payload, id.clone());
        if !self.transmit(envelope) {
            // Never answerable once the transport refused it
            self.lock_state().pending.remove(&id);
        }
    }

    /// Register a handler for inbound envelopes of `kind`.
    ///
    /// Registrations accumulate; returns `self` so several kinds can be
    /// registered in one chain.
    pub fn on<F>(&self, kind: impl Into<String>, handler: F) -> &Self
    where
        F: Fn(&Value, &Responder) + Send + Sync + 'static,
    {
        let kind = kind.into();
        tracing::debug!("Registered handler for kind={}", kind);
        self.lock_state()
            .subscriptions
            .entry(kind)
            .or_default()
            .push(Arc::new(handler));
        self
    }

    fn transmit(&self, envelope: Envelope) -> bool {
        let kind = envelope.kind.clone();
        match self.inner.peer.post(envelope) {
            Ok(()) => {
                self.lock_state().stats.envelopes_sent += 1;
                true
            }
            Err(e) => {
                self.lock_state().stats.transport_failures += 1;
                tracing::debug!(
                    peer = %self.inner.peer.name(),
                    "Dropped envelope kind={}: {}",
                    kind,
                    e
                );
                false
            }
        }
    }

    // =========================================================================
    // Inbound
    // =========================================================================

    /// Route one inbound envelope to its pending call or subscribers.
    pub fn dispatch(&self, envelope: Envelope) {
        let Envelope {
            kind,
            payload,
            correlation_id,
        } = envelope;

        if let Some(id) = &correlation_id {
            let callback = {
                let mut state = self.lock_state();
                let callback = state.pending.remove(id);
                if callback.is_some() {
                    state.stats.responses_delivered += 1;
                }
                callback
            };
            if let Some(callback) = callback {
                tracing::trace!("Delivering response kind={} id={}", kind, id);
                callback(payload);
                return;
            }
        }

        if kind.ends_with(RESPONSE_MARKER) {
            self.lock_state().stats.orphans_dropped += 1;
            tracing::debug!(
                "Dropped orphan response kind={} id={:?}",
                kind,
                correlation_id.as_ref().map(CorrelationId::as_str)
            );
            return;
        }

        let handlers = {
            let mut state = self.lock_state();
            let handlers = state.subscriptions.get(&kind).cloned().unwrap_or_default();
            if handlers.is_empty() {
                state.stats.unhandled_dropped += 1;
            } else {
                state.stats.events_dispatched += 1;
            }
            handlers
        };

        if handlers.is_empty() {
            tracing::debug!("No handler registered for kind={}, discarded", kind);
            return;
        }

        let responder = match correlation_id {
            Some(id) => Responder::new(self.clone(), kind, id),
            None => Responder::inert(),
        };
        for handler in &handlers {
            handler(&payload, &responder);
        }
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Get current channel statistics.
    pub fn stats(&self) -> ChannelStats {
        let state = self.lock_state();
        ChannelStats {
            pending_calls: state.pending.len(),
            ..state.stats.clone()
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ChannelState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("peer", &self.inner.peer)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Responder
// =============================================================================

struct ReplyTarget {
    channel: Channel,
    kind: String,
    correlation_id: CorrelationId,
    used: AtomicBool,
}

/// Reply handle for one inbound request, shared by all of its handlers.
///
/// Only the first [`Responder::respond`] transmits. A responder for an
/// inbound event (no correlation id) is inert.
#[derive(Clone)]
pub struct Responder {
    target: Option<Arc<ReplyTarget>>,
}

impl Responder {
    fn new(channel: Channel, kind: String, correlation_id: CorrelationId) -> Self {
        Self {
            target: Some(Arc::new(ReplyTarget {
                channel,
                kind,
                correlation_id,
                used: AtomicBool::new(false),
            })),
        }
    }

    fn inert() -> Self {
        Self { target: None }
    }

    /// Whether the inbound envelope expects an answer.
    pub fn expects_response(&self) -> bool {
        self.target
            .as_ref()
            .is_some_and(|t| !t.used.load(Ordering::Acquire))
    }

    /// Answer the request. Returns `true` if this call emitted the response.
    pub fn respond(&self, payload: Value) -> bool {
        let Some(target) = &self.target else {
            tracing::debug!("Ignoring response to an event");
            return false;
        };
        if target.used.swap(true, Ordering::AcqRel) {
            tracing::warn!(
                "Duplicate response to kind={} id={} dropped",
                target.kind,
                target.correlation_id
            );
            return false;
        }
        let envelope = Envelope::response(&target.kind, payload, target.correlation_id.clone());
        target.channel.transmit(envelope)
    }
}

impl fmt::Debug for Responder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Some(t) => f
                .debug_struct("Responder")
                .field("kind", &t.kind)
                .field("correlation_id", &t.correlation_id)
                .finish(),
            None => f.write_str("Responder(inert)"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
