//! Transport boundary between two execution contexts.
//!
//! A [`Transport`] only has to move an [`Envelope`] towards the peer,
//! preserving order. Delivery is best-effort: an `Err` from `post` means the
//! peer cannot be reached and the caller drops the envelope.
//!
//! Two implementations are provided:
//! - [`MemoryTransport`]: in-process, posts into the peer's task queue
//! - [`stream::FramedTransport`]: length-prefixed frames over any async byte stream

pub mod codec;
pub mod stream;

use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::channel::Envelope;
use crate::types::{Error, PeerName, Result};

/// Outbound half of a cross-context link.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    /// Hand an envelope to the peer. Never blocks.
    fn post(&self, envelope: Envelope) -> Result<()>;
}

/// The other side of a channel: a name plus the transport reaching it.
#[derive(Clone)]
pub struct PeerEndpoint {
    name: PeerName,
    transport: Arc<dyn Transport>,
}

impl PeerEndpoint {
    pub fn new(name: PeerName, transport: impl Transport + 'static) -> Self {
        Self {
            name,
            transport: Arc::new(transport),
        }
    }

    pub fn name(&self) -> &PeerName {
        &self.name
    }

    pub(crate) fn post(&self, envelope: Envelope) -> Result<()> {
        self.transport.post(envelope)
    }
}

impl fmt::Debug for PeerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerEndpoint")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// In-process transport delivering into the peer's unbounded inbox.
///
/// The inbox element type only needs to be constructible from an envelope, so
/// the same transport feeds a page task queue or a plain envelope queue.
pub struct MemoryTransport<T> {
    inbox: mpsc::UnboundedSender<T>,
}

impl<T> MemoryTransport<T> {
    pub fn new(inbox: mpsc::UnboundedSender<T>) -> Self {
        Self { inbox }
    }
}

impl<T> fmt::Debug for MemoryTransport<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("closed", &self.inbox.is_closed())
            .finish()
    }
}

impl<T> Transport for MemoryTransport<T>
where
    T: From<Envelope> + Send + 'static,
{
    fn post(&self, envelope: Envelope) -> Result<()> {
        self.inbox
            .send(T::from(envelope))
            .map_err(|_| Error::transport("peer inbox closed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_transport_delivers_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel::<Envelope>();
        let transport = MemoryTransport::new(tx);

        transport.post(Envelope::event("a", json!(1))).unwrap();
        transport.post(Envelope::event("b", json!(2))).unwrap();

        assert_eq!(rx.try_recv().unwrap().kind, "a");
        assert_eq!(rx.try_recv().unwrap().kind, "b");
    }

    #[test]
    fn test_memory_transport_reports_closed_peer() {
        let (tx, rx) = mpsc::unbounded_channel::<Envelope>();
        drop(rx);
        let transport = MemoryTransport::new(tx);

        let err = transport.post(Envelope::event("a", json!(null))).unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }
}
