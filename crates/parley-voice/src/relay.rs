//! Handle to the signaling relay transport.
//!
//! The transport itself (WebSocket, QUIC, in-process loopback) lives
//! outside this crate. It feeds [`RelayEvent`]s in and drains
//! [`OutboundMessage`]s from the receiver returned by [`RelayHandle::channel`].

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::protocol::OutboundMessage;

pub use crate::protocol::InboundMessage;

/// Events produced by the relay transport.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    /// The transport is (re)connected.
    Connected,
    /// The transport dropped. `retrying` is set when it is already
    /// attempting to reconnect on its own.
    Disconnected { retrying: bool },
    /// An application message from the relay.
    Message(InboundMessage),
}

/// Cloneable sender for outbound relay messages.
#[derive(Debug, Clone)]
pub struct RelayHandle {
    tx: mpsc::Sender<OutboundMessage>,
}

impl RelayHandle {
    /// Create a handle and the receiver the transport drains.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<OutboundMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Queue a message for the relay. A closed transport is logged, not
    /// surfaced: session teardown follows from the transport's own
    /// `Disconnected` event.
    pub async fn send(&self, msg: OutboundMessage) {
        debug!(?msg, "Relay send");
        if self.tx.send(msg).await.is_err() {
            warn!("Relay transport closed; dropping outbound message");
        }
    }
}
