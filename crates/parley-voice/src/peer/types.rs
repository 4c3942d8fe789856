//! Peer connection primitive, its events, and error types.

use std::sync::Arc;

use async_trait::async_trait;
use parley_common::SessionError;
use parley_config::IceServerConfig;
use tokio::sync::mpsc;

use crate::media::{LocalStream, RemoteTrack};
use crate::protocol::{IceCandidate, SessionDescription};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which peer map a connection belongs to. The two maps never share
/// connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaCategory {
    Voice,
    ScreenShare,
}

/// Lifecycle of one peer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl ConnectionState {
    /// States that end the connection immediately.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Disconnected | Self::Failed | Self::Closed)
    }
}

/// Raw transport counters reported by the primitive. Counters are
/// cumulative; the quality monitor derives rates from deltas.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransportStats {
    pub round_trip_time_ms: Option<f64>,
    pub jitter_ms: Option<f64>,
    pub packets_received: u64,
    pub packets_lost: u64,
    pub bytes_received: u64,
    /// Epoch milliseconds at which the counters were read.
    pub timestamp_ms: i64,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Something a peer connection reported.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerEventKind {
    /// A local candidate to deliver through the relay.
    IceCandidate(IceCandidate),
    /// A remote track arrived.
    Track(RemoteTrack),
    StateChanged(ConnectionState),
    /// Level of the remote audio track in `[0, 1]`.
    AudioLevel(f64),
}

/// Event tagged with the connection it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerEvent {
    pub category: MediaCategory,
    pub peer_id: String,
    /// Distinguishes a replaced connection from its successor.
    pub generation: u64,
    pub kind: PeerEventKind,
}

/// Handed to each new connection so its callbacks post into the owner's
/// inbox instead of touching session state.
#[derive(Debug, Clone)]
pub struct PeerEventSender {
    category: MediaCategory,
    peer_id: String,
    generation: u64,
    tx: mpsc::UnboundedSender<PeerEvent>,
}

impl PeerEventSender {
    pub(crate) fn new(
        category: MediaCategory,
        peer_id: &str,
        generation: u64,
        tx: mpsc::UnboundedSender<PeerEvent>,
    ) -> Self {
        Self {
            category,
            peer_id: peer_id.to_string(),
            generation,
            tx,
        }
    }

    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    /// Post an event. Events sent after the owner is gone are dropped.
    pub fn emit(&self, kind: PeerEventKind) {
        let _ = self.tx.send(PeerEvent {
            category: self.category,
            peer_id: self.peer_id.clone(),
            generation: self.generation,
            kind,
        });
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PeerError {
    #[error("failed to create connection: {0}")]
    Create(String),
    #[error("failed to create offer: {0}")]
    Offer(String),
    #[error("failed to create answer: {0}")]
    Answer(String),
    #[error("failed to set local description: {0}")]
    LocalDescription(String),
    #[error("failed to set remote description: {0}")]
    RemoteDescription(String),
    #[error("failed to add ICE candidate: {0}")]
    Candidate(String),
    #[error("failed to update tracks: {0}")]
    Tracks(String),
    #[error("stats unavailable: {0}")]
    Stats(String),
    #[error("unexpected {0:?} description")]
    UnexpectedDescription(crate::protocol::SdpType),
}

impl PeerError {
    pub fn into_session_error(self, peer_id: &str) -> SessionError {
        SessionError::Negotiation {
            peer_id: peer_id.to_string(),
            reason: self.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Primitive
// ---------------------------------------------------------------------------

/// One peer-to-peer media connection (offer/answer/ICE). Provided by the
/// platform media stack.
#[async_trait]
pub trait PeerConnection: Send + Sync {
    async fn add_tracks(&self, stream: &LocalStream) -> Result<(), PeerError>;
    async fn remove_tracks(&self, stream: &LocalStream) -> Result<(), PeerError>;
    /// Swap the senders' tracks for those of `stream` without renegotiating.
    async fn replace_tracks(&self, stream: &LocalStream) -> Result<(), PeerError>;
    async fn create_offer(&self) -> Result<SessionDescription, PeerError>;
    async fn create_answer(&self) -> Result<SessionDescription, PeerError>;
    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), PeerError>;
    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), PeerError>;
    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), PeerError>;
    async fn stats(&self) -> Result<TransportStats, PeerError>;
    async fn close(&self);
}

/// Creates [`PeerConnection`]s bound to an event sender.
#[async_trait]
pub trait PeerConnectionFactory: Send + Sync {
    async fn create(
        &self,
        ice_servers: &[IceServerConfig],
        events: PeerEventSender,
    ) -> Result<Arc<dyn PeerConnection>, PeerError>;
}
