//! Peer connection management.
//!
//! One [`PeerSessions`] map per media category. Each map owns its
//! connections and the candidates that arrived before a remote description.

mod candidates;
mod manager;
mod types;


pub use candidates::CandidateQueue;
pub use manager::PeerSessions;
pub use types::{
    ConnectionState, MediaCategory, PeerConnection, PeerConnectionFactory, PeerError, PeerEvent,
    PeerEventKind, PeerEventSender, TransportStats,
};
