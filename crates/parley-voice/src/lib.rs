//! Real-time voice and video session orchestration.
//!
//! Manages peer-to-peer audio/video connections among the participants of a
//! voice channel, mediated by a signaling relay. Media transport, capture
//! devices, and the relay connection itself are collaborators behind traits;
//! this crate is the coordination layer.

pub mod media;
pub mod peer;
pub mod protocol;
pub mod quality;
pub mod relay;
pub mod screen_share;
pub mod sinks;
pub mod voice;

mod timer;

#[cfg(test)]
mod testing;

pub use media::{
    DeviceKind, LocalStream, MediaCapture, MediaError, MediaTrack, PermissionStatus, RemoteTrack,
    TrackKind,
};
pub use peer::{
    ConnectionState, MediaCategory, PeerConnection, PeerConnectionFactory, PeerError, PeerEvent,
    PeerEventKind, PeerEventSender, PeerSessions, TransportStats,
};
pub use protocol::{InboundMessage, OutboundMessage, SignalPayload};
pub use quality::{estimate_mos, QualityBucket, QualityMonitor, QualityReport};
pub use relay::{RelayEvent, RelayHandle};
pub use screen_share::{ScreenShareEvent, ScreenShareManager, ScreenShareRole};
pub use sinks::{Clock, NotificationSink, RosterSink, SystemClock};
pub use voice::{
    Command, EndReason, RosterEntry, SessionDeps, SessionPhase, VoiceEvent, VoiceOrchestrator,
    VoiceSessionInfo,
};
