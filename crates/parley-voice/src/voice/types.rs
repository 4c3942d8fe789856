//! Types, commands, and events for the voice session orchestrator.

use std::sync::Arc;

use serde::Serialize;

use crate::media::{MediaCapture, RemoteTrack};
use crate::peer::{ConnectionState, PeerConnectionFactory, PeerEvent};
use crate::quality::{QualityBucket, QualityReport};
use crate::relay::{RelayEvent, RelayHandle};
use crate::screen_share::ScreenShareEvent;
use crate::sinks::{Clock, NotificationSink, RosterSink};

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Identity and start time of a confirmed voice session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceSessionInfo {
    pub channel_id: String,
    /// Relay-assigned id; a different id for the same channel is a new
    /// session.
    pub session_id: Option<String>,
    /// Epoch milliseconds, already sanitized.
    pub started_at_ms: i64,
}

/// Where the orchestrator is in the join lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Joining { channel_id: String },
    Active(VoiceSessionInfo),
}

impl SessionPhase {
    pub fn channel_id(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Joining { channel_id } => Some(channel_id),
            Self::Active(info) => Some(&info.channel_id),
        }
    }
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndReason {
    Left,
    SwitchedChannel,
    TransportLost,
    JoinTimedOut,
    Rejected { code: String },
}

/// One remote participant, owned by the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub id: String,
    pub display_name: String,
    pub muted: bool,
    pub deafened: bool,
    pub speaking: bool,
    pub camera_enabled: bool,
    pub screen_enabled: bool,
    pub audio: Option<RemoteTrack>,
    pub video: Option<RemoteTrack>,
    pub connection: Option<ConnectionState>,
}

impl Participant {
    pub fn new(id: &str, display_name: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            muted: false,
            deafened: false,
            speaking: false,
            camera_enabled: false,
            screen_enabled: false,
            audio: None,
            video: None,
            connection: None,
        }
    }
}

/// One row of the rendered participant list.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    pub id: String,
    pub display_name: String,
    pub is_local: bool,
    pub muted: bool,
    pub deafened: bool,
    pub speaking: bool,
    pub camera_enabled: bool,
    pub screen_enabled: bool,
    pub audio: Option<RemoteTrack>,
    pub video: Option<RemoteTrack>,
    pub connection: Option<ConnectionState>,
    pub quality: QualityBucket,
    /// Remote audio must not be played (local user is deafened).
    pub playback_muted: bool,
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Local user actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Join {
        channel_id: String,
        display_name: String,
    },
    Disconnect,
    ToggleMute,
    ToggleDeafen,
    ToggleCamera,
    /// Key pressed; only the configured push-to-talk key matters.
    KeyDown(String),
    KeyUp(String),
    /// The capture stream stopped on its own (device unplugged, OS revoked).
    StreamInterrupted,
    /// Application moved to or from the foreground.
    SetForeground(bool),
    StartScreenShare,
    StopScreenShare,
    WatchScreenShare,
    StopWatchingScreenShare,
    /// The display capture track ended (user stopped it from the OS UI).
    ScreenShareTrackEnded,
}

/// Fired by the orchestrator's own timers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    JoinTimeout { attempt: String },
    MicRecovery,
    SessionTick,
    StatsTick,
    LevelPoll,
    ScreenShareJoinRetry,
}

/// Everything the orchestrator reacts to.
#[derive(Debug)]
pub enum Input {
    Relay(RelayEvent),
    Command(Command),
    Peer(PeerEvent),
    Timer(TimerEvent),
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// Events emitted by the orchestrator for the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceEvent {
    PhaseChanged(SessionPhase),
    SessionStarted(VoiceSessionInfo),
    /// Elapsed time of the active session, once per tick.
    SessionElapsed { channel_id: String, secs: u64 },
    LocalSpeaking(bool),
    Quality(QualityReport),
    RemoteStream { peer_id: String, track: RemoteTrack },
    ScreenShare(ScreenShareEvent),
    Ended { channel_id: String, reason: EndReason },
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Everything the orchestrator talks to outside its own state.
#[derive(Clone)]
pub struct SessionDeps {
    pub local_user_id: String,
    pub relay: RelayHandle,
    pub peers: Arc<dyn PeerConnectionFactory>,
    pub capture: Arc<dyn MediaCapture>,
    pub notifier: Arc<dyn NotificationSink>,
    pub roster: Arc<dyn RosterSink>,
    pub clock: Arc<dyn Clock>,
}
