//! Relay wire protocol.
//!
//! Every frame is a JSON object tagged by `"event"` with a kebab-case name
//! and camelCase fields. Inbound and outbound frames are separate enums so
//! the dispatcher can match exhaustively on what the relay may send.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Signaling payloads
// ---------------------------------------------------------------------------

/// Offer or answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
}

/// SDP offer/answer payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// ICE candidate for NAT traversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(rename = "sdpMid", default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(
        rename = "sdpMLineIndex",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sdp_m_line_index: Option<u16>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_m_line_index: None,
        }
    }
}

/// What one signaling message carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalPayload {
    Sdp(SessionDescription),
    Candidate(IceCandidate),
}

// ---------------------------------------------------------------------------
// Shared types
// ---------------------------------------------------------------------------

/// Which video source a video-state message refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoKind {
    Camera,
    Screen,
}

/// A participant as announced by the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub deafened: bool,
}

/// Session start time as sent by the relay: epoch milliseconds or RFC 3339.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Millis(i64),
    Text(String),
}

impl Timestamp {
    /// Epoch milliseconds, or `None` if the text form does not parse.
    pub fn to_millis(&self) -> Option<i64> {
        match self {
            Self::Millis(ms) => Some(*ms),
            Self::Text(text) => chrono::DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.timestamp_millis()),
        }
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Messages the relay delivers to this client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum InboundMessage {
    PeerJoined {
        id: String,
        name: String,
        #[serde(default)]
        muted: bool,
        #[serde(default)]
        deafened: bool,
    },
    PeerLeft {
        id: String,
    },
    PeerState {
        id: String,
        muted: bool,
        deafened: bool,
    },
    VideoState {
        id: String,
        #[serde(rename = "type")]
        kind: VideoKind,
        enabled: bool,
    },
    Signal {
        from: String,
        #[serde(default)]
        sdp: Option<SessionDescription>,
        #[serde(default)]
        candidate: Option<IceCandidate>,
    },
    SessionJoined {
        channel_id: String,
        #[serde(default)]
        peers: Vec<PeerInfo>,
        #[serde(default)]
        started_at: Option<Timestamp>,
        #[serde(default)]
        session_id: Option<String>,
    },
    ScreenshareSession {
        channel_id: String,
        active: bool,
        #[serde(default)]
        host_id: Option<String>,
        #[serde(default)]
        host_name: Option<String>,
    },
    ScreenshareSignal {
        from: String,
        channel_id: String,
        #[serde(default)]
        sdp: Option<SessionDescription>,
        #[serde(default)]
        candidate: Option<IceCandidate>,
    },
    ScreenshareViewerPending {
        channel_id: String,
        viewer_id: String,
        viewer_name: String,
    },
    Error {
        code: String,
        message: String,
    },
}

/// Collapse the `sdp | candidate` pair of a signal frame into one payload.
/// An SDP wins if a malformed frame carries both.
pub fn signal_payload(
    sdp: Option<SessionDescription>,
    candidate: Option<IceCandidate>,
) -> Option<SignalPayload> {
    match (sdp, candidate) {
        (Some(sdp), _) => Some(SignalPayload::Sdp(sdp)),
        (None, Some(candidate)) => Some(SignalPayload::Candidate(candidate)),
        (None, None) => None,
    }
}

/// How the orchestrator reacts to a relay-reported error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    /// Tear the whole voice session down.
    Session,
    /// Tear down only the screenshare session.
    ScreenShare,
    /// Show a notice; nothing is torn down.
    Notice,
}

pub fn classify_error_code(code: &str) -> ErrorScope {
    match code {
        "join-failed" | "channel-full" | "not-authorized" | "session-expired" => {
            ErrorScope::Session
        }
        c if c.starts_with("screenshare-") => ErrorScope::ScreenShare,
        _ => ErrorScope::Notice,
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Messages this client sends to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum OutboundMessage {
    JoinChannel {
        channel_id: String,
    },
    JoinVoiceChannel {
        channel_id: String,
        name: String,
        muted: bool,
        deafened: bool,
    },
    LeaveVoiceChannel {
        channel_id: String,
    },
    UpdateVoiceState {
        muted: bool,
        deafened: bool,
    },
    UpdateVideoState {
        #[serde(rename = "type")]
        kind: VideoKind,
        enabled: bool,
    },
    SendSignal {
        peer_id: String,
        payload: SignalPayload,
    },
    StartScreenshare {
        channel_id: String,
    },
    StopScreenshare {
        channel_id: String,
    },
    JoinScreenshareChannel {
        channel_id: String,
    },
    LeaveScreenshareChannel {
        channel_id: String,
    },
    SendScreenshareSignal {
        peer_id: String,
        payload: SignalPayload,
        channel_id: String,
    },
}

/// Parse one JSON text frame from the relay.
pub fn parse_inbound(text: &str) -> Result<InboundMessage, serde_json::Error> {
    serde_json::from_str(text)
}

/// Encode one outbound message as a JSON text frame.
pub fn encode_outbound(msg: &OutboundMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(msg)
}
