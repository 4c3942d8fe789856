//! Types and events for screenshare sessions.

use crate::media::RemoteTrack;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Local role in the bound channel's screenshare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScreenShareRole {
    #[default]
    Idle,
    /// The local user is sharing.
    Host,
    /// The local user is watching another participant's share.
    Viewer,
}

/// The participant currently sharing in the bound channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareHost {
    pub id: String,
    pub name: Option<String>,
}

impl ShareHost {
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Events emitted by the screenshare manager.
#[derive(Debug, Clone, PartialEq)]
pub enum ScreenShareEvent {
    /// Someone else started sharing in the bound channel.
    Available {
        channel_id: String,
        host_id: String,
        host_name: Option<String>,
    },
    HostingStarted {
        channel_id: String,
    },
    HostingStopped {
        channel_id: String,
    },
    Watching {
        channel_id: String,
        host_id: String,
    },
    StoppedWatching {
        channel_id: String,
    },
    /// The host's display track arrived.
    RemoteStream {
        host_id: String,
        track: RemoteTrack,
    },
    /// The channel has no active share any more.
    Ended {
        channel_id: String,
    },
}
