//! Local capture devices and the streams they produce.

use async_trait::async_trait;

use parley_common::SessionError;

/// Audio or video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

/// A single locally captured track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaTrack {
    pub id: String,
    pub kind: TrackKind,
    pub label: String,
}

/// A locally captured stream (microphone, camera, or display).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalStream {
    pub id: String,
    pub tracks: Vec<MediaTrack>,
}

impl LocalStream {
    pub fn has_kind(&self, kind: TrackKind) -> bool {
        self.tracks.iter().any(|t| t.kind == kind)
    }
}

/// A track received from a remote peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    pub id: String,
    pub stream_id: String,
    pub kind: TrackKind,
}

/// Which capture device a permission query refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Microphone,
    Camera,
    Display,
}

/// OS-level permission state for a capture device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Prompt,
    Denied,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaError {
    #[error("permission denied for {0:?}")]
    PermissionDenied(DeviceKind),
    #[error("no {0:?} device found")]
    NotFound(DeviceKind),
    #[error("capture failed: {0}")]
    Other(String),
}

impl MediaError {
    /// Text telling the user what to do about the failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::PermissionDenied(DeviceKind::Microphone) => {
                "Microphone access is blocked. Allow it in your system privacy settings, then unmute."
                    .into()
            }
            Self::PermissionDenied(DeviceKind::Camera) => {
                "Camera access is blocked. Allow it in your system privacy settings and try again."
                    .into()
            }
            Self::PermissionDenied(DeviceKind::Display) => {
                "Screen recording permission is required to share your screen.".into()
            }
            Self::NotFound(DeviceKind::Microphone) => {
                "No microphone was found. Connect one and unmute to retry.".into()
            }
            Self::NotFound(DeviceKind::Camera) => "No camera was found.".into(),
            Self::NotFound(DeviceKind::Display) => "No display is available to share.".into(),
            Self::Other(reason) => format!("Could not start capture: {reason}"),
        }
    }
}

impl From<MediaError> for SessionError {
    fn from(e: MediaError) -> Self {
        SessionError::Device(e.to_string())
    }
}

/// Capture device provider.
///
/// Handles returned by `acquire_*` are owned by the caller until passed
/// back to [`MediaCapture::stop`].
#[async_trait]
pub trait MediaCapture: Send + Sync {
    async fn acquire_microphone(&self) -> Result<LocalStream, MediaError>;
    async fn acquire_camera(&self) -> Result<LocalStream, MediaError>;
    async fn acquire_display(&self) -> Result<LocalStream, MediaError>;
    async fn permission_status(&self, device: DeviceKind) -> PermissionStatus;

    /// Release the device behind `stream`.
    fn stop(&self, stream: &LocalStream);
    /// Gate a stream's tracks without releasing the device.
    fn set_enabled(&self, stream: &LocalStream, enabled: bool);
    /// Current input level of an audio stream in `[0, 1]`.
    fn input_level(&self, stream: &LocalStream) -> Option<f64>;
}
