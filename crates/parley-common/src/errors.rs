use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Failures scoped to a voice or screenshare session. None of these are
/// fatal to the host process.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("negotiation with {peer_id} failed: {reason}")]
    Negotiation { peer_id: String, reason: String },

    #[error("device error: {0}")]
    Device(String),

    #[error("relay error {code}: {message}")]
    Relay { code: String, message: String },

    #[error("no confirmation for channel {0} before the join timeout")]
    JoinTimeout(String),

    #[error("not connected to the relay")]
    NotConnected,

    #[error("invalid state: {0}")]
    InvalidState(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ParleyError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
