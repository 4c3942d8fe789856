//! Screenshare sessions: one host per channel, viewers receive the host's
//! display over a peer map separate from voice.

mod manager;
mod types;

#[cfg(test)]
mod tests;

pub use manager::ScreenShareManager;
pub use types::{ScreenShareEvent, ScreenShareRole, ShareHost};
