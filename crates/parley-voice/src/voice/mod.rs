//! Voice session orchestration.
//!
//! [`VoiceOrchestrator`] owns the whole session for one client: the join
//! state machine, participants, the voice peer map, local capture, the
//! screenshare manager, and quality monitoring. It consumes relay events,
//! user commands, peer callbacks, and its own timer fires one at a time.

mod capture;
mod core;
mod dispatch;
mod relay_handlers;
mod roster;
mod session;
mod session_clock;
mod speaking;
mod types;


pub use self::core::VoiceOrchestrator;
pub use session_clock::{elapsed_secs, sanitize_started_at};
pub use speaking::SpeakingDetector;
pub use types::{
    Command, EndReason, Input, Participant, RosterEntry, SessionDeps, SessionPhase, TimerEvent,
    VoiceEvent, VoiceSessionInfo,
};
