//! VoiceOrchestrator struct definition and constructor.

use std::collections::HashMap;
use std::time::Duration;

use parley_config::{ParleyConfig, VoiceConfig, VoiceMode};
use tokio::sync::mpsc;
use tracing::debug;

use crate::media::LocalStream;
use crate::peer::{MediaCategory, PeerEvent, PeerSessions};
use crate::quality::QualityMonitor;
use crate::screen_share::ScreenShareManager;
use crate::timer::Timer;

use super::speaking::SpeakingDetector;
use super::types::{
    Participant, SessionDeps, SessionPhase, TimerEvent, VoiceEvent, VoiceSessionInfo,
};

/// Join lifecycle with the data each phase needs.
#[derive(Debug, Clone)]
pub(super) enum Phase {
    Idle,
    Joining {
        channel_id: String,
        display_name: String,
        /// Correlates the join timeout with this attempt.
        attempt: String,
    },
    Active {
        info: VoiceSessionInfo,
        display_name: String,
    },
}

impl Phase {
    pub(super) fn channel_id(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Joining { channel_id, .. } => Some(channel_id),
            Self::Active { info, .. } => Some(&info.channel_id),
        }
    }

    pub(super) fn display_name(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Joining { display_name, .. } | Self::Active { display_name, .. } => {
                Some(display_name)
            }
        }
    }

    pub(super) fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub(super) fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }
}

/// Owns one client's voice session: participants, the voice peer map, the
/// screenshare manager, quality monitoring, local capture, and timers.
///
/// All inputs are handled one at a time by [`VoiceOrchestrator::dispatch`];
/// peer callbacks and timers post into internal channels instead of
/// touching state.
pub struct VoiceOrchestrator {
    pub(super) deps: SessionDeps,
    pub(super) config: VoiceConfig,
    pub(super) stats_interval: Duration,
    pub(super) event_tx: mpsc::Sender<VoiceEvent>,

    // Internal inboxes
    pub(super) peer_rx: mpsc::UnboundedReceiver<PeerEvent>,
    pub(super) timer_tx: mpsc::UnboundedSender<TimerEvent>,
    pub(super) timer_rx: mpsc::UnboundedReceiver<TimerEvent>,

    // Session
    pub(super) phase: Phase,
    pub(super) connected: bool,
    /// Channel torn down by a transport drop, for the rejoin notice.
    pub(super) lost_channel: Option<String>,
    pub(super) participants: HashMap<String, Participant>,
    pub(super) peers: PeerSessions,
    pub(super) screen_share: ScreenShareManager,
    pub(super) quality: QualityMonitor,

    // Local media
    pub(super) mic: Option<LocalStream>,
    pub(super) camera: Option<LocalStream>,
    pub(super) muted: bool,
    pub(super) deafened: bool,
    pub(super) ptt_held: bool,
    pub(super) foreground: bool,
    pub(super) local_speaking: SpeakingDetector,
    pub(super) remote_speaking: HashMap<String, SpeakingDetector>,

    // Timers
    pub(super) join_timer: Timer,
    pub(super) session_timer: Timer,
    pub(super) stats_timer: Timer,
    pub(super) level_timer: Timer,
    pub(super) recovery_timer: Timer,
}

impl VoiceOrchestrator {
    /// Create an orchestrator. The relay transport is assumed connected
    /// until it reports otherwise.
    pub fn new(deps: SessionDeps, config: &ParleyConfig) -> (Self, mpsc::Receiver<VoiceEvent>) {
        let (event_tx, event_rx) = mpsc::channel(256);
        let (peer_tx, peer_rx) = mpsc::unbounded_channel();
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();

        let peers = PeerSessions::new(
            MediaCategory::Voice,
            deps.peers.clone(),
            config.ice.servers.clone(),
            peer_tx.clone(),
        );
        let share_peers = PeerSessions::new(
            MediaCategory::ScreenShare,
            deps.peers.clone(),
            config.ice.servers.clone(),
            peer_tx,
        );
        let screen_share = ScreenShareManager::new(
            &deps,
            share_peers,
            config.screen_share.clone(),
            event_tx.clone(),
            timer_tx.clone(),
        );
        let voice = config.voice.clone();
        let detector = SpeakingDetector::new(
            voice.speaking_threshold,
            Duration::from_millis(voice.speaking_release_ms),
        );

        let orchestrator = Self {
            deps,
            stats_interval: Duration::from_millis(config.quality.stats_interval_ms),
            quality: QualityMonitor::new(config.quality.clone()),
            config: voice,
            event_tx,
            peer_rx,
            timer_tx,
            timer_rx,
            phase: Phase::Idle,
            connected: true,
            lost_channel: None,
            participants: HashMap::new(),
            peers,
            screen_share,
            mic: None,
            camera: None,
            muted: false,
            deafened: false,
            ptt_held: false,
            foreground: true,
            local_speaking: detector,
            remote_speaking: HashMap::new(),
            join_timer: Timer::new(),
            session_timer: Timer::new(),
            stats_timer: Timer::new(),
            level_timer: Timer::new(),
            recovery_timer: Timer::new(),
        };
        (orchestrator, event_rx)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn phase(&self) -> SessionPhase {
        match &self.phase {
            Phase::Idle => SessionPhase::Idle,
            Phase::Joining { channel_id, .. } => SessionPhase::Joining {
                channel_id: channel_id.clone(),
            },
            Phase::Active { info, .. } => SessionPhase::Active(info.clone()),
        }
    }

    pub fn participant(&self, peer_id: &str) -> Option<&Participant> {
        self.participants.get(peer_id)
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn voice_peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_deafened(&self) -> bool {
        self.deafened
    }

    pub fn screen_share(&self) -> &ScreenShareManager {
        &self.screen_share
    }

    /// Whether local audio is currently allowed out.
    pub fn is_transmitting(&self) -> bool {
        let gate_open = match self.config.mode {
            VoiceMode::Vad => true,
            VoiceMode::Ptt => self.ptt_held,
        };
        !self.muted && !self.deafened && gate_open
    }

    pub(super) fn emit(&self, event: VoiceEvent) {
        if self.event_tx.try_send(event).is_err() {
            debug!("Voice event channel full or closed; event dropped");
        }
    }

    pub(super) fn local_streams(&self) -> Vec<LocalStream> {
        self.mic.iter().chain(self.camera.iter()).cloned().collect()
    }
}
