//! Relay message and peer event handlers.

use std::time::Duration;

use parley_common::{Notification, SessionError};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::media::TrackKind;
use crate::peer::{MediaCategory, PeerEvent, PeerEventKind};
use crate::protocol::{
    classify_error_code, signal_payload, ErrorScope, InboundMessage, OutboundMessage, PeerInfo,
    SdpType, SignalPayload, VideoKind,
};
use crate::relay::RelayEvent;

use super::core::VoiceOrchestrator;
use super::speaking::SpeakingDetector;
use super::types::{EndReason, Participant, VoiceEvent};

impl VoiceOrchestrator {
    pub(super) async fn handle_relay(&mut self, event: RelayEvent) {
        match event {
            RelayEvent::Connected => {
                self.connected = true;
                info!("Relay connected");
                if let Some(channel_id) = self.lost_channel.take() {
                    self.deps.notifier.notify(Notification::info(
                        "Reconnected",
                        format!("Join {channel_id} again to continue the conversation."),
                    ));
                }
            }
            RelayEvent::Disconnected { retrying } => {
                self.connected = false;
                let lost = self.phase.channel_id().map(str::to_string);
                if let Some(channel_id) = lost {
                    self.teardown(EndReason::TransportLost, false).await;
                    self.lost_channel = Some(channel_id);
                    if retrying {
                        warn!("Relay dropped; transport is reconnecting");
                    } else {
                        warn!("Relay dropped; voice session ended");
                        self.deps.notifier.notify(
                            Notification::error(
                                "Voice disconnected",
                                "Lost connection to the server.",
                            )
                            .retryable(),
                        );
                    }
                } else {
                    warn!(retrying, "Relay dropped");
                }
            }
            RelayEvent::Message(message) => self.handle_message(message).await,
        }
    }

    async fn handle_message(&mut self, message: InboundMessage) {
        match message {
            InboundMessage::SessionJoined {
                channel_id,
                peers,
                started_at,
                session_id,
            } => {
                self.handle_session_joined(channel_id, peers, started_at, session_id)
                    .await
            }
            InboundMessage::PeerJoined {
                id,
                name,
                muted,
                deafened,
            } => {
                if !self.phase.is_active() || id == self.deps.local_user_id {
                    return;
                }
                info!(peer_id = %id, "Peer joined voice");
                self.upsert_participant(&PeerInfo {
                    id,
                    name,
                    muted,
                    deafened,
                });
                self.render();
            }
            InboundMessage::PeerLeft { id } => {
                if self.participants.remove(&id).is_none() && !self.peers.contains(&id) {
                    return;
                }
                info!(peer_id = %id, "Peer left voice");
                self.peers.remove_peer(&id).await;
                self.quality.forget(&id);
                self.remote_speaking.remove(&id);
                self.render();
            }
            InboundMessage::PeerState {
                id,
                muted,
                deafened,
            } => {
                if let Some(p) = self.participants.get_mut(&id) {
                    p.muted = muted;
                    p.deafened = deafened;
                    self.render();
                }
            }
            InboundMessage::VideoState { id, kind, enabled } => {
                if let Some(p) = self.participants.get_mut(&id) {
                    match kind {
                        VideoKind::Camera => {
                            p.camera_enabled = enabled;
                            if !enabled {
                                p.video = None;
                            }
                        }
                        VideoKind::Screen => p.screen_enabled = enabled,
                    }
                    self.render();
                }
            }
            InboundMessage::Signal {
                from,
                sdp,
                candidate,
            } => {
                let Some(payload) = signal_payload(sdp, candidate) else {
                    debug!(from = %from, "Empty signal ignored");
                    return;
                };
                self.handle_voice_signal(&from, payload).await;
            }
            InboundMessage::ScreenshareSession {
                channel_id,
                active,
                host_id,
                host_name,
            } => {
                self.screen_share
                    .handle_session_state(&channel_id, active, host_id, host_name)
                    .await;
                self.render();
            }
            InboundMessage::ScreenshareSignal {
                from,
                channel_id,
                sdp,
                candidate,
            } => {
                if let Some(payload) = signal_payload(sdp, candidate) {
                    self.screen_share
                        .handle_signal(&from, &channel_id, payload)
                        .await;
                }
            }
            InboundMessage::ScreenshareViewerPending {
                channel_id,
                viewer_id,
                viewer_name,
            } => {
                self.screen_share
                    .handle_viewer_pending(&channel_id, &viewer_id, &viewer_name)
                    .await;
            }
            InboundMessage::Error { code, message } => self.handle_relay_error(code, message).await,
        }
    }

    async fn handle_voice_signal(&mut self, from: &str, payload: SignalPayload) {
        if !self.phase.is_active() || from == self.deps.local_user_id {
            debug!(from, "Voice signal outside an active session ignored");
            return;
        }
        let known = self.participants.contains_key(from) || self.peers.contains(from);
        let is_offer = matches!(&payload, SignalPayload::Sdp(desc) if desc.kind == SdpType::Offer);
        if !known {
            if !is_offer {
                debug!(from, "Signal from a peer outside the session dropped");
                return;
            }
            // An offer can beat the relay's peer-joined.
            self.participants
                .insert(from.to_string(), Participant::new(from, from));
        }

        match payload {
            SignalPayload::Sdp(desc) if desc.kind == SdpType::Offer => {
                let local = self.local_streams();
                match self.peers.handle_offer(from, desc, &local).await {
                    Ok(answer) => {
                        self.deps
                            .relay
                            .send(OutboundMessage::SendSignal {
                                peer_id: from.to_string(),
                                payload: SignalPayload::Sdp(answer),
                            })
                            .await;
                    }
                    Err(e) => warn!(peer_id = from, error = %e, "Could not answer peer"),
                }
            }
            SignalPayload::Sdp(desc) => {
                if let Err(e) = self.peers.handle_answer(from, desc).await {
                    warn!(peer_id = from, error = %e, "Peer answer rejected");
                }
            }
            SignalPayload::Candidate(candidate) => {
                if let Err(e) = self.peers.handle_ice_candidate(from, candidate).await {
                    warn!(peer_id = from, error = %e, "Peer candidate rejected");
                }
            }
        }
        self.render();
    }

    async fn handle_relay_error(&mut self, code: String, message: String) {
        match classify_error_code(&code) {
            ErrorScope::Session => {
                self.teardown(EndReason::Rejected { code: code.clone() }, false).await;
                self.report(SessionError::Relay { code, message });
            }
            ErrorScope::ScreenShare => {
                self.screen_share.handle_error(&code, &message).await;
                self.render();
            }
            ErrorScope::Notice => {
                self.deps
                    .notifier
                    .notify(Notification::warning("Voice", message.clone()));
                let err = SessionError::Relay { code, message };
                warn!(error = %err, "Relay error");
            }
        }
    }

    pub(super) async fn handle_peer_event(&mut self, event: PeerEvent) {
        if event.category == MediaCategory::ScreenShare {
            self.screen_share.handle_peer_event(event).await;
            return;
        }
        if !self.peers.is_current(&event.peer_id, event.generation) {
            debug!(peer_id = %event.peer_id, generation = event.generation, "Stale peer event ignored");
            return;
        }

        let peer_id = event.peer_id;
        match event.kind {
            PeerEventKind::IceCandidate(candidate) => {
                self.deps
                    .relay
                    .send(OutboundMessage::SendSignal {
                        peer_id,
                        payload: SignalPayload::Candidate(candidate),
                    })
                    .await;
            }
            PeerEventKind::Track(track) => {
                if let Some(p) = self.participants.get_mut(&peer_id) {
                    match track.kind {
                        TrackKind::Audio => p.audio = Some(track.clone()),
                        TrackKind::Video => p.video = Some(track.clone()),
                    }
                }
                self.emit(VoiceEvent::RemoteStream { peer_id, track });
                self.render();
            }
            PeerEventKind::StateChanged(state) => {
                let Some(state) = self
                    .peers
                    .handle_state_change(&peer_id, event.generation, state)
                    .await
                else {
                    return;
                };
                if let Some(p) = self.participants.get_mut(&peer_id) {
                    p.connection = Some(state);
                    if state.is_terminal() {
                        p.audio = None;
                        p.video = None;
                        p.speaking = false;
                    }
                }
                if state.is_terminal() {
                    warn!(peer_id = %peer_id, ?state, "Voice connection to peer ended");
                    self.quality.forget(&peer_id);
                    self.remote_speaking.remove(&peer_id);
                }
                self.render();
            }
            PeerEventKind::AudioLevel(level) => {
                let threshold = self.config.speaking_threshold;
                let release = Duration::from_millis(self.config.speaking_release_ms);
                let detector = self
                    .remote_speaking
                    .entry(peer_id.clone())
                    .or_insert_with(|| SpeakingDetector::new(threshold, release));
                if let Some(speaking) = detector.update(level, Instant::now()) {
                    if let Some(p) = self.participants.get_mut(&peer_id) {
                        p.speaking = speaking;
                        self.render();
                    }
                }
            }
        }
    }
}
