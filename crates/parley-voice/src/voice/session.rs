//! Join, confirmation, timeout, and teardown of the voice session.

use std::time::Duration;

use parley_common::{new_correlation_id, Notification, SessionError};
use tracing::{debug, info, warn};

use crate::protocol::{OutboundMessage, PeerInfo, SignalPayload, Timestamp};

use super::core::{Phase, VoiceOrchestrator};
use super::session_clock::sanitize_started_at;
use super::types::{EndReason, Participant, TimerEvent, VoiceEvent, VoiceSessionInfo};

impl VoiceOrchestrator {
    pub(super) fn active_info(&self) -> Option<&VoiceSessionInfo> {
        match &self.phase {
            Phase::Active { info, .. } => Some(info),
            _ => None,
        }
    }

    /// Start joining `channel_id`. A repeat request for the channel already
    /// joining or joined is a no-op; a different channel replaces the
    /// current session.
    pub(super) async fn join(&mut self, channel_id: &str, display_name: &str) -> Result<(), SessionError> {
        if self.phase.channel_id() == Some(channel_id) {
            info!(channel_id, "Join ignored; already joining or in this channel");
            let body = if self.phase.is_active() {
                "You are already in this voice channel."
            } else {
                "Still connecting to this voice channel."
            };
            self.deps
                .notifier
                .notify(Notification::info("Voice", body));
            return Ok(());
        }
        if !self.connected {
            return Err(SessionError::NotConnected);
        }
        if !self.phase.is_idle() {
            self.teardown(EndReason::SwitchedChannel, true).await;
        }

        let attempt = new_correlation_id();
        info!(channel_id, attempt = %attempt, "Joining voice channel");
        self.phase = Phase::Joining {
            channel_id: channel_id.to_string(),
            display_name: display_name.to_string(),
            attempt: attempt.clone(),
        };
        self.lost_channel = None;
        self.join_timer.schedule(
            Duration::from_millis(self.config.join_timeout_ms),
            self.timer_tx.clone(),
            TimerEvent::JoinTimeout { attempt },
        );
        self.emit(VoiceEvent::PhaseChanged(self.phase()));

        self.ensure_microphone().await;

        self.deps
            .relay
            .send(OutboundMessage::JoinChannel {
                channel_id: channel_id.to_string(),
            })
            .await;
        self.deps
            .relay
            .send(OutboundMessage::JoinVoiceChannel {
                channel_id: channel_id.to_string(),
                name: display_name.to_string(),
                muted: self.muted,
                deafened: self.deafened,
            })
            .await;
        self.render();
        Ok(())
    }

    /// Relay confirmed a voice session. Only a confirmation for the pending
    /// attempt's channel activates it; a different session id for the
    /// active channel restarts the timer; anything else is stale.
    pub(super) async fn handle_session_joined(
        &mut self,
        channel_id: String,
        peers: Vec<PeerInfo>,
        started_at: Option<Timestamp>,
        session_id: Option<String>,
    ) {
        let started_at = started_at.and_then(|t| t.to_millis());
        let now = self.deps.clock.now_millis();
        let local_id = self.deps.local_user_id.clone();
        let remote: Vec<PeerInfo> = peers.into_iter().filter(|p| p.id != local_id).collect();

        match &mut self.phase {
            Phase::Joining {
                channel_id: pending,
                display_name,
                ..
            } if *pending == channel_id => {
                let display_name = display_name.clone();
                let info = VoiceSessionInfo {
                    channel_id,
                    session_id,
                    started_at_ms: sanitize_started_at(
                        started_at,
                        now,
                        None,
                        remote.len(),
                        self.config.session_drift_window_ms,
                    ),
                };
                self.activate(info, display_name, remote).await;
            }
            Phase::Active { info, .. } if info.channel_id == channel_id => {
                if session_id.is_some() && session_id != info.session_id {
                    info.started_at_ms = sanitize_started_at(
                        started_at,
                        now,
                        None,
                        remote.len(),
                        self.config.session_drift_window_ms,
                    );
                    info.session_id = session_id;
                    let info = info.clone();
                    info!(channel_id = %info.channel_id, session_id = ?info.session_id, "New voice session for channel; timer reset");
                    self.emit(VoiceEvent::SessionStarted(info));
                } else {
                    // Same session: only a reported start may move the timer.
                    if started_at.is_some() {
                        info.started_at_ms = sanitize_started_at(
                            started_at,
                            now,
                            Some(info.started_at_ms),
                            remote.len(),
                            self.config.session_drift_window_ms,
                        );
                    }
                    debug!(channel_id = %info.channel_id, "Repeated session confirmation");
                }
                for peer in &remote {
                    self.upsert_participant(peer);
                }
                self.render();
            }
            _ => {
                debug!(channel_id = %channel_id, "Stale session confirmation; leaving");
                self.deps
                    .relay
                    .send(OutboundMessage::LeaveVoiceChannel { channel_id })
                    .await;
            }
        }
    }

    async fn activate(&mut self, info: VoiceSessionInfo, display_name: String, remote: Vec<PeerInfo>) {
        self.join_timer.cancel();
        info!(
            channel_id = %info.channel_id,
            session_id = ?info.session_id,
            peers = remote.len(),
            "Voice session active"
        );

        let channel_id = info.channel_id.clone();
        self.phase = Phase::Active {
            info: info.clone(),
            display_name,
        };
        for peer in &remote {
            self.upsert_participant(peer);
        }
        self.screen_share.bind(&channel_id).await;
        self.start_session_timers();
        self.emit(VoiceEvent::PhaseChanged(self.phase()));
        self.emit(VoiceEvent::SessionStarted(info));

        for peer in &remote {
            self.offer_to(&peer.id).await;
        }
        self.render();
    }

    /// Open a voice connection to a peer already in the channel.
    pub(super) async fn offer_to(&mut self, peer_id: &str) {
        let local = self.local_streams();
        match self.peers.create_offer(peer_id, &local).await {
            Ok(Some(offer)) => {
                self.deps
                    .relay
                    .send(OutboundMessage::SendSignal {
                        peer_id: peer_id.to_string(),
                        payload: SignalPayload::Sdp(offer),
                    })
                    .await;
            }
            Ok(None) => debug!(peer_id, "Connection already in flight"),
            Err(e) => warn!(peer_id, error = %e, "Could not connect to peer"),
        }
    }

    pub(super) fn upsert_participant(&mut self, peer: &PeerInfo) {
        let entry = self
            .participants
            .entry(peer.id.clone())
            .or_insert_with(|| Participant::new(&peer.id, &peer.name));
        entry.display_name.clone_from(&peer.name);
        entry.muted = peer.muted;
        entry.deafened = peer.deafened;
    }

    fn start_session_timers(&mut self) {
        self.session_timer.repeat(
            Duration::from_millis(self.config.session_tick_ms),
            self.timer_tx.clone(),
            TimerEvent::SessionTick,
        );
        self.stats_timer.repeat(
            self.stats_interval,
            self.timer_tx.clone(),
            TimerEvent::StatsTick,
        );
        self.level_timer.repeat(
            Duration::from_millis(self.config.level_poll_ms),
            self.timer_tx.clone(),
            TimerEvent::LevelPoll,
        );
    }

    pub(super) async fn handle_join_timeout(&mut self, attempt: &str) {
        let channel_id = match &self.phase {
            Phase::Joining {
                channel_id,
                attempt: pending,
                ..
            } if pending == attempt => channel_id.clone(),
            _ => {
                debug!(attempt, "Stale join timeout ignored");
                return;
            }
        };

        self.teardown(EndReason::JoinTimedOut, true).await;
        self.report(SessionError::JoinTimeout(channel_id));
    }

    /// Log a session failure and tell the user about it.
    pub(super) fn report(&self, err: SessionError) {
        warn!(error = %err, "Voice session failed");
        let notification = match err {
            SessionError::NotConnected => {
                Notification::error("Cannot join voice", "Not connected to the server.").retryable()
            }
            SessionError::JoinTimeout(_) => Notification::error(
                "Could not join voice",
                "The server did not respond in time. Try joining again.",
            )
            .retryable(),
            SessionError::Relay { message, .. } => Notification::error("Voice error", message),
            other => Notification::error("Voice error", other.to_string()),
        };
        self.deps.notifier.notify(notification);
    }

    /// Release everything the session holds and return to idle.
    pub(super) async fn teardown(&mut self, reason: EndReason, send_leave: bool) {
        let Some(channel_id) = self.phase.channel_id().map(str::to_string) else {
            return;
        };
        info!(channel_id = %channel_id, ?reason, "Leaving voice session");

        self.join_timer.cancel();
        self.session_timer.cancel();
        self.stats_timer.cancel();
        self.level_timer.cancel();
        self.recovery_timer.cancel();

        if send_leave && self.connected {
            self.deps
                .relay
                .send(OutboundMessage::LeaveVoiceChannel {
                    channel_id: channel_id.clone(),
                })
                .await;
        }

        self.screen_share.unbind().await;
        self.peers.close_all().await;
        self.participants.clear();
        self.remote_speaking.clear();
        if self.local_speaking.reset() {
            self.emit(VoiceEvent::LocalSpeaking(false));
        }
        self.quality.reset();
        self.release_microphone();
        self.release_camera();
        self.ptt_held = false;

        self.phase = Phase::Idle;
        self.emit(VoiceEvent::PhaseChanged(self.phase()));
        self.emit(VoiceEvent::Ended { channel_id, reason });
        self.render();
    }

    pub(super) async fn sample_quality(&mut self) {
        if !self.phase.is_active() {
            return;
        }
        let samples = self.peers.sample_stats().await;
        let update = self.quality.ingest(samples);
        if update.entered_poor {
            self.deps.notifier.notify(Notification::warning(
                "Poor connection",
                "Voice quality is degraded. Others may hear you breaking up.",
            ));
        }
        self.emit(VoiceEvent::Quality(update.report));
        self.render();
    }
}
