//! Local capture: microphone gating, mute/deafen, push-to-talk, camera,
//! speaking detection, and microphone recovery.

use std::time::Duration;

use parley_common::Notification;
use parley_config::VoiceMode;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::media::{DeviceKind, LocalStream, MediaError, PermissionStatus};
use crate::protocol::{OutboundMessage, SignalPayload, VideoKind};

use super::core::VoiceOrchestrator;
use super::types::{TimerEvent, VoiceEvent};

impl VoiceOrchestrator {
    // -----------------------------------------------------------------------
    // Microphone
    // -----------------------------------------------------------------------

    /// Acquire the microphone unless already held. Device failures force
    /// mute and are reported; the session carries on without audio.
    pub(super) async fn ensure_microphone(&mut self) -> bool {
        if self.mic.is_some() {
            return true;
        }
        let capture = self.deps.capture.clone();
        if capture.permission_status(DeviceKind::Microphone).await == PermissionStatus::Denied {
            self.device_failure(MediaError::PermissionDenied(DeviceKind::Microphone));
            return false;
        }
        match capture.acquire_microphone().await {
            Ok(stream) => {
                debug!(stream_id = %stream.id, "Microphone acquired");
                self.mic = Some(stream);
                self.apply_gate();
                true
            }
            Err(e) => {
                self.device_failure(e);
                false
            }
        }
    }

    pub(super) fn release_microphone(&mut self) {
        if let Some(mic) = self.mic.take() {
            debug!(stream_id = %mic.id, "Microphone released");
            self.deps.capture.stop(&mic);
        }
    }

    pub(super) fn release_camera(&mut self) {
        if let Some(camera) = self.camera.take() {
            self.deps.capture.stop(&camera);
        }
    }

    fn device_failure(&mut self, error: MediaError) {
        warn!(error = %error, "Capture device unavailable; muting");
        self.muted = true;
        self.apply_gate();
        self.deps.notifier.notify(
            Notification::error("Microphone unavailable", error.user_message()).retryable(),
        );
    }

    /// Open or close the microphone gate to match mute, deafen, and
    /// push-to-talk state.
    pub(super) fn apply_gate(&mut self) {
        let open = self.is_transmitting();
        if let Some(mic) = &self.mic {
            self.deps.capture.set_enabled(mic, open);
        }
        if !open && self.local_speaking.reset() {
            self.emit(VoiceEvent::LocalSpeaking(false));
        }
    }

    /// Attach a newly acquired stream to every voice peer and re-offer.
    async fn publish_stream(&mut self, stream: &LocalStream) {
        self.peers.attach_stream(stream).await;
        self.renegotiate_all().await;
    }

    async fn renegotiate_all(&mut self) {
        for peer_id in self.peers.peer_ids() {
            match self.peers.renegotiate(&peer_id).await {
                Ok(Some(offer)) => {
                    self.deps
                        .relay
                        .send(OutboundMessage::SendSignal {
                            peer_id,
                            payload: SignalPayload::Sdp(offer),
                        })
                        .await;
                }
                Ok(None) => {}
                Err(e) => warn!(peer_id = %peer_id, error = %e, "Renegotiation failed"),
            }
        }
    }

    async fn announce_voice_state(&self) {
        if self.phase.is_idle() {
            return;
        }
        self.deps
            .relay
            .send(OutboundMessage::UpdateVoiceState {
                muted: self.muted,
                deafened: self.deafened,
            })
            .await;
    }

    // -----------------------------------------------------------------------
    // Mute / deafen / push-to-talk
    // -----------------------------------------------------------------------

    pub(super) async fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        info!(muted, "Mute toggled");

        if self.phase.is_idle() {
            if muted {
                self.release_microphone();
            }
        } else {
            if !muted && self.mic.is_none() && self.ensure_microphone().await {
                if let Some(mic) = self.mic.clone() {
                    self.publish_stream(&mic).await;
                }
            }
            self.apply_gate();
            self.announce_voice_state().await;
        }
        self.render();
    }

    pub(super) async fn set_deafened(&mut self, deafened: bool) {
        self.deafened = deafened;
        info!(deafened, "Deafen toggled");
        self.apply_gate();
        self.announce_voice_state().await;
        self.render();
    }

    pub(super) fn push_to_talk(&mut self, key: &str, pressed: bool) {
        if self.config.mode != VoiceMode::Ptt || key != self.config.ptt.key {
            return;
        }
        if self.ptt_held == pressed {
            return;
        }
        self.ptt_held = pressed;
        debug!(pressed, "Push-to-talk");
        self.apply_gate();
        self.render();
    }

    // -----------------------------------------------------------------------
    // Camera
    // -----------------------------------------------------------------------

    pub(super) async fn toggle_camera(&mut self) {
        if !self.phase.is_active() {
            self.deps.notifier.notify(Notification::info(
                "Camera",
                "Join a voice channel to turn on your camera.",
            ));
            return;
        }

        let enabled = if let Some(camera) = self.camera.take() {
            self.peers.detach_stream(&camera).await;
            self.deps.capture.stop(&camera);
            self.renegotiate_all().await;
            false
        } else {
            match self.deps.capture.acquire_camera().await {
                Ok(camera) => {
                    self.publish_stream(&camera).await;
                    self.camera = Some(camera);
                    true
                }
                Err(e) => {
                    warn!(error = %e, "Camera unavailable");
                    self.deps.notifier.notify(
                        Notification::error("Camera unavailable", e.user_message()).retryable(),
                    );
                    return;
                }
            }
        };

        info!(enabled, "Camera toggled");
        self.deps
            .relay
            .send(OutboundMessage::UpdateVideoState {
                kind: VideoKind::Camera,
                enabled,
            })
            .await;
        self.render();
    }

    // -----------------------------------------------------------------------
    // Speaking
    // -----------------------------------------------------------------------

    pub(super) fn poll_local_level(&mut self) {
        let level = match &self.mic {
            Some(mic) if self.phase.is_active() && self.is_transmitting() => {
                self.deps.capture.input_level(mic).unwrap_or(0.0)
            }
            _ => {
                if self.local_speaking.reset() {
                    self.emit(VoiceEvent::LocalSpeaking(false));
                    self.render();
                }
                return;
            }
        };
        if let Some(speaking) = self.local_speaking.update(level, Instant::now()) {
            self.emit(VoiceEvent::LocalSpeaking(speaking));
            self.render();
        }
    }

    // -----------------------------------------------------------------------
    // Recovery
    // -----------------------------------------------------------------------

    /// Debounce a microphone re-acquisition; repeated triggers collapse
    /// into one.
    pub(super) fn schedule_mic_recovery(&mut self) {
        self.recovery_timer.schedule(
            Duration::from_millis(self.config.mic_recovery_debounce_ms),
            self.timer_tx.clone(),
            TimerEvent::MicRecovery,
        );
    }

    pub(super) async fn recover_microphone(&mut self) {
        if self.phase.is_idle() || !self.foreground || self.muted {
            debug!(
                foreground = self.foreground,
                muted = self.muted,
                "Microphone recovery skipped"
            );
            return;
        }

        let previous = self.mic.take();
        if let Some(old) = &previous {
            self.deps.capture.stop(old);
        }
        match self.deps.capture.acquire_microphone().await {
            Ok(stream) => {
                info!(stream_id = %stream.id, "Microphone recovered");
                if previous.is_some() {
                    self.peers.replace_stream(&stream).await;
                } else {
                    self.publish_stream(&stream).await;
                }
                self.mic = Some(stream);
                self.apply_gate();
            }
            Err(e) => {
                self.device_failure(e);
                self.announce_voice_state().await;
            }
        }
        self.render();
    }
}
