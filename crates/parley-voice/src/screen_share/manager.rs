//! Screenshare session manager: host/viewer roles for the bound channel and
//! the screenshare peer map.

use std::sync::Arc;
use std::time::Duration;

use parley_common::{Notification, SessionError};
use parley_config::ScreenShareConfig;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::media::{LocalStream, MediaCapture};
use crate::peer::{PeerEvent, PeerEventKind, PeerSessions};
use crate::protocol::{OutboundMessage, SdpType, SignalPayload, VideoKind};
use crate::relay::RelayHandle;
use crate::sinks::NotificationSink;
use crate::timer::Timer;
use crate::voice::{SessionDeps, TimerEvent, VoiceEvent};

use super::types::{ScreenShareEvent, ScreenShareRole, ShareHost};

// ---------------------------------------------------------------------------
// Screen Share Manager
// ---------------------------------------------------------------------------

/// Screenshare state for one voice channel. Owned by the orchestrator; its
/// peer connections never mix with the voice peer map.
pub struct ScreenShareManager {
    local_user_id: String,
    relay: RelayHandle,
    capture: Arc<dyn MediaCapture>,
    notifier: Arc<dyn NotificationSink>,
    config: ScreenShareConfig,
    event_tx: mpsc::Sender<VoiceEvent>,
    timer_tx: mpsc::UnboundedSender<TimerEvent>,
    peers: PeerSessions,
    channel_id: Option<String>,
    role: ScreenShareRole,
    host: Option<ShareHost>,
    display: Option<LocalStream>,
    /// Viewer has received the host's offer; join retries stop.
    offer_received: bool,
    join_retry: Timer,
}

impl ScreenShareManager {
    pub fn new(
        deps: &SessionDeps,
        peers: PeerSessions,
        config: ScreenShareConfig,
        event_tx: mpsc::Sender<VoiceEvent>,
        timer_tx: mpsc::UnboundedSender<TimerEvent>,
    ) -> Self {
        Self {
            local_user_id: deps.local_user_id.clone(),
            relay: deps.relay.clone(),
            capture: Arc::clone(&deps.capture),
            notifier: Arc::clone(&deps.notifier),
            config,
            event_tx,
            timer_tx,
            peers,
            channel_id: None,
            role: ScreenShareRole::Idle,
            host: None,
            display: None,
            offer_received: false,
            join_retry: Timer::new(),
        }
    }

    pub fn role(&self) -> ScreenShareRole {
        self.role
    }

    pub fn host(&self) -> Option<&ShareHost> {
        self.host.as_ref()
    }

    pub fn channel_id(&self) -> Option<&str> {
        self.channel_id.as_deref()
    }

    pub fn is_hosting(&self) -> bool {
        self.role == ScreenShareRole::Host
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn has_peer(&self, peer_id: &str) -> bool {
        self.peers.contains(peer_id)
    }

    /// Whether viewer joins are still being repeated.
    pub fn is_requesting_stream(&self) -> bool {
        self.join_retry.is_armed()
    }

    // -----------------------------------------------------------------------
    // Channel binding
    // -----------------------------------------------------------------------

    /// Follow the screenshare of `channel_id`. Rebinding to another channel
    /// tears down whatever the previous one had.
    pub async fn bind(&mut self, channel_id: &str) {
        if self.channel_id.as_deref() == Some(channel_id) {
            return;
        }
        self.unbind().await;
        debug!(channel_id, "Screenshare bound to channel");
        self.channel_id = Some(channel_id.to_string());
    }

    /// Leave the bound channel's screenshare entirely.
    pub async fn unbind(&mut self) {
        match self.role {
            ScreenShareRole::Host => self.stop_sharing().await,
            ScreenShareRole::Viewer => self.stop_watching().await,
            ScreenShareRole::Idle => {}
        }
        self.teardown_local().await;
        self.host = None;
        self.channel_id = None;
    }

    // -----------------------------------------------------------------------
    // Host
    // -----------------------------------------------------------------------

    /// Start sharing the local display in the bound channel.
    pub async fn start_sharing(&mut self) -> Result<(), SessionError> {
        let Some(channel_id) = self.channel_id.clone() else {
            return Err(SessionError::InvalidState("not in a voice channel".into()));
        };
        if self.is_hosting() {
            return Ok(());
        }
        if let Some(host) = self.host.as_ref().filter(|h| h.id != self.local_user_id) {
            let body = format!("{} is already sharing their screen.", host.label());
            self.notifier
                .notify(Notification::warning("Screen share unavailable", body.clone()));
            return Err(SessionError::InvalidState(body));
        }

        let display = match self.capture.acquire_display().await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(channel_id = %channel_id, error = %e, "Display capture failed");
                self.notifier.notify(
                    Notification::error("Screen share failed", e.user_message()).retryable(),
                );
                return Err(e.into());
            }
        };

        self.display = Some(display);
        self.role = ScreenShareRole::Host;
        self.host = Some(ShareHost {
            id: self.local_user_id.clone(),
            name: None,
        });
        self.relay
            .send(OutboundMessage::StartScreenshare {
                channel_id: channel_id.clone(),
            })
            .await;
        self.announce_screen(true).await;
        info!(channel_id = %channel_id, "Screen share started");
        self.emit(ScreenShareEvent::HostingStarted { channel_id });
        Ok(())
    }

    /// Stop hosting. No-op unless the local user is the host.
    pub async fn stop_sharing(&mut self) {
        if !self.is_hosting() {
            return;
        }
        if let Some(channel_id) = self.channel_id.clone() {
            self.relay
                .send(OutboundMessage::StopScreenshare {
                    channel_id: channel_id.clone(),
                })
                .await;
            info!(channel_id = %channel_id, "Screen share stopped");
        }
        self.end_hosting().await;
        self.host = None;
    }

    /// The display track ended outside the app.
    pub async fn handle_track_ended(&mut self) {
        if self.is_hosting() {
            info!("Display capture ended; stopping screen share");
            self.stop_sharing().await;
        }
    }

    /// A viewer asked for the stream: offer it the display tracks.
    pub async fn handle_viewer_pending(
        &mut self,
        channel_id: &str,
        viewer_id: &str,
        viewer_name: &str,
    ) {
        if !self.is_bound(channel_id) || !self.is_hosting() {
            debug!(channel_id, viewer_id, "Viewer request ignored; not hosting");
            return;
        }
        let local: Vec<LocalStream> = self.display.iter().cloned().collect();
        match self.peers.create_offer(viewer_id, &local).await {
            Ok(Some(offer)) => {
                info!(channel_id, viewer_id, viewer_name, "Offering screen share to viewer");
                self.send_signal(viewer_id, SignalPayload::Sdp(offer)).await;
            }
            Ok(None) => debug!(viewer_id, "Viewer already connected"),
            Err(e) => warn!(viewer_id, error = %e, "Offer to viewer failed"),
        }
    }

    // -----------------------------------------------------------------------
    // Viewer
    // -----------------------------------------------------------------------

    /// Start watching the current host's share.
    pub async fn watch(&mut self) -> Result<(), SessionError> {
        let Some(channel_id) = self.channel_id.clone() else {
            return Err(SessionError::InvalidState("not in a voice channel".into()));
        };
        let Some(host) = self.host.clone().filter(|h| h.id != self.local_user_id) else {
            return Err(SessionError::InvalidState(
                "nobody is sharing in this channel".into(),
            ));
        };
        if self.role == ScreenShareRole::Viewer {
            return Ok(());
        }

        self.role = ScreenShareRole::Viewer;
        self.offer_received = false;
        self.request_stream(&channel_id).await;
        self.join_retry.repeat(
            Duration::from_millis(self.config.viewer_join_interval_ms),
            self.timer_tx.clone(),
            TimerEvent::ScreenShareJoinRetry,
        );
        info!(channel_id = %channel_id, host_id = %host.id, "Watching screen share");
        self.emit(ScreenShareEvent::Watching {
            channel_id,
            host_id: host.id,
        });
        Ok(())
    }

    /// Stop watching. No-op unless currently a viewer.
    pub async fn stop_watching(&mut self) {
        if self.role != ScreenShareRole::Viewer {
            return;
        }
        if let Some(channel_id) = self.channel_id.clone() {
            self.relay
                .send(OutboundMessage::LeaveScreenshareChannel {
                    channel_id: channel_id.clone(),
                })
                .await;
            self.emit(ScreenShareEvent::StoppedWatching { channel_id });
        }
        self.end_viewing().await;
    }

    /// Repeat the viewer join until the host's offer arrives.
    pub async fn handle_join_retry(&mut self) {
        if self.role != ScreenShareRole::Viewer || self.offer_received {
            self.join_retry.cancel();
            return;
        }
        if let Some(channel_id) = self.channel_id.clone() {
            debug!(channel_id = %channel_id, "Repeating screenshare viewer join");
            self.request_stream(&channel_id).await;
        }
    }

    // -----------------------------------------------------------------------
    // Relay input
    // -----------------------------------------------------------------------

    /// Apply the relay's view of who is hosting in the bound channel.
    pub async fn handle_session_state(
        &mut self,
        channel_id: &str,
        active: bool,
        host_id: Option<String>,
        host_name: Option<String>,
    ) {
        if !self.is_bound(channel_id) {
            debug!(channel_id, "Screenshare state for another channel ignored");
            return;
        }

        let host = match (active, host_id) {
            (true, Some(id)) => ShareHost {
                id,
                name: host_name,
            },
            _ => {
                if self.role != ScreenShareRole::Idle || self.host.is_some() {
                    info!(channel_id, "Screen share ended");
                    self.teardown_local().await;
                    self.host = None;
                    self.emit(ScreenShareEvent::Ended {
                        channel_id: channel_id.to_string(),
                    });
                }
                return;
            }
        };

        if host.id == self.local_user_id {
            self.host = Some(host);
            return;
        }

        let host_changed = self.host.as_ref().map(|h| &h.id) != Some(&host.id);
        match self.role {
            ScreenShareRole::Host => {
                info!(channel_id, host_id = %host.id, "Another participant took over screen sharing; switching to viewer");
                self.end_hosting().await;
                self.notifier.notify(Notification::info(
                    "Screen share",
                    format!("{} is now sharing their screen.", host.label()),
                ));
                self.host = Some(host);
                if let Err(e) = self.watch().await {
                    warn!(error = %e, "Could not switch to viewer");
                }
            }
            ScreenShareRole::Viewer if host_changed => {
                info!(channel_id, host_id = %host.id, "Screen share host changed; rejoining");
                self.end_viewing().await;
                self.host = Some(host);
                if let Err(e) = self.watch().await {
                    warn!(error = %e, "Could not rejoin screen share");
                }
            }
            ScreenShareRole::Viewer => {
                self.host = Some(host);
            }
            ScreenShareRole::Idle => {
                if host_changed {
                    self.emit(ScreenShareEvent::Available {
                        channel_id: channel_id.to_string(),
                        host_id: host.id.clone(),
                        host_name: host.name.clone(),
                    });
                }
                self.host = Some(host);
            }
        }
    }

    /// Route an SDP or candidate from the screenshare relay path.
    pub async fn handle_signal(&mut self, from: &str, channel_id: &str, payload: SignalPayload) {
        if !self.is_bound(channel_id) {
            debug!(from, channel_id, "Screenshare signal for another channel ignored");
            return;
        }

        match payload {
            SignalPayload::Sdp(desc) if desc.kind == SdpType::Offer => {
                let from_host = self.host.as_ref().is_some_and(|h| h.id == from);
                if self.role != ScreenShareRole::Viewer || !from_host {
                    debug!(from, "Unexpected screenshare offer ignored");
                    return;
                }
                match self.peers.handle_offer(from, desc, &[]).await {
                    Ok(answer) => {
                        self.offer_received = true;
                        self.join_retry.cancel();
                        self.send_signal(from, SignalPayload::Sdp(answer)).await;
                    }
                    Err(e) => self.fail_viewing(&e.into_session_error(from).to_string()).await,
                }
            }
            SignalPayload::Sdp(desc) => {
                if !self.is_hosting() {
                    debug!(from, "Screenshare answer while not hosting ignored");
                    return;
                }
                if let Err(e) = self.peers.handle_answer(from, desc).await {
                    warn!(viewer_id = from, error = %e, "Viewer answer rejected");
                }
            }
            SignalPayload::Candidate(candidate) => {
                let from_host = self.host.as_ref().is_some_and(|h| h.id == from);
                let expected = match self.role {
                    ScreenShareRole::Viewer => from_host,
                    ScreenShareRole::Host => self.peers.contains(from),
                    ScreenShareRole::Idle => false,
                };
                if !expected {
                    debug!(from, role = ?self.role, "Screenshare candidate from an unknown peer dropped");
                    return;
                }
                if let Err(e) = self.peers.handle_ice_candidate(from, candidate).await {
                    if self.role == ScreenShareRole::Viewer {
                        self.fail_viewing(&e.into_session_error(from).to_string()).await;
                    } else {
                        warn!(viewer_id = from, error = %e, "Viewer candidate rejected");
                    }
                }
            }
        }
    }

    /// A `screenshare-*` error code from the relay.
    pub async fn handle_error(&mut self, code: &str, message: &str) {
        warn!(code, message, "Screenshare error from relay");
        match self.role {
            ScreenShareRole::Viewer => self.fail_viewing(message).await,
            ScreenShareRole::Host => {
                self.stop_sharing().await;
                self.notifier
                    .notify(Notification::warning("Screen share stopped", message).retryable());
            }
            ScreenShareRole::Idle => {
                self.notifier
                    .notify(Notification::warning("Screen share", message).retryable());
            }
        }
    }

    /// An event from one of this manager's peer connections.
    pub async fn handle_peer_event(&mut self, event: PeerEvent) {
        if !self.peers.is_current(&event.peer_id, event.generation) {
            debug!(peer_id = %event.peer_id, "Stale screenshare peer event ignored");
            return;
        }
        match event.kind {
            PeerEventKind::IceCandidate(candidate) => {
                self.send_signal(&event.peer_id, SignalPayload::Candidate(candidate))
                    .await;
            }
            PeerEventKind::Track(track) => {
                self.emit(ScreenShareEvent::RemoteStream {
                    host_id: event.peer_id,
                    track,
                });
            }
            PeerEventKind::StateChanged(state) => {
                let applied = self
                    .peers
                    .handle_state_change(&event.peer_id, event.generation, state)
                    .await;
                if applied.is_some_and(|s| s.is_terminal()) && self.role == ScreenShareRole::Viewer
                {
                    self.fail_viewing("connection to the host was lost").await;
                }
            }
            PeerEventKind::AudioLevel(_) => {}
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn is_bound(&self, channel_id: &str) -> bool {
        self.channel_id.as_deref() == Some(channel_id)
    }

    async fn request_stream(&self, channel_id: &str) {
        self.relay
            .send(OutboundMessage::JoinScreenshareChannel {
                channel_id: channel_id.to_string(),
            })
            .await;
    }

    async fn send_signal(&self, peer_id: &str, payload: SignalPayload) {
        let Some(channel_id) = self.channel_id.clone() else {
            return;
        };
        self.relay
            .send(OutboundMessage::SendScreenshareSignal {
                peer_id: peer_id.to_string(),
                payload,
                channel_id,
            })
            .await;
    }

    async fn announce_screen(&self, enabled: bool) {
        self.relay
            .send(OutboundMessage::UpdateVideoState {
                kind: VideoKind::Screen,
                enabled,
            })
            .await;
    }

    /// Drop the local share without telling the relay to stop it.
    async fn end_hosting(&mut self) {
        self.peers.close_all().await;
        if let Some(display) = self.display.take() {
            self.capture.stop(&display);
        }
        self.role = ScreenShareRole::Idle;
        self.announce_screen(false).await;
        if let Some(channel_id) = self.channel_id.clone() {
            self.emit(ScreenShareEvent::HostingStopped { channel_id });
        }
    }

    async fn end_viewing(&mut self) {
        self.join_retry.cancel();
        self.peers.close_all().await;
        self.offer_received = false;
        self.role = ScreenShareRole::Idle;
    }

    /// Viewer-side failure: tear down only the screenshare and tell the user
    /// they can retry.
    async fn fail_viewing(&mut self, reason: &str) {
        warn!(reason, "Screen share viewing failed");
        if let Some(channel_id) = self.channel_id.clone() {
            self.relay
                .send(OutboundMessage::LeaveScreenshareChannel { channel_id })
                .await;
        }
        self.end_viewing().await;
        self.notifier.notify(
            Notification::warning(
                "Screen share interrupted",
                "Could not receive the shared screen. Try watching again.",
            )
            .retryable(),
        );
    }

    async fn teardown_local(&mut self) {
        match self.role {
            ScreenShareRole::Host => self.end_hosting().await,
            ScreenShareRole::Viewer => self.end_viewing().await,
            ScreenShareRole::Idle => self.peers.close_all().await,
        }
    }

    fn emit(&self, event: ScreenShareEvent) {
        if self.event_tx.try_send(VoiceEvent::ScreenShare(event)).is_err() {
            debug!("Voice event channel full or closed; screenshare event dropped");
        }
    }
}
