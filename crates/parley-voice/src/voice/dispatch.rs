//! Input loop and routing of commands and timer fires.

use parley_common::Notification;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::relay::RelayEvent;

use super::core::VoiceOrchestrator;
use super::session_clock::elapsed_secs;
use super::types::{Command, EndReason, Input, TimerEvent, VoiceEvent};

impl VoiceOrchestrator {
    /// Drive the orchestrator until the command channel closes.
    ///
    /// Relay events, user commands, peer callbacks, and timer fires are
    /// handled strictly one at a time.
    pub async fn run(
        mut self,
        mut relay_rx: mpsc::Receiver<RelayEvent>,
        mut command_rx: mpsc::Receiver<Command>,
    ) {
        let mut relay_open = true;
        loop {
            let input = tokio::select! {
                event = relay_rx.recv(), if relay_open => match event {
                    Some(event) => Input::Relay(event),
                    None => {
                        warn!("Relay event channel closed");
                        relay_open = false;
                        self.connected = false;
                        continue;
                    }
                },
                command = command_rx.recv() => match command {
                    Some(command) => Input::Command(command),
                    None => break,
                },
                Some(event) = self.peer_rx.recv() => Input::Peer(event),
                Some(event) = self.timer_rx.recv() => Input::Timer(event),
            };
            self.dispatch(input).await;
        }

        info!("Command channel closed; shutting down voice session");
        self.teardown(EndReason::Left, true).await;
    }

    /// Handle exactly one input to completion.
    pub async fn dispatch(&mut self, input: Input) {
        match input {
            Input::Relay(event) => self.handle_relay(event).await,
            Input::Command(command) => self.handle_command(command).await,
            Input::Peer(event) => self.handle_peer_event(event).await,
            Input::Timer(event) => self.handle_timer(event).await,
        }
    }

    pub(super) async fn handle_command(&mut self, command: Command) {
        debug!(?command, "Voice command");
        match command {
            Command::Join {
                channel_id,
                display_name,
            } => {
                if let Err(e) = self.join(&channel_id, &display_name).await {
                    self.report(e);
                }
            }
            Command::Disconnect => self.teardown(EndReason::Left, true).await,
            Command::ToggleMute => self.set_muted(!self.muted).await,
            Command::ToggleDeafen => self.set_deafened(!self.deafened).await,
            Command::ToggleCamera => self.toggle_camera().await,
            Command::KeyDown(key) => self.push_to_talk(&key, true),
            Command::KeyUp(key) => self.push_to_talk(&key, false),
            Command::StreamInterrupted => self.schedule_mic_recovery(),
            Command::SetForeground(foreground) => {
                self.foreground = foreground;
                if foreground {
                    self.schedule_mic_recovery();
                }
            }
            Command::StartScreenShare => {
                if !self.phase.is_active() {
                    self.deps.notifier.notify(Notification::info(
                        "Screen share",
                        "Join a voice channel to share your screen.",
                    ));
                    return;
                }
                if let Err(e) = self.screen_share.start_sharing().await {
                    debug!(error = %e, "Screen share not started");
                }
                self.render();
            }
            Command::StopScreenShare => {
                self.screen_share.stop_sharing().await;
                self.render();
            }
            Command::WatchScreenShare => {
                if let Err(e) = self.screen_share.watch().await {
                    self.deps
                        .notifier
                        .notify(Notification::info("Screen share", e.to_string()));
                }
            }
            Command::StopWatchingScreenShare => self.screen_share.stop_watching().await,
            Command::ScreenShareTrackEnded => {
                self.screen_share.handle_track_ended().await;
                self.render();
            }
        }
    }

    pub(super) async fn handle_timer(&mut self, event: TimerEvent) {
        match event {
            TimerEvent::JoinTimeout { attempt } => self.handle_join_timeout(&attempt).await,
            TimerEvent::MicRecovery => self.recover_microphone().await,
            TimerEvent::SessionTick => {
                if let Some(info) = self.active_info() {
                    let secs = elapsed_secs(info.started_at_ms, self.deps.clock.now_millis());
                    self.emit(VoiceEvent::SessionElapsed {
                        channel_id: info.channel_id.clone(),
                        secs,
                    });
                }
            }
            TimerEvent::StatsTick => self.sample_quality().await,
            TimerEvent::LevelPoll => self.poll_local_level(),
            TimerEvent::ScreenShareJoinRetry => self.screen_share.handle_join_retry().await,
        }
    }

    /// Next queued peer event or timer fire, for tests that step the
    /// orchestrator by hand.
    #[cfg(test)]
    pub(crate) async fn next_internal(&mut self) -> Input {
        tokio::select! {
            Some(event) = self.peer_rx.recv() => Input::Peer(event),
            Some(event) = self.timer_rx.recv() => Input::Timer(event),
        }
    }
}
