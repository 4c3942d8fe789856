use std::sync::Arc;
use std::time::Duration;

use parley_common::NotificationLevel;
use parley_config::ScreenShareConfig;
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::*;
use crate::media::{DeviceKind, MediaError, RemoteTrack, TrackKind};
use crate::peer::{ConnectionState, MediaCategory, PeerEvent, PeerEventKind, PeerSessions};
use crate::protocol::{
    IceCandidate, OutboundMessage, SdpType, SessionDescription, SignalPayload, VideoKind,
};
use crate::relay::RelayHandle;
use crate::testing::{
    drain, ConnCall, FixedClock, MockCapture, MockFactory, RecordingNotifier, RecordingRoster,
};
use crate::voice::{SessionDeps, TimerEvent, VoiceEvent};

struct Harness {
    manager: ScreenShareManager,
    relay_rx: mpsc::Receiver<OutboundMessage>,
    events: mpsc::Receiver<VoiceEvent>,
    timer_rx: mpsc::UnboundedReceiver<TimerEvent>,
    peer_rx: mpsc::UnboundedReceiver<PeerEvent>,
    factory: Arc<MockFactory>,
    capture: Arc<MockCapture>,
    notifier: Arc<RecordingNotifier>,
}

impl Harness {
    fn new() -> Self {
        let factory = MockFactory::new();
        let capture = MockCapture::new();
        let notifier = RecordingNotifier::new();
        let (relay, relay_rx) = RelayHandle::channel(256);
        let deps = SessionDeps {
            local_user_id: "me".into(),
            relay,
            peers: factory.clone(),
            capture: capture.clone(),
            notifier: notifier.clone(),
            roster: RecordingRoster::new(),
            clock: FixedClock::new(0),
        };
        let (peer_tx, peer_rx) = mpsc::unbounded_channel();
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let (event_tx, events) = mpsc::channel(64);
        let peers = PeerSessions::new(
            MediaCategory::ScreenShare,
            deps.peers.clone(),
            Vec::new(),
            peer_tx,
        );
        let manager = ScreenShareManager::new(
            &deps,
            peers,
            ScreenShareConfig::default(),
            event_tx,
            timer_tx,
        );
        Self {
            manager,
            relay_rx,
            events,
            timer_rx,
            peer_rx,
            factory,
            capture,
            notifier,
        }
    }

    /// Bound to "general" with nothing else going on.
    async fn bound() -> Self {
        let mut h = Self::new();
        h.manager.bind("general").await;
        h
    }

    async fn hosting() -> Self {
        let mut h = Self::bound().await;
        h.manager.start_sharing().await.unwrap();
        h.sent();
        h.shares();
        h
    }

    /// Watching u2's share, offer not yet received.
    async fn viewing() -> Self {
        let mut h = Self::bound().await;
        h.host_is("u2").await;
        h.manager.watch().await.unwrap();
        h.sent();
        h.shares();
        h
    }

    async fn host_is(&mut self, host_id: &str) {
        self.manager
            .handle_session_state("general", true, Some(host_id.into()), Some("Bo".into()))
            .await;
    }

    async fn offer_from(&mut self, from: &str, channel_id: &str) {
        self.manager
            .handle_signal(
                from,
                channel_id,
                SignalPayload::Sdp(SessionDescription::offer("display")),
            )
            .await;
    }

    fn sent(&mut self) -> Vec<OutboundMessage> {
        drain(&mut self.relay_rx)
    }

    fn shares(&mut self) -> Vec<ScreenShareEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            if let VoiceEvent::ScreenShare(e) = event {
                out.push(e);
            }
        }
        out
    }
}

fn join_share() -> OutboundMessage {
    OutboundMessage::JoinScreenshareChannel {
        channel_id: "general".into(),
    }
}

fn screen_state(enabled: bool) -> OutboundMessage {
    OutboundMessage::UpdateVideoState {
        kind: VideoKind::Screen,
        enabled,
    }
}

// ---------------------------------------------------------------------------
// Hosting
// ---------------------------------------------------------------------------

#[tokio::test]
async fn start_sharing_announces_host() {
    let mut h = Harness::bound().await;
    h.manager.start_sharing().await.unwrap();

    assert_eq!(
        h.sent(),
        vec![
            OutboundMessage::StartScreenshare {
                channel_id: "general".into()
            },
            screen_state(true),
        ]
    );
    assert_eq!(h.manager.role(), ScreenShareRole::Host);
    assert_eq!(h.manager.host().unwrap().id, "me");
    assert_eq!(
        h.shares(),
        vec![ScreenShareEvent::HostingStarted {
            channel_id: "general".into()
        }]
    );
}

#[tokio::test]
async fn start_requires_bound_channel() {
    let mut h = Harness::new();
    assert!(h.manager.start_sharing().await.is_err());
    assert!(h.capture.acquired().is_empty());
}

#[tokio::test]
async fn start_rejected_while_someone_else_hosts() {
    let mut h = Harness::bound().await;
    h.host_is("u2").await;
    assert_eq!(
        h.shares(),
        vec![ScreenShareEvent::Available {
            channel_id: "general".into(),
            host_id: "u2".into(),
            host_name: Some("Bo".into()),
        }]
    );

    assert!(h.manager.start_sharing().await.is_err());
    assert!(h.capture.acquired().is_empty());
    assert!(h.sent().is_empty());
    let notice = h.notifier.last().unwrap();
    assert_eq!(notice.level, NotificationLevel::Warning);
    assert!(notice.body.contains("Bo is already sharing"));
}

#[tokio::test]
async fn display_failure_is_reported() {
    let mut h = Harness::bound().await;
    *h.capture.display_error.lock().unwrap() =
        Some(MediaError::PermissionDenied(DeviceKind::Display));

    assert!(h.manager.start_sharing().await.is_err());
    assert_eq!(h.manager.role(), ScreenShareRole::Idle);
    assert!(h.sent().is_empty());
    let notice = h.notifier.last().unwrap();
    assert_eq!(notice.level, NotificationLevel::Error);
    assert!(notice.retryable);
}

#[tokio::test]
async fn pending_viewer_gets_display_offer_once() {
    let mut h = Harness::hosting().await;

    h.manager
        .handle_viewer_pending("general", "u2", "Bo")
        .await;
    let conn = h.factory.connection("u2").unwrap();
    assert_eq!(
        conn.calls(),
        vec![
            ConnCall::AddTracks("display-1".into()),
            ConnCall::CreateOffer,
            ConnCall::SetLocal(SdpType::Offer),
        ]
    );
    let sent = h.sent();
    assert!(matches!(
        &sent[..],
        [OutboundMessage::SendScreenshareSignal { peer_id, channel_id, payload: SignalPayload::Sdp(_) }]
            if peer_id == "u2" && channel_id == "general"
    ));

    h.manager
        .handle_viewer_pending("general", "u2", "Bo")
        .await;
    assert_eq!(h.factory.created(), 1);
    assert!(h.sent().is_empty());

    h.manager
        .handle_signal(
            "u2",
            "general",
            SignalPayload::Sdp(SessionDescription::answer("a")),
        )
        .await;
    assert!(conn.calls().contains(&ConnCall::SetRemote(SdpType::Answer)));
}

#[tokio::test]
async fn host_drops_candidates_from_unknown_viewers() {
    let mut h = Harness::hosting().await;

    h.manager
        .handle_signal(
            "u2",
            "general",
            SignalPayload::Candidate(IceCandidate::new("stray")),
        )
        .await;
    assert_eq!(h.factory.created(), 0);

    h.manager
        .handle_viewer_pending("general", "u2", "Bo")
        .await;
    h.manager
        .handle_signal(
            "u2",
            "general",
            SignalPayload::Sdp(SessionDescription::answer("a")),
        )
        .await;
    h.manager
        .handle_signal(
            "u2",
            "general",
            SignalPayload::Candidate(IceCandidate::new("c1")),
        )
        .await;

    let conn = h.factory.connection("u2").unwrap();
    assert_eq!(conn.applied_candidates(), vec!["c1"]);
}

#[tokio::test]
async fn pending_viewer_ignored_unless_hosting() {
    let mut h = Harness::bound().await;
    h.manager
        .handle_viewer_pending("general", "u2", "Bo")
        .await;
    assert_eq!(h.factory.created(), 0);
    assert!(h.sent().is_empty());
}

#[tokio::test]
async fn track_ended_stops_sharing() {
    let mut h = Harness::hosting().await;
    h.manager
        .handle_viewer_pending("general", "u2", "Bo")
        .await;
    h.sent();

    h.manager.handle_track_ended().await;

    assert_eq!(
        h.sent(),
        vec![
            OutboundMessage::StopScreenshare {
                channel_id: "general".into()
            },
            screen_state(false),
        ]
    );
    assert_eq!(h.manager.role(), ScreenShareRole::Idle);
    assert_eq!(h.capture.stopped(), vec!["display-1"]);
    assert!(h.factory.connection("u2").unwrap().is_closed());
    assert!(h.manager.host().is_none());
}

#[tokio::test]
async fn another_host_demotes_local_host_to_viewer() {
    let mut h = Harness::hosting().await;
    h.manager
        .handle_viewer_pending("general", "u3", "Cy")
        .await;
    h.sent();

    h.host_is("u2").await;

    assert_eq!(h.manager.role(), ScreenShareRole::Viewer);
    assert_eq!(h.manager.host().unwrap().id, "u2");
    let sent = h.sent();
    assert_eq!(sent, vec![screen_state(false), join_share()]);
    assert!(h.capture.live().is_empty());
    assert!(h.factory.connection("u3").unwrap().is_closed());
    assert_eq!(h.notifier.last().unwrap().level, NotificationLevel::Info);
    assert!(h.shares().contains(&ScreenShareEvent::Watching {
        channel_id: "general".into(),
        host_id: "u2".into(),
    }));
}

// ---------------------------------------------------------------------------
// Viewing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn watch_requires_a_host() {
    let mut h = Harness::bound().await;
    assert!(h.manager.watch().await.is_err());
    assert_eq!(h.manager.role(), ScreenShareRole::Idle);
    assert!(h.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn viewer_join_repeats_until_offer_arrives() {
    let mut h = Harness::bound().await;
    h.host_is("u2").await;
    h.manager.watch().await.unwrap();
    assert_eq!(h.sent(), vec![join_share()]);
    assert!(h.manager.is_requesting_stream());

    for _ in 0..2 {
        let start = Instant::now();
        let fired = h.timer_rx.recv().await.unwrap();
        assert_eq!(fired, TimerEvent::ScreenShareJoinRetry);
        assert!(start.elapsed() >= Duration::from_millis(1_500));
        h.manager.handle_join_retry().await;
        assert_eq!(h.sent(), vec![join_share()]);
    }

    h.offer_from("u2", "general").await;
    let sent = h.sent();
    assert!(matches!(
        &sent[..],
        [OutboundMessage::SendScreenshareSignal { peer_id, payload: SignalPayload::Sdp(d), .. }]
            if peer_id == "u2" && d.kind == SdpType::Answer
    ));

    assert!(!h.manager.is_requesting_stream());
    assert!(h.manager.has_peer("u2"));

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(h.timer_rx.try_recv().is_err());
    assert_eq!(h.manager.role(), ScreenShareRole::Viewer);
}

#[tokio::test]
async fn offer_from_non_host_is_ignored() {
    let mut h = Harness::viewing().await;
    h.offer_from("u3", "general").await;
    assert_eq!(h.factory.created(), 0);
    assert!(h.sent().is_empty());
}

#[tokio::test]
async fn signals_for_other_channel_are_ignored() {
    let mut h = Harness::viewing().await;
    h.offer_from("u2", "random").await;
    assert_eq!(h.factory.created(), 0);
    assert!(h.sent().is_empty());
}

#[tokio::test]
async fn remote_display_track_is_emitted() {
    let mut h = Harness::viewing().await;
    h.offer_from("u2", "general").await;
    let conn = h.factory.connection("u2").unwrap();
    let track = RemoteTrack {
        id: "screen".into(),
        stream_id: "s".into(),
        kind: TrackKind::Video,
    };
    conn.emit(PeerEventKind::Track(track.clone()));

    let event = h.peer_rx.recv().await.unwrap();
    h.manager.handle_peer_event(event).await;

    assert_eq!(
        h.shares(),
        vec![ScreenShareEvent::RemoteStream {
            host_id: "u2".into(),
            track,
        }]
    );
}

#[tokio::test]
async fn relay_error_while_viewing_leaves_with_retryable_notice() {
    let mut h = Harness::viewing().await;
    h.manager
        .handle_error("screenshare-host-gone", "Host left")
        .await;

    assert_eq!(
        h.sent(),
        vec![OutboundMessage::LeaveScreenshareChannel {
            channel_id: "general".into()
        }]
    );
    assert_eq!(h.manager.role(), ScreenShareRole::Idle);
    let notice = h.notifier.last().unwrap();
    assert_eq!(notice.level, NotificationLevel::Warning);
    assert!(notice.retryable);
}

#[tokio::test]
async fn lost_host_connection_fails_viewing() {
    let mut h = Harness::viewing().await;
    h.offer_from("u2", "general").await;
    h.sent();
    let conn = h.factory.connection("u2").unwrap();
    conn.emit(PeerEventKind::StateChanged(ConnectionState::Failed));

    let event = h.peer_rx.recv().await.unwrap();
    h.manager.handle_peer_event(event).await;

    assert_eq!(h.manager.role(), ScreenShareRole::Idle);
    assert!(conn.is_closed());
    assert!(h.sent().contains(&OutboundMessage::LeaveScreenshareChannel {
        channel_id: "general".into()
    }));
    assert!(h.notifier.last().unwrap().retryable);
}

#[tokio::test]
async fn host_change_while_viewing_rejoins() {
    let mut h = Harness::viewing().await;
    h.offer_from("u2", "general").await;
    h.sent();

    h.host_is("u3").await;

    assert_eq!(h.manager.role(), ScreenShareRole::Viewer);
    assert_eq!(h.manager.host().unwrap().id, "u3");
    assert!(h.factory.connection("u2").unwrap().is_closed());
    assert_eq!(h.sent(), vec![join_share()]);
}

// ---------------------------------------------------------------------------
// Channel lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn inactive_session_tears_everything_down() {
    let mut h = Harness::hosting().await;
    for viewer in ["u2", "u3"] {
        h.manager
            .handle_viewer_pending("general", viewer, viewer)
            .await;
    }
    assert_eq!(h.manager.peer_count(), 2);

    h.manager
        .handle_session_state("general", false, None, None)
        .await;

    assert_eq!(h.manager.role(), ScreenShareRole::Idle);
    assert_eq!(h.manager.peer_count(), 0);
    assert!(h.factory.all().iter().all(|c| c.is_closed()));
    assert!(h.capture.live().is_empty());
    assert!(h.manager.host().is_none());
    assert!(h.shares().contains(&ScreenShareEvent::Ended {
        channel_id: "general".into()
    }));
}

#[tokio::test]
async fn rebinding_leaves_previous_channel() {
    let mut h = Harness::hosting().await;
    h.manager.bind("random").await;

    assert!(h.sent().contains(&OutboundMessage::StopScreenshare {
        channel_id: "general".into()
    }));
    assert_eq!(h.manager.channel_id(), Some("random"));
    assert_eq!(h.manager.role(), ScreenShareRole::Idle);
    assert!(h.manager.host().is_none());
}

#[tokio::test]
async fn unbind_while_viewing_leaves_share_channel() {
    let mut h = Harness::viewing().await;
    h.manager.unbind().await;

    assert_eq!(
        h.sent(),
        vec![OutboundMessage::LeaveScreenshareChannel {
            channel_id: "general".into()
        }]
    );
    assert!(h.manager.channel_id().is_none());
}
