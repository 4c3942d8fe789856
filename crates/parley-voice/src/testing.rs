//! In-memory doubles for the platform seams, shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use parley_common::{Notification, NotificationLevel};
use parley_config::IceServerConfig;
use tokio::sync::mpsc;

use crate::media::{
    DeviceKind, LocalStream, MediaCapture, MediaError, MediaTrack, PermissionStatus, TrackKind,
};
use crate::peer::{
    PeerConnection, PeerConnectionFactory, PeerError, PeerEventKind, PeerEventSender,
    TransportStats,
};
use crate::protocol::{IceCandidate, OutboundMessage, SdpType, SessionDescription};
use crate::sinks::{Clock, NotificationSink, RosterSink};
use crate::voice::RosterEntry;

// ---------------------------------------------------------------------------
// Peer connections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConnCall {
    AddTracks(String),
    RemoveTracks(String),
    ReplaceTracks(String),
    CreateOffer,
    CreateAnswer,
    SetLocal(SdpType),
    SetRemote(SdpType),
    AddCandidate(String),
    Close,
}

/// Failure switches shared by a factory and every connection it creates.
#[derive(Debug, Default)]
pub struct FailSwitches {
    pub create: AtomicBool,
    pub offer: AtomicBool,
    pub answer: AtomicBool,
    pub remote: AtomicBool,
    pub candidate: AtomicBool,
    pub tracks: AtomicBool,
}

pub struct MockConnection {
    events: PeerEventSender,
    calls: Mutex<Vec<ConnCall>>,
    stats: Mutex<Option<TransportStats>>,
    fail: Arc<FailSwitches>,
}

impl MockConnection {
    pub fn peer_id(&self) -> &str {
        self.events.peer_id()
    }

    pub fn calls(&self) -> Vec<ConnCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn applied_candidates(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ConnCall::AddCandidate(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.calls().contains(&ConnCall::Close)
    }

    pub fn count(&self, call: &ConnCall) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    /// Report an event as the platform stack would.
    pub fn emit(&self, kind: PeerEventKind) {
        self.events.emit(kind);
    }

    pub fn set_stats(&self, stats: TransportStats) {
        *self.stats.lock().unwrap() = Some(stats);
    }

    fn record(&self, call: ConnCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(flag: &AtomicBool, err: PeerError) -> Result<(), PeerError> {
        if flag.load(Ordering::SeqCst) {
            Err(err)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PeerConnection for MockConnection {
    async fn add_tracks(&self, stream: &LocalStream) -> Result<(), PeerError> {
        Self::check(&self.fail.tracks, PeerError::Tracks("mock".into()))?;
        self.record(ConnCall::AddTracks(stream.id.clone()));
        Ok(())
    }

    async fn remove_tracks(&self, stream: &LocalStream) -> Result<(), PeerError> {
        Self::check(&self.fail.tracks, PeerError::Tracks("mock".into()))?;
        self.record(ConnCall::RemoveTracks(stream.id.clone()));
        Ok(())
    }

    async fn replace_tracks(&self, stream: &LocalStream) -> Result<(), PeerError> {
        Self::check(&self.fail.tracks, PeerError::Tracks("mock".into()))?;
        self.record(ConnCall::ReplaceTracks(stream.id.clone()));
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription, PeerError> {
        Self::check(&self.fail.offer, PeerError::Offer("mock".into()))?;
        self.record(ConnCall::CreateOffer);
        Ok(SessionDescription::offer(format!("offer-for-{}", self.peer_id())))
    }

    async fn create_answer(&self) -> Result<SessionDescription, PeerError> {
        Self::check(&self.fail.answer, PeerError::Answer("mock".into()))?;
        self.record(ConnCall::CreateAnswer);
        Ok(SessionDescription::answer(format!("answer-for-{}", self.peer_id())))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), PeerError> {
        self.record(ConnCall::SetLocal(desc.kind));
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), PeerError> {
        Self::check(&self.fail.remote, PeerError::RemoteDescription("mock".into()))?;
        self.record(ConnCall::SetRemote(desc.kind));
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), PeerError> {
        Self::check(&self.fail.candidate, PeerError::Candidate("mock".into()))?;
        self.record(ConnCall::AddCandidate(candidate.candidate));
        Ok(())
    }

    async fn stats(&self) -> Result<TransportStats, PeerError> {
        self.stats
            .lock()
            .unwrap()
            .ok_or_else(|| PeerError::Stats("none scripted".into()))
    }

    async fn close(&self) {
        self.record(ConnCall::Close);
    }
}

#[derive(Default)]
pub struct MockFactory {
    pub fail: Arc<FailSwitches>,
    created: Mutex<Vec<Arc<MockConnection>>>,
}

impl MockFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Most recent connection created for `peer_id`.
    pub fn connection(&self, peer_id: &str) -> Option<Arc<MockConnection>> {
        self.created
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|c| c.peer_id() == peer_id)
            .cloned()
    }

    pub fn created_for(&self, peer_id: &str) -> usize {
        self.created
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.peer_id() == peer_id)
            .count()
    }

    pub fn created(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn all(&self) -> Vec<Arc<MockConnection>> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl PeerConnectionFactory for MockFactory {
    async fn create(
        &self,
        _ice_servers: &[IceServerConfig],
        events: PeerEventSender,
    ) -> Result<Arc<dyn PeerConnection>, PeerError> {
        if self.fail.create.load(Ordering::SeqCst) {
            return Err(PeerError::Create("mock".into()));
        }
        let conn = Arc::new(MockConnection {
            events,
            calls: Mutex::new(Vec::new()),
            stats: Mutex::new(None),
            fail: Arc::clone(&self.fail),
        });
        self.created.lock().unwrap().push(Arc::clone(&conn));
        Ok(conn)
    }
}

// ---------------------------------------------------------------------------
// Capture
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockCapture {
    pub mic_error: Mutex<Option<MediaError>>,
    pub camera_error: Mutex<Option<MediaError>>,
    pub display_error: Mutex<Option<MediaError>>,
    pub mic_permission: Mutex<Option<PermissionStatus>>,
    pub level: Mutex<f64>,
    serial: AtomicUsize,
    acquired: Mutex<Vec<String>>,
    stopped: Mutex<Vec<String>>,
    enabled: Mutex<HashMap<String, bool>>,
}

impl MockCapture {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_microphone(&self, err: Option<MediaError>) {
        *self.mic_error.lock().unwrap() = err;
    }

    pub fn set_level(&self, level: f64) {
        *self.level.lock().unwrap() = level;
    }

    pub fn acquired(&self) -> Vec<String> {
        self.acquired.lock().unwrap().clone()
    }

    pub fn stopped(&self) -> Vec<String> {
        self.stopped.lock().unwrap().clone()
    }

    /// Last gate applied to `stream_id`, if any.
    pub fn enabled(&self, stream_id: &str) -> Option<bool> {
        self.enabled.lock().unwrap().get(stream_id).copied()
    }

    /// Streams acquired and not yet stopped.
    pub fn live(&self) -> Vec<String> {
        let stopped = self.stopped();
        self.acquired()
            .into_iter()
            .filter(|id| !stopped.contains(id))
            .collect()
    }

    fn make(&self, prefix: &str, kinds: &[TrackKind]) -> LocalStream {
        let n = self.serial.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("{prefix}-{n}");
        self.acquired.lock().unwrap().push(id.clone());
        LocalStream {
            tracks: kinds
                .iter()
                .enumerate()
                .map(|(i, kind)| MediaTrack {
                    id: format!("{id}-t{i}"),
                    kind: *kind,
                    label: prefix.to_string(),
                })
                .collect(),
            id,
        }
    }
}

#[async_trait]
impl MediaCapture for MockCapture {
    async fn acquire_microphone(&self) -> Result<LocalStream, MediaError> {
        if let Some(err) = self.mic_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.make("mic", &[TrackKind::Audio]))
    }

    async fn acquire_camera(&self) -> Result<LocalStream, MediaError> {
        if let Some(err) = self.camera_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.make("cam", &[TrackKind::Video]))
    }

    async fn acquire_display(&self) -> Result<LocalStream, MediaError> {
        if let Some(err) = self.display_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.make("display", &[TrackKind::Video]))
    }

    async fn permission_status(&self, device: DeviceKind) -> PermissionStatus {
        match device {
            DeviceKind::Microphone => self
                .mic_permission
                .lock()
                .unwrap()
                .unwrap_or(PermissionStatus::Granted),
            _ => PermissionStatus::Granted,
        }
    }

    fn stop(&self, stream: &LocalStream) {
        self.stopped.lock().unwrap().push(stream.id.clone());
    }

    fn set_enabled(&self, stream: &LocalStream, enabled: bool) {
        self.enabled
            .lock()
            .unwrap()
            .insert(stream.id.clone(), enabled);
    }

    fn input_level(&self, _stream: &LocalStream) -> Option<f64> {
        Some(*self.level.lock().unwrap())
    }
}

// ---------------------------------------------------------------------------
// Sinks & clock
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn all(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }

    pub fn count(&self, level: NotificationLevel) -> usize {
        self.all().iter().filter(|n| n.level == level).count()
    }

    pub fn last(&self) -> Option<Notification> {
        self.seen.lock().unwrap().last().cloned()
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.lock().unwrap().push(notification);
    }
}

#[derive(Default)]
pub struct RecordingRoster {
    renders: Mutex<Vec<Vec<RosterEntry>>>,
}

impl RecordingRoster {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn last(&self) -> Vec<RosterEntry> {
        self.renders
            .lock()
            .unwrap()
            .last()
            .cloned()
            .unwrap_or_default()
    }

    pub fn render_count(&self) -> usize {
        self.renders.lock().unwrap().len()
    }
}

impl RosterSink for RecordingRoster {
    fn render(&self, entries: Vec<RosterEntry>) {
        self.renders.lock().unwrap().push(entries);
    }
}

pub struct FixedClock {
    now: AtomicI64,
}

impl FixedClock {
    pub fn new(now: i64) -> Arc<Self> {
        Arc::new(Self {
            now: AtomicI64::new(now),
        })
    }

    pub fn advance(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Relay
// ---------------------------------------------------------------------------

/// Everything queued for the relay so far.
pub fn drain(rx: &mut mpsc::Receiver<OutboundMessage>) -> Vec<OutboundMessage> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

pub fn mic_stream(id: &str) -> LocalStream {
    LocalStream {
        id: id.to_string(),
        tracks: vec![MediaTrack {
            id: format!("{id}-t0"),
            kind: TrackKind::Audio,
            label: "mic".into(),
        }],
    }
}
