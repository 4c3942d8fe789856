//! Peer map: one connection per remote peer id, plus the early-candidate
//! queue. Negotiation failures tear down only the affected peer.

use std::collections::HashMap;
use std::sync::Arc;

use parley_config::IceServerConfig;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::media::LocalStream;
use crate::protocol::{IceCandidate, SdpType, SessionDescription};

use super::candidates::CandidateQueue;
use super::types::{
    ConnectionState, MediaCategory, PeerConnection, PeerConnectionFactory, PeerError, PeerEvent,
    PeerEventSender, TransportStats,
};

struct PeerEntry {
    conn: Arc<dyn PeerConnection>,
    generation: u64,
    state: ConnectionState,
    remote_applied: bool,
}

// ---------------------------------------------------------------------------
// Peer Sessions
// ---------------------------------------------------------------------------

/// Owns every peer connection of one category (voice or screenshare).
pub struct PeerSessions {
    category: MediaCategory,
    factory: Arc<dyn PeerConnectionFactory>,
    ice_servers: Vec<IceServerConfig>,
    events_tx: mpsc::UnboundedSender<PeerEvent>,
    peers: HashMap<String, PeerEntry>,
    candidates: CandidateQueue,
    next_generation: u64,
}

impl PeerSessions {
    pub fn new(
        category: MediaCategory,
        factory: Arc<dyn PeerConnectionFactory>,
        ice_servers: Vec<IceServerConfig>,
        events_tx: mpsc::UnboundedSender<PeerEvent>,
    ) -> Self {
        Self {
            category,
            factory,
            ice_servers,
            events_tx,
            peers: HashMap::new(),
            candidates: CandidateQueue::new(),
            next_generation: 1,
        }
    }

    pub fn category(&self) -> MediaCategory {
        self.category
    }

    pub fn contains(&self, peer_id: &str) -> bool {
        self.peers.contains_key(peer_id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn peer_ids(&self) -> Vec<String> {
        self.peers.keys().cloned().collect()
    }

    pub fn state(&self, peer_id: &str) -> Option<ConnectionState> {
        self.peers.get(peer_id).map(|e| e.state)
    }

    /// Number of candidates waiting for `peer_id`'s remote description.
    pub fn queued_candidates(&self, peer_id: &str) -> usize {
        self.candidates.len(peer_id)
    }

    /// Whether `generation` is the live connection for `peer_id`.
    pub fn is_current(&self, peer_id: &str, generation: u64) -> bool {
        self.peers
            .get(peer_id)
            .is_some_and(|e| e.generation == generation)
    }

    // -----------------------------------------------------------------------
    // Negotiation
    // -----------------------------------------------------------------------

    /// Open a connection to `peer_id`, attach `local` streams, and return the
    /// offer to deliver. Returns `Ok(None)` if a connection for the peer
    /// already exists.
    pub async fn create_offer(
        &mut self,
        peer_id: &str,
        local: &[LocalStream],
    ) -> Result<Option<SessionDescription>, PeerError> {
        if self.peers.contains_key(peer_id) {
            debug!(category = ?self.category, peer_id, "Connection already exists; not offering again");
            return Ok(None);
        }

        let conn = self.open(peer_id).await?;
        match Self::offer_on(&conn, local).await {
            Ok(offer) => {
                self.set_state(peer_id, ConnectionState::Connecting);
                info!(category = ?self.category, peer_id, "Offer created");
                Ok(Some(offer))
            }
            Err(e) => {
                warn!(category = ?self.category, peer_id, error = %e, "Offer failed; discarding connection");
                self.remove_peer(peer_id).await;
                Err(e)
            }
        }
    }

    /// Apply a remote offer and return the answer to deliver. An offer for an
    /// existing connection renegotiates it in place.
    pub async fn handle_offer(
        &mut self,
        peer_id: &str,
        desc: SessionDescription,
        local: &[LocalStream],
    ) -> Result<SessionDescription, PeerError> {
        if desc.kind != SdpType::Offer {
            return Err(PeerError::UnexpectedDescription(desc.kind));
        }

        let conn = match self.peers.get(peer_id) {
            Some(entry) => Arc::clone(&entry.conn),
            None => {
                let conn = self.open(peer_id).await?;
                for stream in local {
                    if let Err(e) = conn.add_tracks(stream).await {
                        self.remove_peer(peer_id).await;
                        return Err(e);
                    }
                }
                conn
            }
        };

        match self.answer_on(peer_id, &conn, desc).await {
            Ok(answer) => {
                self.set_state(peer_id, ConnectionState::Connecting);
                info!(category = ?self.category, peer_id, "Answer created");
                Ok(answer)
            }
            Err(e) => {
                warn!(category = ?self.category, peer_id, error = %e, "Answering offer failed; discarding connection");
                self.remove_peer(peer_id).await;
                Err(e)
            }
        }
    }

    /// Apply a remote answer. Returns `Ok(false)` if no connection exists
    /// for the peer (late answer after teardown).
    pub async fn handle_answer(
        &mut self,
        peer_id: &str,
        desc: SessionDescription,
    ) -> Result<bool, PeerError> {
        if desc.kind != SdpType::Answer {
            return Err(PeerError::UnexpectedDescription(desc.kind));
        }
        let Some(conn) = self.peers.get(peer_id).map(|e| Arc::clone(&e.conn)) else {
            debug!(category = ?self.category, peer_id, "Answer for unknown peer ignored");
            return Ok(false);
        };

        if let Err(e) = self.apply_remote(peer_id, &conn, desc).await {
            warn!(category = ?self.category, peer_id, error = %e, "Applying answer failed; discarding connection");
            self.remove_peer(peer_id).await;
            return Err(e);
        }
        Ok(true)
    }

    /// Apply a remote candidate, or queue it if the peer's remote
    /// description is not set yet.
    pub async fn handle_ice_candidate(
        &mut self,
        peer_id: &str,
        candidate: IceCandidate,
    ) -> Result<(), PeerError> {
        let ready = self
            .peers
            .get(peer_id)
            .filter(|e| e.remote_applied)
            .map(|e| Arc::clone(&e.conn));

        let Some(conn) = ready else {
            self.candidates.push(peer_id, candidate);
            debug!(
                category = ?self.category,
                peer_id,
                queued = self.candidates.len(peer_id),
                "Candidate queued until remote description is set"
            );
            return Ok(());
        };

        if let Err(e) = conn.add_ice_candidate(candidate).await {
            warn!(category = ?self.category, peer_id, error = %e, "Adding candidate failed; discarding connection");
            self.remove_peer(peer_id).await;
            return Err(e);
        }
        Ok(())
    }

    /// Create a fresh offer on an existing connection after its local
    /// tracks changed. Returns `Ok(None)` if the peer is unknown.
    pub async fn renegotiate(
        &mut self,
        peer_id: &str,
    ) -> Result<Option<SessionDescription>, PeerError> {
        let Some(conn) = self.peers.get(peer_id).map(|e| Arc::clone(&e.conn)) else {
            return Ok(None);
        };
        match Self::offer_on(&conn, &[]).await {
            Ok(offer) => Ok(Some(offer)),
            Err(e) => {
                warn!(category = ?self.category, peer_id, error = %e, "Renegotiation failed; discarding connection");
                self.remove_peer(peer_id).await;
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Local tracks
    // -----------------------------------------------------------------------

    /// Add `stream` to every connection. Returns the peers that failed and
    /// were torn down.
    pub async fn attach_stream(&mut self, stream: &LocalStream) -> Vec<String> {
        let mut failed = Vec::new();
        for (peer_id, conn) in self.connections() {
            if let Err(e) = conn.add_tracks(stream).await {
                warn!(category = ?self.category, peer_id = %peer_id, error = %e, "Attaching tracks failed");
                failed.push(peer_id);
            }
        }
        self.remove_all(&failed).await;
        failed
    }

    /// Remove `stream` from every connection. Returns the peers that failed.
    pub async fn detach_stream(&mut self, stream: &LocalStream) -> Vec<String> {
        let mut failed = Vec::new();
        for (peer_id, conn) in self.connections() {
            if let Err(e) = conn.remove_tracks(stream).await {
                warn!(category = ?self.category, peer_id = %peer_id, error = %e, "Detaching tracks failed");
                failed.push(peer_id);
            }
        }
        self.remove_all(&failed).await;
        failed
    }

    /// Swap outgoing tracks for those of `stream` on every connection.
    pub async fn replace_stream(&mut self, stream: &LocalStream) -> Vec<String> {
        let mut failed = Vec::new();
        for (peer_id, conn) in self.connections() {
            if let Err(e) = conn.replace_tracks(stream).await {
                warn!(category = ?self.category, peer_id = %peer_id, error = %e, "Replacing tracks failed");
                failed.push(peer_id);
            }
        }
        self.remove_all(&failed).await;
        failed
    }

    // -----------------------------------------------------------------------
    // State & teardown
    // -----------------------------------------------------------------------

    /// Record a state change reported by a connection. Terminal states tear
    /// the connection down. Returns `None` for events from a stale
    /// generation.
    pub async fn handle_state_change(
        &mut self,
        peer_id: &str,
        generation: u64,
        state: ConnectionState,
    ) -> Option<ConnectionState> {
        if !self.is_current(peer_id, generation) {
            debug!(category = ?self.category, peer_id, generation, "Stale state change ignored");
            return None;
        }
        self.set_state(peer_id, state);
        if state.is_terminal() {
            info!(category = ?self.category, peer_id, ?state, "Connection ended; tearing down");
            self.remove_peer(peer_id).await;
        }
        Some(state)
    }

    /// Close and forget one peer, including any queued candidates.
    pub async fn remove_peer(&mut self, peer_id: &str) -> bool {
        let dropped = self.candidates.discard(peer_id);
        if dropped > 0 {
            debug!(category = ?self.category, peer_id, dropped, "Discarded queued candidates");
        }
        match self.peers.remove(peer_id) {
            Some(entry) => {
                entry.conn.close().await;
                true
            }
            None => false,
        }
    }

    /// Close every connection in this map.
    pub async fn close_all(&mut self) {
        let ids = self.peer_ids();
        self.remove_all(&ids).await;
        self.candidates.clear();
    }

    /// Read transport counters from every live connection.
    pub async fn sample_stats(&self) -> Vec<(String, TransportStats)> {
        let mut out = Vec::with_capacity(self.peers.len());
        for (peer_id, conn) in self.connections() {
            match conn.stats().await {
                Ok(stats) => out.push((peer_id, stats)),
                Err(e) => debug!(category = ?self.category, peer_id = %peer_id, error = %e, "Stats unavailable"),
            }
        }
        out
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn open(&mut self, peer_id: &str) -> Result<Arc<dyn PeerConnection>, PeerError> {
        let generation = self.next_generation;
        self.next_generation += 1;
        let sender =
            PeerEventSender::new(self.category, peer_id, generation, self.events_tx.clone());

        let conn = self.factory.create(&self.ice_servers, sender).await?;
        self.peers.insert(
            peer_id.to_string(),
            PeerEntry {
                conn: Arc::clone(&conn),
                generation,
                state: ConnectionState::New,
                remote_applied: false,
            },
        );
        Ok(conn)
    }

    async fn offer_on(
        conn: &Arc<dyn PeerConnection>,
        local: &[LocalStream],
    ) -> Result<SessionDescription, PeerError> {
        for stream in local {
            conn.add_tracks(stream).await?;
        }
        let offer = conn.create_offer().await?;
        conn.set_local_description(offer.clone()).await?;
        Ok(offer)
    }

    async fn answer_on(
        &mut self,
        peer_id: &str,
        conn: &Arc<dyn PeerConnection>,
        offer: SessionDescription,
    ) -> Result<SessionDescription, PeerError> {
        self.apply_remote(peer_id, conn, offer).await?;
        let answer = conn.create_answer().await?;
        conn.set_local_description(answer.clone()).await?;
        Ok(answer)
    }

    /// Set the remote description and, the first time only, drain the
    /// candidate queue in arrival order.
    async fn apply_remote(
        &mut self,
        peer_id: &str,
        conn: &Arc<dyn PeerConnection>,
        desc: SessionDescription,
    ) -> Result<(), PeerError> {
        conn.set_remote_description(desc).await?;

        let first = match self.peers.get_mut(peer_id) {
            Some(entry) => !std::mem::replace(&mut entry.remote_applied, true),
            None => false,
        };
        if first {
            let queued = self.candidates.take(peer_id);
            if !queued.is_empty() {
                debug!(category = ?self.category, peer_id, count = queued.len(), "Flushing queued candidates");
            }
            for candidate in queued {
                conn.add_ice_candidate(candidate).await?;
            }
        }
        Ok(())
    }

    fn set_state(&mut self, peer_id: &str, state: ConnectionState) {
        if let Some(entry) = self.peers.get_mut(peer_id) {
            entry.state = state;
        }
    }

    fn connections(&self) -> Vec<(String, Arc<dyn PeerConnection>)> {
        self.peers
            .iter()
            .map(|(id, e)| (id.clone(), Arc::clone(&e.conn)))
            .collect()
    }

    async fn remove_all(&mut self, peer_ids: &[String]) {
        for peer_id in peer_ids {
            self.remove_peer(peer_id).await;
        }
    }
}
