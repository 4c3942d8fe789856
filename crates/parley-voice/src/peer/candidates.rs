//! Remote ICE candidates held back until a remote description exists.

use std::collections::HashMap;

use crate::protocol::IceCandidate;

/// Per-peer FIFO of early candidates.
///
/// A peer's queue is taken exactly once, right after its remote description
/// is applied. Later candidates for that peer bypass the queue.
#[derive(Debug, Default)]
pub struct CandidateQueue {
    queues: HashMap<String, Vec<IceCandidate>>,
}

impl CandidateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, peer_id: &str, candidate: IceCandidate) {
        self.queues
            .entry(peer_id.to_string())
            .or_default()
            .push(candidate);
    }

    /// Remove and return everything queued for `peer_id`, oldest first.
    pub fn take(&mut self, peer_id: &str) -> Vec<IceCandidate> {
        self.queues.remove(peer_id).unwrap_or_default()
    }

    /// Drop a peer's queue without applying it.
    pub fn discard(&mut self, peer_id: &str) -> usize {
        self.queues.remove(peer_id).map(|q| q.len()).unwrap_or(0)
    }

    pub fn len(&self, peer_id: &str) -> usize {
        self.queues.get(peer_id).map(Vec::len).unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.queues.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}
