//! Flattening session state into render-ready roster entries.

use super::core::VoiceOrchestrator;
use super::types::{Participant, RosterEntry};

impl VoiceOrchestrator {
    /// Current roster: the local user first, then remote participants by
    /// display name. Empty while idle.
    pub fn roster(&self) -> Vec<RosterEntry> {
        let Some(display_name) = self.phase.display_name() else {
            return Vec::new();
        };

        let mut entries = Vec::with_capacity(self.participants.len() + 1);
        entries.push(RosterEntry {
            id: self.deps.local_user_id.clone(),
            display_name: display_name.to_string(),
            is_local: true,
            muted: self.muted,
            deafened: self.deafened,
            speaking: self.local_speaking.is_speaking(),
            camera_enabled: self.camera.is_some(),
            screen_enabled: self.screen_share.is_hosting(),
            audio: None,
            video: None,
            connection: None,
            quality: self.quality.report().overall,
            playback_muted: false,
        });

        let mut remote: Vec<&Participant> = self.participants.values().collect();
        remote.sort_by(|a, b| {
            a.display_name
                .to_lowercase()
                .cmp(&b.display_name.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });
        entries.extend(remote.into_iter().map(|p| RosterEntry {
            id: p.id.clone(),
            display_name: p.display_name.clone(),
            is_local: false,
            muted: p.muted,
            deafened: p.deafened,
            speaking: p.speaking,
            camera_enabled: p.camera_enabled,
            screen_enabled: p.screen_enabled,
            audio: p.audio.clone(),
            video: p.video.clone(),
            connection: self.peers.state(&p.id).or(p.connection),
            quality: self.quality.bucket_for(&p.id),
            playback_muted: self.deafened,
        }));
        entries
    }

    /// Push the current roster to the roster sink.
    pub(super) fn render(&self) {
        self.deps.roster.render(self.roster());
    }
}
