//! Recently played tracks

use std::collections::VecDeque;

use crate::track::Track;

pub const MAX_RECENT: usize = 10;

/// Most recent first, no duplicates
#[derive(Debug, Clone, Default)]
pub struct RecentlyPlayed {
    tracks: VecDeque<Track>,
}

impl RecentlyPlayed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, track: Track) {
        self.tracks.retain(|t| t.id != track.id);
        self.tracks.push_front(track);
        self.tracks.truncate(MAX_RECENT);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
