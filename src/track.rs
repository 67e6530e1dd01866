//! Track identity handed to the transport by the library layer

use serde::{Deserialize, Serialize};
use std::path::Path;

/// A playable track
///
/// Immutable once loaded. `duration` is a hint from the library: the
/// transport clamps seeks to it until the device reports the real value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub audio_url: String,
    pub duration: Option<f64>,
}

impl Track {
    pub fn new(id: impl Into<String>, title: impl Into<String>, audio_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            audio_url: audio_url.into(),
            duration: None,
        }
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }

    /// Build a track for a local file. The path doubles as the id so
    /// bookmarks survive restarts.
    pub fn from_path(path: &Path) -> Self {
        let url = path.to_string_lossy().into_owned();
        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| url.clone());
        Self::new(url.clone(), title, url)
    }
}
