//! Per-track bookmarks
//!
//! Bookmarks are keyed by track id and outlive track switches. Each track's
//! list is stored as a small JSON file under the data directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::BookmarkError;
use crate::timefmt::format_time;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: String,
    pub time: f64,
    pub label: String,
}

/// Where bookmark lists live
#[derive(Debug, Clone)]
pub struct BookmarkStore {
    root: Option<PathBuf>,
}

impl BookmarkStore {
    /// Persist under `root` (created on first save)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// Keep bookmarks for the session only
    pub fn in_memory() -> Self {
        Self { root: None }
    }

    /// One file per track id. Bytes outside `[a-z0-9-]` (`_` and capitals
    /// included) are escaped as `_xx`, so distinct ids never share a file,
    /// even on case-insensitive filesystems.
    fn path_for(root: &Path, track_id: &str) -> PathBuf {
        let mut encoded = String::with_capacity(track_id.len());
        for b in track_id.bytes() {
            if b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' {
                encoded.push(char::from(b));
            } else {
                encoded.push_str(&format!("_{b:02x}"));
            }
        }
        root.join(format!("bookmarks_{encoded}.json"))
    }

    pub fn load(&self, track_id: &str) -> Result<Vec<Bookmark>, BookmarkError> {
        let Some(root) = &self.root else {
            return Ok(Vec::new());
        };
        let path = Self::path_for(root, track_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Write the list; an empty list removes the file.
    pub fn save(&self, track_id: &str, bookmarks: &[Bookmark]) -> Result<(), BookmarkError> {
        let Some(root) = &self.root else {
            return Ok(());
        };
        let path = Self::path_for(root, track_id);
        if bookmarks.is_empty() {
            if path.exists() {
                std::fs::remove_file(&path)?;
            }
            return Ok(());
        }
        std::fs::create_dir_all(root)?;
        std::fs::write(&path, serde_json::to_string_pretty(bookmarks)?)?;
        Ok(())
    }
}

/// The bookmark list of the loaded track
#[derive(Debug, Clone, Default)]
pub struct Bookmarks {
    items: Vec<Bookmark>,
}

impl Bookmarks {
    pub fn from_items(items: Vec<Bookmark>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[Bookmark] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Bookmark> {
        self.items.iter().find(|b| b.id == id)
    }

    /// Bookmark `time` with a default label
    pub fn add(&mut self, time: f64) -> &Bookmark {
        let time = if time.is_finite() { time.max(0.0) } else { 0.0 };
        self.items.push(Bookmark {
            id: format!("bm_{}", uuid::Uuid::new_v4().simple()),
            time,
            label: format!("Bookmark at {}", format_time(time)),
        });
        &self.items[self.items.len() - 1]
    }

    pub fn rename(&mut self, id: &str, label: impl Into<String>) -> bool {
        match self.items.iter_mut().find(|b| b.id == id) {
            Some(bookmark) => {
                bookmark.label = label.into();
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|b| b.id != id);
        self.items.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_uses_fresh_ids_and_default_label() {
        let mut bookmarks = Bookmarks::default();
        let first = bookmarks.add(75.4).clone();
        let second = bookmarks.add(75.4).clone();
        assert_ne!(first.id, second.id);
        assert_eq!(first.label, "Bookmark at 1:15");
        assert_eq!(first.time, 75.4);
    }

    #[test]
    fn test_rename_and_remove() {
        let mut bookmarks = Bookmarks::default();
        let id = bookmarks.add(3.0).id.clone();
        assert!(bookmarks.rename(&id, "Kidan"));
        assert_eq!(bookmarks.get(&id).map(|b| b.label.as_str()), Some("Kidan"));
        assert!(!bookmarks.rename("missing", "x"));
        assert!(bookmarks.remove(&id));
        assert!(!bookmarks.remove(&id));
        assert!(bookmarks.is_empty());
    }

    #[test]
    fn test_store_round_trips_per_track() {
        let dir = tempfile::tempdir().unwrap();
        let store = BookmarkStore::new(dir.path().join("bm"));
        let mut bookmarks = Bookmarks::default();
        bookmarks.add(12.0);
        store.save("track/1", bookmarks.items()).unwrap();

        assert_eq!(store.load("track/1").unwrap(), bookmarks.items());
        assert!(store.load("track/2").unwrap().is_empty());
    }

    #[test]
    fn test_similar_track_ids_do_not_share_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = BookmarkStore::new(dir.path());
        let mut spaced = Bookmarks::default();
        spaced.add(5.0);
        let mut underscored = Bookmarks::default();
        underscored.add(9.0);
        underscored.add(11.0);

        store.save("/music/a b.mp3", spaced.items()).unwrap();
        store.save("/music/a_b.mp3", underscored.items()).unwrap();
        assert_eq!(store.load("/music/a b.mp3").unwrap(), spaced.items());
        assert_eq!(store.load("/music/a_b.mp3").unwrap(), underscored.items());

        store.save("track/1", spaced.items()).unwrap();
        assert!(store.load("track_1").unwrap().is_empty());
        assert!(store.load("Track/1").unwrap().is_empty());
    }

    #[test]
    fn test_saving_empty_list_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = BookmarkStore::new(dir.path());
        let mut bookmarks = Bookmarks::default();
        let id = bookmarks.add(1.0).id.clone();
        store.save("t", bookmarks.items()).unwrap();
        bookmarks.remove(&id);
        store.save("t", bookmarks.items()).unwrap();
        assert!(store.load("t").unwrap().is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_corrupt_file_reports_json_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bookmarks_t.json"), "not json").unwrap();
        let store = BookmarkStore::new(dir.path());
        assert!(matches!(store.load("t"), Err(BookmarkError::Json(_))));
    }

    #[test]
    fn test_in_memory_store_never_touches_disk() {
        let store = BookmarkStore::in_memory();
        store.save("t", &[]).unwrap();
        assert!(store.load("t").unwrap().is_empty());
    }
}
