use crate::error::StoreError;
use crate::models::{PlaylistRef, Track};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything persisted between runs
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Library {
    pub favorites: Vec<Track>,
    pub history: Vec<HistoryEntry>,
}

/// A playlist saved to the account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub name: String,
    pub tracks: Vec<Track>,
    pub created_at: DateTime<Utc>,
    pub playlist_id: Option<String>,
    pub playlist_url: Option<String>,
}

/// JSON file holding favorites and playlist history
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the library; a missing file is an empty library
    pub fn load(&self) -> Result<Library, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(Library::default()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Library::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, library: &Library) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        // write-then-rename so a crash never leaves a half-written file
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(library)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Add a favorite, or remove it if it is already there; returns whether it is now a favorite
    pub fn toggle_favorite(&self, track: Track) -> Result<bool, StoreError> {
        let mut library = self.load()?;
        let is_favorite = match library.favorites.iter().position(|f| f.id == track.id) {
            Some(index) => {
                library.favorites.remove(index);
                false
            }
            None => {
                library.favorites.push(track);
                true
            }
        };
        self.save(&library)?;
        Ok(is_favorite)
    }

    pub fn remove_favorite(&self, track_id: &str) -> Result<bool, StoreError> {
        let mut library = self.load()?;
        let before = library.favorites.len();
        library.favorites.retain(|f| f.id != track_id);
        let removed = library.favorites.len() != before;
        if removed {
            self.save(&library)?;
        }
        Ok(removed)
    }

    /// Append a saved playlist to the history
    pub fn record_playlist(
        &self,
        name: &str,
        tracks: &[Track],
        playlist: Option<&PlaylistRef>,
    ) -> Result<HistoryEntry, StoreError> {
        let mut library = self.load()?;
        let created_at = Utc::now();
        let entry = HistoryEntry {
            id: created_at.timestamp_millis().to_string(),
            name: name.to_string(),
            tracks: tracks.to_vec(),
            created_at,
            playlist_id: playlist.map(|p| p.id.clone()),
            playlist_url: playlist.and_then(|p| p.external_urls.spotify.clone()),
        };
        library.history.push(entry.clone());
        self.save(&library)?;
        Ok(entry)
    }

    pub fn history_entry(&self, entry_id: &str) -> Result<Option<HistoryEntry>, StoreError> {
        Ok(self.load()?.history.into_iter().find(|h| h.id == entry_id))
    }

    /// Drop one track from a saved entry; `None` when the entry does not exist
    pub fn remove_history_track(
        &self,
        entry_id: &str,
        track_id: &str,
    ) -> Result<Option<bool>, StoreError> {
        let mut library = self.load()?;
        let Some(entry) = library.history.iter_mut().find(|h| h.id == entry_id) else {
            return Ok(None);
        };
        let before = entry.tracks.len();
        entry.tracks.retain(|t| t.id != track_id);
        let removed = entry.tracks.len() != before;
        if removed {
            self.save(&library)?;
        }
        Ok(Some(removed))
    }

    pub fn remove_history(&self, entry_id: &str) -> Result<bool, StoreError> {
        let mut library = self.load()?;
        let before = library.history.len();
        library.history.retain(|h| h.id != entry_id);
        let removed = library.history.len() != before;
        if removed {
            self.save(&library)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExternalUrls;

    fn track(id: &str) -> Track {
        Track {
            id: id.to_string(),
            name: format!("Song {id}"),
            ..Track::default()
        }
    }

    #[test]
    fn test_missing_file_is_empty_library() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("nested").join("curator.json"));
        let library = store.load().unwrap();
        assert!(library.favorites.is_empty());
        assert!(library.history.is_empty());
    }

    #[test]
    fn test_toggle_favorite() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("curator.json"));

        assert!(store.toggle_favorite(track("a")).unwrap());
        assert!(store.toggle_favorite(track("b")).unwrap());
        assert!(!store.toggle_favorite(track("a")).unwrap());

        let favorites = store.load().unwrap().favorites;
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].id, "b");

        assert!(store.remove_favorite("b").unwrap());
        assert!(!store.remove_favorite("b").unwrap());
    }

    #[test]
    fn test_record_and_remove_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("curator.json"));
        let playlist = PlaylistRef {
            id: "pl1".to_string(),
            name: "Road trip".to_string(),
            uri: "spotify:playlist:pl1".to_string(),
            external_urls: ExternalUrls {
                spotify: Some("https://open.spotify.com/playlist/pl1".to_string()),
            },
        };

        let entry = store
            .record_playlist("Road trip", &[track("a"), track("b")], Some(&playlist))
            .unwrap();
        assert_eq!(entry.playlist_id.as_deref(), Some("pl1"));

        let history = store.load().unwrap().history;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].tracks.len(), 2);
        assert_eq!(
            history[0].playlist_url.as_deref(),
            Some("https://open.spotify.com/playlist/pl1")
        );

        assert!(store.remove_history(&entry.id).unwrap());
        assert!(store.load().unwrap().history.is_empty());
    }

    #[test]
    fn test_remove_track_from_history_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("curator.json"));
        let entry = store
            .record_playlist("Mix", &[track("a"), track("b"), track("c")], None)
            .unwrap();
        assert!(entry.playlist_url.is_none());

        assert_eq!(store.remove_history_track(&entry.id, "b").unwrap(), Some(true));
        assert_eq!(store.remove_history_track(&entry.id, "b").unwrap(), Some(false));
        assert_eq!(store.remove_history_track("missing", "a").unwrap(), None);

        let saved = store.history_entry(&entry.id).unwrap().unwrap();
        let ids: Vec<&str> = saved.tracks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert!(store.history_entry("missing").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("curator.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(Store::new(path).load(), Err(StoreError::Json(_))));
    }
}
