//! Track metadata cache keyed by every identifier a track is known under.
//!
//! A physical track may be addressed by three different identifiers over its
//! lifetime: a persistent ID (from the local player), a library ID (from the
//! personal-library API), and a catalog ID (universal). Stable metadata
//! (explicit flag, ISRC) is stored once and indexed under all identifiers
//! known at write time, so a later lookup through any path is a hit.
//!
//! The cache is a pure optimization, not a source of truth: load failures
//! start empty, save failures leave the in-memory state authoritative for the
//! rest of the process.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Stable per-track metadata. `explicit` is `"Yes"` or `"No"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub explicit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isrc: Option<String>,
}

/// In-memory map over a flat JSON file, constructed once per process and
/// handed to the server state (no global instance).
#[derive(Debug)]
pub struct MetadataCache {
    path: PathBuf,
    entries: HashMap<String, CacheEntry>,
}

pub fn default_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("applemusic-mcp")
        .join("track_cache.json")
}

impl MetadataCache {
    /// Open the cache at `path`. A missing or unreadable file starts empty.
    pub fn open(path: PathBuf) -> Self {
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    eprintln!("[applemusic] ignoring malformed track cache: {e}");
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        Self { path, entries }
    }

    /// Look up the explicit flag under any identifier kind.
    pub fn get_explicit(&self, track_id: &str) -> Option<&str> {
        self.get(track_id).map(|e| e.explicit.as_str())
    }

    pub fn get(&self, track_id: &str) -> Option<&CacheEntry> {
        self.entries.get(track_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write one metadata record under every non-empty identifier supplied.
    ///
    /// First write wins: an identifier that already holds a record keeps it,
    /// while the other identifiers in the same call are still filled in.
    /// Stable metadata should never differ across sources, so a later
    /// (possibly degraded) refetch must not clobber a known-good value.
    pub fn set_track_metadata(
        &mut self,
        explicit: &str,
        isrc: Option<&str>,
        persistent_id: Option<&str>,
        library_id: Option<&str>,
        catalog_id: Option<&str>,
    ) {
        let entry = CacheEntry {
            explicit: explicit.to_string(),
            isrc: isrc.filter(|s| !s.is_empty()).map(str::to_string),
        };
        for id in [persistent_id, library_id, catalog_id].into_iter().flatten() {
            if !id.is_empty() && !self.entries.contains_key(id) {
                self.entries.insert(id.to_string(), entry.clone());
            }
        }
        self.save();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.save();
    }

    /// Persist the full map. Failures are logged and swallowed; durability is
    /// best-effort for an optimization cache.
    fn save(&self) {
        if let Some(parent) = self.path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            eprintln!("[applemusic] failed to create cache directory: {e}");
            return;
        }
        match serde_json::to_string_pretty(&self.entries) {
            Ok(raw) => {
                if let Err(e) = std::fs::write(&self.path, raw) {
                    eprintln!("[applemusic] failed to write track cache: {e}");
                }
            }
            Err(e) => eprintln!("[applemusic] failed to serialize track cache: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_cache() -> (tempfile::TempDir, MetadataCache) {
        let dir = tempfile::tempdir().unwrap();
        let cache = MetadataCache::open(dir.path().join("track_cache.json"));
        (dir, cache)
    }

    #[test]
    fn first_write_wins() {
        let (_dir, mut cache) = temp_cache();
        cache.set_track_metadata("Yes", None, Some("P1"), None, None);
        cache.set_track_metadata("No", None, Some("P1"), None, None);
        assert_eq!(cache.get_explicit("P1"), Some("Yes"));
    }

    #[test]
    fn later_call_fills_only_missing_ids() {
        let (_dir, mut cache) = temp_cache();
        cache.set_track_metadata("Yes", None, Some("P1"), None, None);
        cache.set_track_metadata("No", None, Some("P1"), Some("i.lib1"), None);
        assert_eq!(cache.get_explicit("P1"), Some("Yes"));
        assert_eq!(cache.get_explicit("i.lib1"), Some("No"));
    }

    #[test]
    fn multi_index_consistency() {
        let (_dir, mut cache) = temp_cache();
        cache.set_track_metadata("Yes", Some("USX123"), Some("P1"), Some("i.lib1"), Some("900123"));
        for id in ["P1", "i.lib1", "900123"] {
            let entry = cache.get(id).unwrap();
            assert_eq!(entry.explicit, "Yes");
            assert_eq!(entry.isrc.as_deref(), Some("USX123"));
        }
    }

    #[test]
    fn empty_ids_are_ignored() {
        let (_dir, mut cache) = temp_cache();
        cache.set_track_metadata("No", None, Some(""), None, Some("900123"));
        assert!(cache.get("").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("track_cache.json");
        {
            let mut cache = MetadataCache::open(path.clone());
            cache.set_track_metadata("Yes", Some("USX123"), None, Some("i.lib1"), Some("900123"));
            cache.set_track_metadata("No", None, Some("P2"), None, None);
        }
        let reopened = MetadataCache::open(path);
        assert_eq!(reopened.get_explicit("i.lib1"), Some("Yes"));
        assert_eq!(reopened.get_explicit("900123"), Some("Yes"));
        assert_eq!(reopened.get("900123").unwrap().isrc.as_deref(), Some("USX123"));
        assert_eq!(reopened.get_explicit("P2"), Some("No"));
    }

    #[test]
    fn missing_file_starts_empty() {
        let (_dir, cache) = temp_cache();
        assert!(cache.is_empty());
        assert_eq!(cache.get_explicit("anything"), None);
    }

    #[test]
    fn malformed_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("track_cache.json");
        std::fs::write(&path, "{not json at all").unwrap();
        let mut cache = MetadataCache::open(path.clone());
        assert!(cache.is_empty());
        // Still usable; the next save replaces the bad file.
        cache.set_track_metadata("Yes", None, None, None, Some("900123"));
        let reopened = MetadataCache::open(path);
        assert_eq!(reopened.get_explicit("900123"), Some("Yes"));
    }

    #[test]
    fn clear_empties_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("track_cache.json");
        let mut cache = MetadataCache::open(path.clone());
        cache.set_track_metadata("Yes", None, None, None, Some("900123"));
        cache.clear();
        assert!(cache.is_empty());
        let reopened = MetadataCache::open(path);
        assert!(reopened.is_empty());
    }

    #[test]
    fn isrc_is_optional_in_stored_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("track_cache.json");
        let mut cache = MetadataCache::open(path.clone());
        cache.set_track_metadata("No", None, None, None, Some("900123"));
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"explicit\": \"No\""));
        assert!(!raw.contains("isrc"));
    }
}
