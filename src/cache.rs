//! Persisted snapshot of the last successful scan.
//!
//! The cache is only an optimisation: anything wrong with the file on disk results in an empty
//! snapshot and therefore a full rescan.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    data::GameRecord,
    error::{LauncherError, LauncherResult},
    macros::logs::debug_path,
    utils::write_atomic,
};

const COMPONENT: &str = "Cache";

/// Version of the cache file layout, bumped whenever it changes incompatibly
const CACHE_VERSION: u32 = 1;

/// Cheap proxy for a folder's contents, used to skip rescanning unchanged folders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderFingerprint {
    /// Latest modification time of the folder or any of its immediate children
    pub latest_modified_ms: i64,
    pub entry_count: usize,
    /// Hash of the sorted names of the immediate children
    pub listing_hash: String,
}

impl FolderFingerprint {
    #[tracing::instrument(level = "trace")]
    pub fn compute(folder: &Path) -> io::Result<Self> {
        let metadata = fs::metadata(folder)?;
        if !metadata.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                "game folder is not a directory",
            ));
        }

        let mut latest_modified_ms = modified_ms(&metadata);
        let mut names = Vec::new();

        for entry in fs::read_dir(folder)? {
            let entry = entry?;
            if let Ok(metadata) = entry.metadata() {
                latest_modified_ms = latest_modified_ms.max(modified_ms(&metadata));
            }
            names.push(entry.file_name().to_string_lossy().into_owned());
        }

        let listing = names.iter().sorted().join("\n");

        Ok(Self {
            latest_modified_ms,
            entry_count: names.len(),
            listing_hash: format!("{:x}", md5::compute(listing.as_bytes())),
        })
    }
}

fn modified_ms(metadata: &fs::Metadata) -> i64 {
    metadata
        .modified()
        .map(|time| DateTime::<Utc>::from(time).timestamp_millis())
        .unwrap_or_default()
}

/// The last known-good scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheSnapshot {
    pub folder_fingerprints: BTreeMap<PathBuf, FolderFingerprint>,
    pub records: Vec<GameRecord>,
}

/// On-disk layout; every field is required so that files written by other layouts are rejected
#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    last_scan: DateTime<Utc>,
    folder_fingerprints: BTreeMap<PathBuf, FolderFingerprint>,
    records: Vec<GameRecord>,
}

#[derive(Debug)]
pub struct CacheStore {
    path: PathBuf,
    fingerprints: BTreeMap<PathBuf, FolderFingerprint>,
}

impl CacheStore {
    pub fn new(path: PathBuf) -> Self {
        debug_path!("cache file", path);

        Self {
            path,
            fingerprints: BTreeMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the snapshot, failing softly to an empty one
    pub fn load(&mut self) -> CacheSnapshot {
        match self.try_load() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("{COMPONENT} - Discarding cache, a full rescan will follow: {e}");
                self.fingerprints.clear();
                CacheSnapshot::default()
            }
        }
    }

    /// Reads the snapshot, reporting why it could not be used
    #[tracing::instrument(level = "trace")]
    pub fn try_load(&mut self) -> LauncherResult<CacheSnapshot> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("{COMPONENT} - No cache file yet");
                self.fingerprints.clear();
                return Ok(CacheSnapshot::default());
            }
            Err(e) => return Err(LauncherError::CacheCorrupt(e.to_string())),
        };

        let file: CacheFile = serde_json::from_str(&content)
            .map_err(|e| LauncherError::CacheCorrupt(format!("failed to parse JSON: {e}")))?;

        if file.version != CACHE_VERSION {
            return Err(LauncherError::CacheCorrupt(format!(
                "unsupported version {}",
                file.version
            )));
        }

        tracing::debug!(
            records = file.records.len(),
            folders = file.folder_fingerprints.len(),
            last_scan = %file.last_scan,
            "{COMPONENT} - Loaded snapshot"
        );

        self.fingerprints.clone_from(&file.folder_fingerprints);

        Ok(CacheSnapshot {
            folder_fingerprints: file.folder_fingerprints,
            records: file.records,
        })
    }

    /// Replaces the cache file with the given snapshot atomically
    #[tracing::instrument(level = "trace", skip(snapshot))]
    pub fn save(&mut self, snapshot: &CacheSnapshot) -> LauncherResult<()> {
        let file = CacheFile {
            version: CACHE_VERSION,
            last_scan: Utc::now(),
            folder_fingerprints: snapshot.folder_fingerprints.clone(),
            records: snapshot.records.clone(),
        };

        write_atomic(&self.path, serde_json::to_string_pretty(&file)?)?;
        self.fingerprints.clone_from(&snapshot.folder_fingerprints);

        tracing::debug!(records = snapshot.records.len(), "{COMPONENT} - Saved snapshot");
        Ok(())
    }

    /// Returns true if the folder looks unchanged since the last load or save
    ///
    /// Missing or unreadable folders are never fresh.
    pub fn is_fresh(&self, folder: &Path) -> bool {
        let Some(stored) = self.fingerprints.get(folder) else {
            return false;
        };

        match FolderFingerprint::compute(folder) {
            Ok(current) => current == *stored,
            Err(e) => {
                tracing::debug!("{COMPONENT} - Could not fingerprint {folder:?}: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::utils::temp_path_for;

    fn snapshot_for(folder: &Path) -> CacheSnapshot {
        let record = GameRecord::new(
            "Game".to_owned(),
            folder.join("Game/Game.exe"),
            folder.to_path_buf(),
        );

        CacheSnapshot {
            folder_fingerprints: BTreeMap::from([(
                folder.to_path_buf(),
                FolderFingerprint::compute(folder).unwrap(),
            )]),
            records: vec![record],
        }
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CacheStore::new(dir.path().join("cache.json"));

        assert_eq!(store.load(), CacheSnapshot::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let games = dir.path().join("games");
        fs::create_dir_all(games.join("Game")).unwrap();

        let snapshot = snapshot_for(&games);
        let mut store = CacheStore::new(dir.path().join("cache.json"));
        store.save(&snapshot).unwrap();

        let mut reopened = CacheStore::new(dir.path().join("cache.json"));
        assert_eq!(reopened.load(), snapshot);
        assert!(reopened.is_fresh(&games));
    }

    #[test]
    fn test_corrupt_or_mismatched_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let mut store = CacheStore::new(path.clone());

        fs::write(&path, "{\"version\": 1, \"records\": [").unwrap();
        assert!(matches!(store.try_load(), Err(LauncherError::CacheCorrupt(_))));
        assert_eq!(store.load(), CacheSnapshot::default());

        fs::write(&path, r#"{"games": [], "last_scan": "yesterday"}"#).unwrap();
        assert_eq!(store.load(), CacheSnapshot::default());

        fs::write(
            &path,
            r#"{"version": 99, "last_scan": "2024-01-01T00:00:00Z", "folder_fingerprints": {}, "records": []}"#,
        )
        .unwrap();
        assert!(matches!(store.try_load(), Err(LauncherError::CacheCorrupt(_))));
    }

    #[test]
    fn test_interrupted_write_keeps_last_save() {
        let dir = tempfile::tempdir().unwrap();
        let games = dir.path().join("games");
        fs::create_dir_all(games.join("Game")).unwrap();
        let path = dir.path().join("cache.json");

        let snapshot = snapshot_for(&games);
        let mut store = CacheStore::new(path.clone());
        store.save(&snapshot).unwrap();

        // A crash mid-write only ever leaves the temporary file behind
        let partial = serde_json::to_string(&snapshot.records).unwrap();
        fs::write(temp_path_for(&path), &partial[..partial.len() / 2]).unwrap();

        let mut reopened = CacheStore::new(path);
        assert_eq!(reopened.load(), snapshot);

        // And the next save simply replaces it
        reopened.save(&CacheSnapshot::default()).unwrap();
        assert_eq!(reopened.load(), CacheSnapshot::default());
    }

    #[test]
    fn test_freshness() {
        let dir = tempfile::tempdir().unwrap();
        let games = dir.path().join("games");
        fs::create_dir_all(games.join("Game")).unwrap();

        let mut store = CacheStore::new(dir.path().join("cache.json"));
        assert!(!store.is_fresh(&games), "never fingerprinted");

        store.save(&snapshot_for(&games)).unwrap();
        assert!(store.is_fresh(&games));

        fs::create_dir(games.join("Another Game")).unwrap();
        assert!(!store.is_fresh(&games), "new entry");

        store.save(&snapshot_for(&games)).unwrap();
        fs::remove_dir_all(&games).unwrap();
        assert!(!store.is_fresh(&games), "missing folder");
    }
}
