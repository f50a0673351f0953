//! Play history, stored apart from the scan cache so that rescans never reset it.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{data::GameRecord, error::LauncherResult, utils::write_atomic};

const COMPONENT: &str = "Metadata";

const METADATA_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMetadata {
    pub play_count: u32,
    pub last_played: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct MetadataFile {
    version: u32,
    #[serde(default)]
    games: BTreeMap<String, GameMetadata>,
}

/// Play counts and last played times, keyed by record id
#[derive(Debug)]
pub struct MetadataStore {
    path: PathBuf,
    entries: BTreeMap<String, GameMetadata>,
}

impl MetadataStore {
    /// Opens the store at `path`; an unreadable file is logged and treated as empty
    #[tracing::instrument(level = "trace")]
    pub fn open(path: PathBuf) -> Self {
        let entries = match Self::read(&path) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("{COMPONENT} - Could not read play history at {path:?}: {e}");
                BTreeMap::new()
            }
        };

        tracing::debug!(games = entries.len(), "{COMPONENT} - Opened play history");
        Self { path, entries }
    }

    fn read(path: &Path) -> LauncherResult<BTreeMap<String, GameMetadata>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };

        let file: MetadataFile = serde_json::from_str(&content)?;
        if file.version != METADATA_VERSION {
            tracing::warn!(
                "{COMPONENT} - Unexpected play history version {}, reading anyway",
                file.version
            );
        }

        Ok(file.games)
    }

    pub fn get(&self, id: &str) -> Option<&GameMetadata> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copies the stored play history onto a record
    pub fn apply_to(&self, record: &mut GameRecord) {
        let metadata = self.entries.get(&record.id).cloned().unwrap_or_default();
        record.play_count = metadata.play_count;
        record.last_played = metadata.last_played;
    }

    /// Overwrites the history for one id without persisting it
    pub fn set(&mut self, id: impl Into<String>, metadata: GameMetadata) {
        self.entries.insert(id.into(), metadata);
    }

    /// Counts a launch and persists the change immediately
    pub fn record_launch(
        &mut self,
        id: &str,
        at: DateTime<Utc>,
    ) -> LauncherResult<GameMetadata> {
        let entry = self.entries.entry(id.to_owned()).or_default();
        entry.play_count = entry.play_count.saturating_add(1);
        entry.last_played = Some(at);
        let updated = entry.clone();

        self.save()?;
        Ok(updated)
    }

    /// Drops history for ids not accepted by `keep`, returning whether anything was removed
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) -> bool {
        let before = self.entries.len();
        self.entries.retain(|id, _| keep(id));

        let removed = before - self.entries.len();
        if removed > 0 {
            tracing::debug!(removed, "{COMPONENT} - Dropped history of games no longer found");
        }
        removed > 0
    }

    pub fn save(&self) -> LauncherResult<()> {
        let file = MetadataFile {
            version: METADATA_VERSION,
            games: self.entries.clone(),
        };
        write_atomic(&self.path, serde_json::to_string_pretty(&file)?)?;

        Ok(())
    }
}
