//! The canonical list of games, merged from scans, the cache and play history.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashSet},
    path::{Path, PathBuf},
};

use chrono::Utc;
use itertools::Itertools;

use crate::{
    cache::{CacheSnapshot, CacheStore, FolderFingerprint},
    config::{Config, LauncherPaths},
    data::{GameRecord, SortOrder},
    error::{LauncherError, LauncherResult},
    metadata::MetadataStore,
    scanner::{Scanner, SidecarIcons},
};

const COMPONENT: &str = "Registry";

/// What a call to [`Registry::rescan`] did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RescanSummary {
    pub total: usize,
    pub rescanned_folders: usize,
    pub reused_folders: usize,
    pub skipped_folders: usize,
}

#[derive(Debug)]
pub struct Registry {
    folders: Vec<PathBuf>,
    scanner: Scanner,
    cache: CacheStore,
    metadata: MetadataStore,
    records: Vec<GameRecord>,
    fingerprints: BTreeMap<PathBuf, FolderFingerprint>,
    warnings: Vec<LauncherError>,
}

impl Registry {
    /// Creates a registry holding whatever the cache knows about the given folders
    ///
    /// Call [`Registry::rescan`] afterwards to bring it up to date.
    pub fn new(
        folders: Vec<PathBuf>,
        scanner: Scanner,
        mut cache: CacheStore,
        metadata: MetadataStore,
    ) -> Self {
        let CacheSnapshot {
            folder_fingerprints,
            records,
        } = cache.load();

        let mut records: Vec<GameRecord> = records
            .into_iter()
            .filter(|record| folders.contains(&record.source_folder))
            .collect();
        records
            .iter_mut()
            .for_each(|record| metadata.apply_to(record));

        tracing::debug!(
            cached = records.len(),
            folders = folders.len(),
            "{COMPONENT} - Initialised from cache"
        );

        Self {
            folders,
            scanner,
            cache,
            metadata,
            records,
            fingerprints: folder_fingerprints,
            warnings: Vec::new(),
        }
    }

    /// Registry using the configured folders and the default file locations
    pub fn open(config: &Config, paths: &LauncherPaths) -> Self {
        let scanner = Scanner::from_config(&config.scan).with_icon_extractor(SidecarIcons);

        Self::new(
            config.game_folders.clone(),
            scanner,
            CacheStore::new(paths.cache.clone()),
            MetadataStore::open(paths.metadata.clone()),
        )
    }

    pub fn folders(&self) -> &[PathBuf] {
        &self.folders
    }

    /// Changes the configured folders, taking effect on the next rescan
    pub fn set_folders(&mut self, folders: Vec<PathBuf>) {
        self.folders = folders;
    }

    /// Records in scan order
    pub fn records(&self) -> &[GameRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&GameRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    /// Problems met during the last rescan, such as unavailable folders
    pub fn warnings(&self) -> &[LauncherError] {
        &self.warnings
    }

    /// Brings the records up to date with the configured folders
    ///
    /// Unless `force` is set, folders whose fingerprint is unchanged keep their cached records.
    /// The new record set replaces the old one in one step, and is then written to the cache.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn rescan(&mut self, force: bool) -> RescanSummary {
        let mut summary = RescanSummary::default();
        let mut seen = HashSet::new();
        let mut records = Vec::new();
        let mut fingerprints = BTreeMap::new();
        let mut warnings = Vec::new();
        // Last known records of unavailable folders, hidden but kept in the cache
        let mut unavailable = Vec::new();

        for folder in &self.folders {
            if !force && self.cache.is_fresh(folder) {
                records.extend(
                    self.records
                        .iter()
                        .filter(|record| record.source_folder == *folder)
                        .filter(|record| seen.insert(record.id.clone()))
                        .cloned(),
                );
                if let Some(fingerprint) = self.fingerprints.get(folder) {
                    fingerprints.insert(folder.clone(), fingerprint.clone());
                }

                tracing::debug!("{COMPONENT} - Reusing cached records for {folder:?}");
                summary.reused_folders += 1;
                continue;
            }

            // Fingerprint first so that changes made during the scan trigger another one
            let fingerprint = FolderFingerprint::compute(folder);
            match self.scanner.scan_folder(folder, &mut seen) {
                Ok(found) => {
                    records.extend(found);
                    if let Ok(fingerprint) = fingerprint {
                        fingerprints.insert(folder.clone(), fingerprint);
                    }
                    summary.rescanned_folders += 1;
                }
                Err(e) => {
                    unavailable.extend(
                        self.records
                            .iter()
                            .filter(|record| record.source_folder == *folder)
                            .cloned(),
                    );
                    warnings.push(e);
                    summary.skipped_folders += 1;
                }
            }
        }

        for record in &mut records {
            self.metadata.apply_to(record);
        }
        // Play history of games on unavailable folders is kept until the folder is removed
        let ids: HashSet<&str> = records
            .iter()
            .chain(&unavailable)
            .map(|record| record.id.as_str())
            .collect();
        if self.metadata.retain(|id| ids.contains(id)) {
            if let Err(e) = self.metadata.save() {
                tracing::error!("{COMPONENT} - Failed to save play history: {e}");
            }
        }

        let changed = summary.rescanned_folders > 0 || fingerprints != self.fingerprints;

        self.records = records;
        self.fingerprints = fingerprints;
        self.warnings = warnings;
        summary.total = self.records.len();

        if changed {
            let snapshot = CacheSnapshot {
                folder_fingerprints: self.fingerprints.clone(),
                records: self.records.iter().chain(&unavailable).cloned().collect(),
            };
            if let Err(e) = self.cache.save(&snapshot) {
                tracing::error!("{COMPONENT} - Failed to save cache: {e}");
            }
        }

        tracing::info!(
            total = summary.total,
            rescanned = summary.rescanned_folders,
            reused = summary.reused_folders,
            skipped = summary.skipped_folders,
            "{COMPONENT} - Rescan complete"
        );

        summary
    }

    /// Ordered view over the records, which can be iterated any number of times
    pub fn sorted_view(&self, order: SortOrder) -> SortedView<'_> {
        let records = self.records.as_slice();
        let indices = (0..records.len())
            .sorted_by(|a, b| {
                let (a, b) = (&records[*a], &records[*b]);
                match order {
                    SortOrder::Alphabetical => compare_names(a, b),
                    SortOrder::Recent => b
                        .last_played
                        .cmp(&a.last_played)
                        .then_with(|| compare_names(a, b)),
                    SortOrder::Folder => self
                        .folder_position(&a.source_folder)
                        .cmp(&self.folder_position(&b.source_folder))
                        .then_with(|| compare_names(a, b)),
                    SortOrder::PlayCount => b
                        .play_count
                        .cmp(&a.play_count)
                        .then_with(|| compare_names(a, b)),
                }
            })
            .collect();

        SortedView { records, indices }
    }

    fn folder_position(&self, folder: &Path) -> usize {
        self.folders
            .iter()
            .position(|f| f == folder)
            .unwrap_or(usize::MAX)
    }

    /// Counts a launch of the game with the given id, persisting it immediately
    pub fn record_launch(&mut self, id: &str) -> LauncherResult<()> {
        let record = self
            .records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or_else(|| LauncherError::Other(format!("unknown game id: {id}")))?;

        let metadata = self.metadata.record_launch(id, Utc::now())?;
        record.play_count = metadata.play_count;
        record.last_played = metadata.last_played;

        tracing::debug!(
            play_count = record.play_count,
            "{COMPONENT} - Recorded launch of '{}'",
            record.name
        );
        Ok(())
    }

    /// Up to `max` played games, most recent first
    pub fn recently_played(&self, max: usize) -> Vec<&GameRecord> {
        self.sorted_view(SortOrder::Recent)
            .iter()
            .take_while(|record| record.last_played.is_some())
            .take(max)
            .collect()
    }

    /// Games whose name contains `query`, ignoring case, in alphabetical order
    pub fn search(&self, query: &str) -> Vec<&GameRecord> {
        let query = query.trim().to_lowercase();

        self.sorted_view(SortOrder::Alphabetical)
            .iter()
            .filter(|record| record.name.to_lowercase().contains(&query))
            .collect()
    }
}

/// Case-insensitive name order, with ties broken by id
fn compare_names(a: &GameRecord, b: &GameRecord) -> Ordering {
    a.name
        .to_lowercase()
        .cmp(&b.name.to_lowercase())
        .then_with(|| a.id.cmp(&b.id))
}

/// Ordered, restartable sequence of records
#[derive(Debug, Clone)]
pub struct SortedView<'a> {
    records: &'a [GameRecord],
    indices: Vec<usize>,
}

impl<'a> SortedView<'a> {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&'a GameRecord> {
        let records = self.records;
        self.indices.get(position).map(|index| &records[*index])
    }

    /// Position of the record with the given id in this view
    pub fn position(&self, id: &str) -> Option<usize> {
        self.iter().position(|record| record.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a GameRecord> + '_ {
        let records = self.records;
        self.indices.iter().map(move |index| &records[*index])
    }
}

impl<'a, 'v> IntoIterator for &'v SortedView<'a> {
    type Item = &'a GameRecord;
    type IntoIter = Box<dyn Iterator<Item = &'a GameRecord> + 'v>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
