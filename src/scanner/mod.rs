//! Discovery of games inside the configured folders.
//!
//! Each configured folder is a root. Inside a root:
//! - every non-hidden directory is one game, whose main executable is picked by an
//!   [`ExecutableScorer`] among all executables found below it
//! - every `.exe` directly inside the root is one game
//! - every `.lnk` directly inside the root is one game, if it points at an `.exe`
//!
//! Known non-game executables (uninstallers, redistributables, crash reporters...) are rejected by
//! keyword.

mod artwork;
mod scoring;
mod shortcut;

use std::{
    collections::HashSet,
    fmt::{self, Debug, Formatter},
    fs,
    path::{Path, PathBuf},
};

pub use artwork::{Artwork, NoIcons, SidecarIcons, find_artwork};
pub use scoring::{
    ExecutableCandidate, ExecutableScorer, NameMatchScorer, choose_main_executable,
    name_match_tier,
};
pub use shortcut::{ShellLinkResolver, ShortcutResolver};
use walkdir::{DirEntry, WalkDir};

use crate::{
    config::ScanConfig,
    data::{GameRecord, IconExtractor},
    error::{LauncherError, LauncherResult},
    macros::logs::{debug_rejected, warn_no_games, warn_skipped_folder},
    utils::{clean_game_title, has_extension, is_hidden},
};

const COMPONENT: &str = "Scanner";

/// Keywords which mark an executable as something other than a game
pub const DEFAULT_DENYLIST: [&str; 28] = [
    "unins",
    "uninst",
    "setup",
    "install",
    "redist",
    "vcredist",
    "vc_redist",
    "crash",
    "crashpad",
    "crashreport",
    "report",
    "update",
    "patch",
    "launcher",
    "bootstrap",
    "directx",
    "dxsetup",
    "dotnet",
    "ue4prereq",
    "easyanticheat",
    "battleye",
    "physx",
    "support",
    "cleanup",
    "diagnostic",
    "repair",
    "verify",
    "config",
];

/// Directories inside game folders which only hold installers for dependencies
const SKIPPED_DIRECTORIES: [&str; 6] = [
    "_commonredist",
    "redist",
    "redistributables",
    "__installer",
    "directx",
    "vcredist",
];

/// Result of scanning a set of folders
#[derive(Debug, Default)]
pub struct ScanReport {
    pub records: Vec<GameRecord>,
    /// Folders which could not be scanned
    pub warnings: Vec<LauncherError>,
}

pub struct Scanner {
    denylist: Vec<String>,
    max_depth: Option<usize>,
    scorer: Box<dyn ExecutableScorer>,
    shortcuts: Box<dyn ShortcutResolver>,
    icons: Box<dyn IconExtractor>,
}

impl Debug for Scanner {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Scanner")
            .field("denylist", &self.denylist.len())
            .field("max_depth", &self.max_depth)
            .field("shortcuts", &self.shortcuts)
            .field("icons", &self.icons)
            .finish_non_exhaustive()
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner {
    pub fn new() -> Self {
        Self {
            denylist: DEFAULT_DENYLIST.iter().map(ToString::to_string).collect(),
            max_depth: None,
            scorer: Box::new(NameMatchScorer),
            shortcuts: Box::new(ShellLinkResolver),
            icons: Box::new(NoIcons),
        }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        let mut scanner = Self::new();
        scanner.max_depth = config.max_depth;
        scanner
            .denylist
            .extend(config.extra_denylist.iter().map(|word| word.to_lowercase()));

        scanner
    }

    pub fn with_scorer(mut self, scorer: impl ExecutableScorer + 'static) -> Self {
        self.scorer = Box::new(scorer);
        self
    }

    pub fn with_shortcut_resolver(mut self, resolver: impl ShortcutResolver + 'static) -> Self {
        self.shortcuts = Box::new(resolver);
        self
    }

    pub fn with_icon_extractor(mut self, icons: impl IconExtractor + 'static) -> Self {
        self.icons = Box::new(icons);
        self
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Returns true if the executable's name contains a denylisted keyword
    pub fn is_denied(&self, executable: &Path) -> bool {
        let Some(stem) = executable.file_stem().and_then(|stem| stem.to_str()) else {
            return true;
        };
        let stem = stem.to_lowercase();

        self.denylist.iter().any(|word| stem.contains(word.as_str()))
    }

    /// Scans all given folders in order, deduplicating by resolved executable path
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn scan(&self, folders: &[PathBuf]) -> ScanReport {
        let mut report = ScanReport::default();
        let mut seen = HashSet::new();

        for folder in folders {
            match self.scan_folder(folder, &mut seen) {
                Ok(records) => report.records.extend(records),
                Err(e) => report.warnings.push(e),
            }
        }

        report
    }

    /// Scans a single root folder
    ///
    /// Ids already in `seen` are skipped and the ids of new records are added to it. Fails with
    /// [`LauncherError::FolderUnavailable`] if the folder cannot be listed.
    #[tracing::instrument(level = "trace", skip(self, seen))]
    pub fn scan_folder(
        &self,
        root: &Path,
        seen: &mut HashSet<String>,
    ) -> LauncherResult<Vec<GameRecord>> {
        let entries = fs::read_dir(root).map_err(|source| {
            warn_skipped_folder!(root, source);
            LauncherError::FolderUnavailable {
                path: root.to_path_buf(),
                source,
            }
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| !is_hidden(path))
            .collect();
        paths.sort_by_cached_key(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy().to_lowercase())
                .unwrap_or_default()
        });

        let mut records = Vec::new();
        for path in paths {
            let record = if path.is_dir() {
                self.game_from_folder(root, &path)
            } else if has_extension(&path, "exe") {
                self.game_from_executable(root, &path)
            } else if has_extension(&path, "lnk") {
                self.game_from_shortcut(root, &path)
            } else {
                None
            };

            let Some(record) = record else {
                continue;
            };

            if seen.insert(record.id.clone()) {
                tracing::trace!("{COMPONENT} - Found '{}' at {:?}", record.name, record.executable_path);
                records.push(record);
            } else {
                debug_rejected!(record.executable_path, "already found");
            }
        }

        if records.is_empty() {
            warn_no_games!(root);
        }

        Ok(records)
    }

    fn game_from_folder(&self, root: &Path, game_dir: &Path) -> Option<GameRecord> {
        let folder_name = game_dir.file_name()?.to_str()?;
        let candidates = self.collect_executables(game_dir);

        let Some(chosen) = choose_main_executable(&candidates, folder_name, self.scorer.as_ref())
        else {
            debug_rejected!(game_dir, "no executables");
            return None;
        };
        tracing::debug!(
            candidates = candidates.len(),
            "{COMPONENT} - Chose {:?} for '{folder_name}'",
            chosen.path
        );

        let mut record = self.build_record(folder_name, chosen.path.clone(), root);
        let artwork = find_artwork(game_dir);
        record.poster_path = artwork.poster;
        record.background_path = artwork.background;

        Some(record)
    }

    fn game_from_executable(&self, root: &Path, executable: &Path) -> Option<GameRecord> {
        if self.is_denied(executable) {
            debug_rejected!(executable, "denylisted");
            return None;
        }

        let stem = executable.file_stem()?.to_str()?;
        Some(self.build_record(stem, executable.to_path_buf(), root))
    }

    fn game_from_shortcut(&self, root: &Path, shortcut: &Path) -> Option<GameRecord> {
        let target = match self.shortcuts.resolve(shortcut) {
            Ok(target) => target,
            Err(e) => {
                debug_rejected!(shortcut, e);
                return None;
            }
        };

        if !has_extension(&target, "exe") {
            debug_rejected!(shortcut, format!("target {target:?} is not an executable"));
            return None;
        }
        if self.is_denied(&target) {
            debug_rejected!(shortcut, format!("target {target:?} is denylisted"));
            return None;
        }

        let stem = shortcut.file_stem()?.to_str()?;
        let mut record = self.build_record(stem, target, root);
        record.is_shortcut = true;

        Some(record)
    }

    fn build_record(&self, raw_name: &str, executable: PathBuf, root: &Path) -> GameRecord {
        let mut record = GameRecord::new(
            clean_game_title(raw_name),
            executable,
            root.to_path_buf(),
        );

        record.icon_path = self
            .icons
            .extract_icon(&record.executable_path)
            .inspect_err(|e| tracing::trace!("{COMPONENT} - {e}"))
            .ok();

        record
    }

    /// All acceptable executables below a game folder, in path order
    fn collect_executables(&self, game_dir: &Path) -> Vec<ExecutableCandidate> {
        let mut walker = WalkDir::new(game_dir)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name();
        if let Some(max_depth) = self.max_depth {
            walker = walker.max_depth(max_depth);
        }

        walker
            .into_iter()
            .filter_entry(|entry| !is_skipped_directory(entry))
            .filter_map(|entry| {
                entry
                    .inspect_err(|e| tracing::debug!("{COMPONENT} - Walk error: {e}"))
                    .ok()
            })
            .filter(|entry| entry.file_type().is_file() && has_extension(entry.path(), "exe"))
            .filter(|entry| {
                let denied = self.is_denied(entry.path());
                if denied {
                    debug_rejected!(entry.path(), "denylisted");
                }
                !denied
            })
            .map(|entry| ExecutableCandidate {
                size: entry.metadata().map(|m| m.len()).unwrap_or_default(),
                depth: entry.depth(),
                path: entry.into_path(),
            })
            .collect()
    }
}

fn is_skipped_directory(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }

    is_hidden(entry.path())
        || entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRECTORIES.contains(&name.to_lowercase().as_str()))
}
