use std::{
    fmt::{self, Debug, Display, Formatter},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LauncherResult;

/// Number of hex characters of the path hash used as a record id
const ID_LENGTH: usize = 12;

/// Data structure which defines all relevant data about any particular discovered game
///
/// Only the discovery data is serialized. `play_count` and `last_played` live in the separate
/// metadata store so that rescans never reset play history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: String,
    pub name: String,
    pub executable_path: PathBuf,
    pub source_folder: PathBuf,
    pub icon_path: Option<PathBuf>,
    #[serde(default)]
    pub poster_path: Option<PathBuf>,
    #[serde(default)]
    pub background_path: Option<PathBuf>,
    #[serde(default)]
    pub is_shortcut: bool,
    #[serde(skip)]
    pub play_count: u32,
    #[serde(skip)]
    pub last_played: Option<DateTime<Utc>>,
}

impl GameRecord {
    pub fn new(name: String, executable_path: PathBuf, source_folder: PathBuf) -> Self {
        Self {
            id: Self::id_for(&executable_path),
            name,
            executable_path,
            source_folder,
            icon_path: None,
            poster_path: None,
            background_path: None,
            is_shortcut: false,
            play_count: 0,
            last_played: None,
        }
    }

    /// Stable id derived from the resolved executable path
    pub fn id_for(executable_path: &Path) -> String {
        let mut hash = format!(
            "{:x}",
            md5::compute(executable_path.to_string_lossy().as_bytes())
        );
        hash.truncate(ID_LENGTH);
        hash
    }
}

/// Orderings offered for the game grid
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Alphabetical,
    Recent,
    Folder,
    PlayCount,
}

impl SortOrder {
    pub const ALL: [SortOrder; 4] = [
        SortOrder::Alphabetical,
        SortOrder::Recent,
        SortOrder::Folder,
        SortOrder::PlayCount,
    ];

    /// The order following this one, wrapping around
    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|o| *o == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

impl Display for SortOrder {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                SortOrder::Alphabetical => "Alphabetical",
                SortOrder::Recent => "Recently played",
                SortOrder::Folder => "Folder",
                SortOrder::PlayCount => "Most played",
            }
        )
    }
}

// Icon extraction is platform specific, so the scanner only asks for an icon and tolerates failure
pub trait IconExtractor: Debug {
    /// Returns the path of an image usable as the icon for the given executable
    fn extract_icon(&self, executable: &Path) -> LauncherResult<PathBuf>;
}
