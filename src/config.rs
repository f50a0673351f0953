//! Launcher configuration, loaded from a JSON document.
//!
//! Every section is `#[serde(default)]`, so a partial document only overrides the keys it names
//! and unknown keys are ignored. A document which is present but cannot be parsed is the one
//! configuration error treated as fatal by the binary.

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{
    data::SortOrder,
    default_launch_wrapper,
    error::{LauncherError, LauncherResult},
    input::LayoutOverride,
    macros::logs::debug_path,
    parsers,
    utils::write_atomic,
};

const COMPONENT: &str = "Config";

/// Directory name used under the platform config, cache and data directories
pub const APP_DIR_NAME: &str = "game-launcher";

const CONFIG_FILE: &str = "config.json";
const CACHE_FILE: &str = "games_cache.json";
const METADATA_FILE: &str = "play_history.json";

/// RGB colour
pub type Rgb = [u8; 3];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub game_folders: Vec<PathBuf>,
    pub window: WindowConfig,
    pub ui: UiConfig,
    pub controller: ControllerConfig,
    pub sorting: SortOrder,
    pub show_recently_played: bool,
    pub max_recent_games: usize,
    pub scan: ScanConfig,
    pub launch: LaunchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            game_folders: Vec::new(),
            window: WindowConfig::default(),
            ui: UiConfig::default(),
            controller: ControllerConfig::default(),
            sorting: SortOrder::Alphabetical,
            show_recently_played: true,
            max_recent_games: 10,
            scan: ScanConfig::default(),
            launch: LaunchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fullscreen: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub tiles_per_row: usize,
    pub tile_size: u32,
    pub tile_spacing: u32,
    pub scroll_speed: u32,
    pub highlight_color: Rgb,
    pub background_color: Rgb,
    pub text_color: Rgb,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            tiles_per_row: 7,
            tile_size: 200,
            tile_spacing: 30,
            scroll_speed: 15,
            highlight_color: [0, 150, 255],
            background_color: [20, 20, 30],
            text_color: [255, 255, 255],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub deadzone: f32,
    /// Milliseconds a direction must be held before it starts repeating
    pub repeat_delay: u64,
    /// Milliseconds between repeats once repeating
    pub repeat_interval: u64,
    pub button_mapping: LayoutOverride,
}

impl ControllerConfig {
    pub fn repeat_delay(&self) -> Duration {
        Duration::from_millis(self.repeat_delay)
    }

    pub fn repeat_interval(&self) -> Duration {
        Duration::from_millis(self.repeat_interval)
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            deadzone: 0.3,
            repeat_delay: 500,
            repeat_interval: 150,
            button_mapping: LayoutOverride::Auto,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Maximum depth searched below each game folder, unlimited when absent
    pub max_depth: Option<usize>,
    /// Keywords rejected in addition to the built-in denylist
    pub extra_denylist: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    /// Command prefix used to run executables, e.g. `["wine"]`
    pub wrapper: Option<Vec<String>>,
}

impl LaunchConfig {
    /// The configured wrapper, or the platform default
    pub fn wrapper_command(&self) -> Vec<String> {
        self.wrapper.clone().unwrap_or_else(default_launch_wrapper)
    }
}

impl Config {
    /// Parses a configuration document
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Appends a game folder, returning whether it was added
    ///
    /// Relative paths are made absolute, and paths which are not existing directories are
    /// rejected. Folders already present are skipped.
    pub fn add_folder(&mut self, folder: &Path) -> LauncherResult<bool> {
        let folder = std::path::absolute(folder)?;

        if !folder.is_dir() {
            return Err(LauncherError::FolderUnavailable {
                path: folder,
                source: io::Error::new(io::ErrorKind::NotFound, "not a directory"),
            });
        }

        if self.game_folders.contains(&folder) {
            tracing::debug!("{COMPONENT} - Folder already configured: {folder:?}");
            return Ok(false);
        }

        self.game_folders.push(folder);
        Ok(true)
    }

    pub fn set_resolution(&mut self, width: u32, height: u32) {
        self.window.width = width;
        self.window.height = height;
    }
}

/// Parses a `WIDTHxHEIGHT` resolution such as `1280x720`
pub fn parse_resolution(value: &str) -> LauncherResult<(u32, u32)> {
    let (_, (width, height)) = parsers::parse_resolution(value.trim())?;

    if width == 0 || height == 0 {
        return Err(LauncherError::Other(format!(
            "resolution must not be zero: {value}"
        )));
    }

    Ok((width, height))
}

/// File locations used by the launcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherPaths {
    pub config: PathBuf,
    pub cache: PathBuf,
    pub metadata: PathBuf,
}

impl LauncherPaths {
    /// Default locations, under the platform's config, cache and data directories
    pub fn from_system_dirs() -> LauncherResult<Self> {
        Self::resolve(None, None)
    }

    /// Locations with the given overrides applied
    ///
    /// Platform directories are only looked up for the files not covered by an override.
    pub fn resolve(config: Option<PathBuf>, data_dir: Option<&Path>) -> LauncherResult<Self> {
        let config = match config {
            Some(config) => config,
            None => app_dir(dirs::config_dir(), "config")?.join(CONFIG_FILE),
        };

        let (cache, metadata) = match data_dir {
            Some(dir) => (dir.join(CACHE_FILE), dir.join(METADATA_FILE)),
            None => (
                app_dir(dirs::cache_dir(), "cache")?.join(CACHE_FILE),
                app_dir(dirs::data_dir(), "data")?.join(METADATA_FILE),
            ),
        };

        Ok(Self {
            config,
            cache,
            metadata,
        })
    }

    /// Keep the cache and play history in the given directory instead
    pub fn with_data_dir(mut self, dir: &Path) -> Self {
        self.cache = dir.join(CACHE_FILE);
        self.metadata = dir.join(METADATA_FILE);
        self
    }

    pub fn with_config(mut self, config: PathBuf) -> Self {
        self.config = config;
        self
    }
}

fn app_dir(base: Option<PathBuf>, kind: &str) -> LauncherResult<PathBuf> {
    base.map(|base| base.join(APP_DIR_NAME))
        .ok_or_else(|| LauncherError::Other(format!("could not find a {kind} directory")))
}

/// Owns the configuration together with the file it was loaded from
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    config: Config,
}

impl ConfigStore {
    /// Loads the configuration at `path`, using defaults if the file does not exist
    #[tracing::instrument(level = "trace")]
    pub fn load(path: PathBuf) -> LauncherResult<Self> {
        debug_path!("config file", path);

        let config = match fs::read_to_string(&path) {
            Ok(content) => Config::from_json(&content).map_err(|source| {
                LauncherError::InvalidConfig {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Config::default(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self { path, config })
    }

    pub fn new(path: PathBuf, config: Config) -> Self {
        Self { path, config }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn save(&self) -> LauncherResult<()> {
        let content = serde_json::to_string_pretty(&self.config)?;
        write_atomic(&self.path, content)?;

        tracing::debug!("{COMPONENT} - Saved to {:?}", self.path);
        Ok(())
    }
}
