//! Fixtures shared by the integration tests

#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
};

use game_launcher::{
    cache::CacheStore, metadata::MetadataStore, registry::Registry, scanner::Scanner,
};
use tempfile::TempDir;

/// Temporary directory holding game folders, a configuration file and launcher data
pub struct Library {
    pub dir: TempDir,
}

impl Library {
    pub fn new() -> Self {
        let library = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        fs::create_dir_all(library.games()).unwrap();
        library
    }

    /// The default game folder
    pub fn games(&self) -> PathBuf {
        self.dir.path().join("games")
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("config").join("config.json")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    /// Creates a file of `size` bytes below the library, with any missing parent directories
    pub fn add_file(&self, relative: impl AsRef<Path>, size: usize) -> PathBuf {
        let path = self.dir.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, vec![b'M'; size]).unwrap();
        path
    }

    /// Writes a configuration file scanning the given folders below the library
    pub fn write_config(&self, folders: &[&str], extra: &str) {
        let folders: Vec<String> = folders
            .iter()
            .map(|folder| {
                serde_json::to_string(&self.dir.path().join(folder).to_string_lossy()).unwrap()
            })
            .collect();
        let separator = if extra.is_empty() { "" } else { "," };

        let path = self.config_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            path,
            format!(
                r#"{{ "game_folders": [{}]{separator}{extra} }}"#,
                folders.join(", ")
            ),
        )
        .unwrap();
    }

    /// A registry over the given folders, persisting to the library's data directory
    pub fn registry(&self, folders: &[&str]) -> Registry {
        Registry::new(
            folders.iter().map(|f| self.dir.path().join(f)).collect(),
            Scanner::new(),
            CacheStore::new(self.data_dir().join("games_cache.json")),
            MetadataStore::open(self.data_dir().join("play_history.json")),
        )
    }
}
