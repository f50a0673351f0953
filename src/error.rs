//! Error types used by this crate.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Custom error type returned when something goes wrong while discovering, caching or launching
/// games.
///
/// Most of these are soft failures: callers log them and fall back to an empty or default value.
/// Only [`LauncherError::InvalidConfig`] is expected to end the process.
#[derive(Error, Debug)]
pub enum LauncherError {
    /// A configured game folder is missing or could not be read
    #[error("Game folder unavailable: {path:?} ({source})")]
    FolderUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The cache file exists but could not be used
    #[error("Cache is corrupt: {0}")]
    CacheCorrupt(String),

    /// No icon could be found or extracted for an executable
    #[error("No icon available for {0:?}")]
    IconExtractionFailed(PathBuf),

    /// Spawning a game process failed
    #[error("Failed to launch {path:?}: {reason}")]
    LaunchFailed { path: PathBuf, reason: String },

    /// The configuration file is present but is not valid for the expected schema
    #[error("Invalid configuration file {path:?}: {source}")]
    InvalidConfig {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A `.lnk` shortcut could not be resolved to a target
    #[error("Invalid shortcut: {0}")]
    InvalidShortcut(String),

    /// Error originating from [`io::Error`]
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Error originating from [`serde_json::Error`]
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Error originating from [`nom::Err`]
    #[error(transparent)]
    Nom(#[from] nom::Err<nom::error::Error<String>>),

    /// Error originating from any other source
    #[error("Other error: {0}")]
    Other(String),
}

impl From<nom::Err<nom::error::Error<&str>>> for LauncherError {
    fn from(err: nom::Err<nom::error::Error<&str>>) -> Self {
        Self::Nom(err.map_input(Into::into))
    }
}

impl From<nom::Err<nom::error::Error<&[u8]>>> for LauncherError {
    fn from(err: nom::Err<nom::error::Error<&[u8]>>) -> Self {
        Self::Nom(err.map_input(|bytes| format!("{} bytes remaining", bytes.len())))
    }
}

/// Custom Result type for this crate
pub type LauncherResult<T> = Result<T, LauncherError>;
