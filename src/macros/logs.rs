// Each macro expects a `COMPONENT: &str` constant in scope of the calling module, used to prefix
// log messages.

macro_rules! debug_path {
    ($description: expr, $path: expr) => {
        tracing::debug!(
            "{COMPONENT} - {} exists at {:?}: {}",
            $description,
            $path,
            $path.exists()
        );
    };
}
pub(crate) use debug_path;

macro_rules! warn_no_games {
    ($folder: expr) => {
        tracing::warn!("{COMPONENT} - No games found in {:?}", $folder);
    };
}
pub(crate) use warn_no_games;

macro_rules! warn_skipped_folder {
    ($folder: expr, $reason: expr) => {
        tracing::warn!("{COMPONENT} - Skipping folder {:?}: {}", $folder, $reason);
    };
}
pub(crate) use warn_skipped_folder;

macro_rules! debug_rejected {
    ($path: expr, $reason: expr) => {
        tracing::debug!("{COMPONENT} - Rejected {:?}: {}", $path, $reason);
    };
}
pub(crate) use debug_rejected;
