use std::{
    fmt::Debug,
    fs,
    path::{MAIN_SEPARATOR_STR, Path, PathBuf},
};

use crate::{
    error::{LauncherError, LauncherResult},
    parsers::parse_shell_link,
    utils::normalize_path,
};

/// Resolves `.lnk` shortcut files to the path they point at
pub trait ShortcutResolver: Debug {
    fn resolve(&self, shortcut: &Path) -> LauncherResult<PathBuf>;
}

/// Reads the target straight out of the Shell Link binary format
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellLinkResolver;

impl ShortcutResolver for ShellLinkResolver {
    #[tracing::instrument(level = "trace")]
    fn resolve(&self, shortcut: &Path) -> LauncherResult<PathBuf> {
        let bytes = fs::read(shortcut)?;
        let (_, link) = parse_shell_link(&bytes)?;

        if let Some(target) = link.absolute_target() {
            return Ok(PathBuf::from(target));
        }

        if let Some(relative_path) = link.relative_path.filter(|p| !p.is_empty()) {
            let relative_path = relative_path.replace('\\', MAIN_SEPARATOR_STR);
            let base = shortcut.parent().unwrap_or(Path::new(""));

            return Ok(normalize_path(&base.join(relative_path)));
        }

        Err(LauncherError::InvalidShortcut(format!(
            "{shortcut:?} does not contain a target path"
        )))
    }
}
