use std::path::{Path, PathBuf};

use crate::{
    data::IconExtractor,
    error::{LauncherError, LauncherResult},
    utils::{get_existing_image_path, some_if_dir},
};

/// Folder inside a game folder which may hold artwork for it
const IMAGES_DIR: &str = "images_";

/// Icon extractor for platforms without one, every record uses the default icon
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIcons;

impl IconExtractor for NoIcons {
    fn extract_icon(&self, executable: &Path) -> LauncherResult<PathBuf> {
        Err(LauncherError::IconExtractionFailed(executable.to_path_buf()))
    }
}

/// Uses an image shipped next to the executable, named either after it or `icon`
#[derive(Debug, Default, Clone, Copy)]
pub struct SidecarIcons;

impl IconExtractor for SidecarIcons {
    fn extract_icon(&self, executable: &Path) -> LauncherResult<PathBuf> {
        let not_found = || LauncherError::IconExtractionFailed(executable.to_path_buf());

        let dir = executable.parent().ok_or_else(not_found)?;
        let stem = executable
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(not_found)?;

        get_existing_image_path(dir, stem)
            .or_else(|| get_existing_image_path(dir, "icon"))
            .ok_or_else(not_found)
    }
}

/// Poster and background images for a game folder
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Artwork {
    pub poster: Option<PathBuf>,
    pub background: Option<PathBuf>,
}

pub fn find_artwork(game_dir: &Path) -> Artwork {
    let Some(path_images) = some_if_dir(game_dir.join(IMAGES_DIR)) else {
        return Artwork::default();
    };

    Artwork {
        poster: get_existing_image_path(&path_images, "poster"),
        background: get_existing_image_path(&path_images, "background"),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_sidecar_icons() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("Game.exe");
        fs::write(&exe, b"MZ").unwrap();

        assert!(matches!(
            SidecarIcons.extract_icon(&exe),
            Err(LauncherError::IconExtractionFailed(_))
        ));

        fs::write(dir.path().join("icon.png"), b"png").unwrap();
        assert_eq!(
            SidecarIcons.extract_icon(&exe).unwrap(),
            dir.path().join("icon.png")
        );

        fs::write(dir.path().join("Game.jpg"), b"jpg").unwrap();
        assert_eq!(
            SidecarIcons.extract_icon(&exe).unwrap(),
            dir.path().join("Game.jpg")
        );

        assert!(NoIcons.extract_icon(&exe).is_err());
    }

    #[test]
    fn test_find_artwork() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(find_artwork(dir.path()), Artwork::default());

        let images = dir.path().join(IMAGES_DIR);
        fs::create_dir(&images).unwrap();
        fs::write(images.join("poster.webp"), b"webp").unwrap();

        assert_eq!(
            find_artwork(dir.path()),
            Artwork {
                poster: Some(images.join("poster.webp")),
                background: None,
            }
        );
    }
}
