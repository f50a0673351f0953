use std::{
    fmt::Display,
    fs,
    io::{self, Write},
    path::{Component, Path, PathBuf},
};

/// Image extensions accepted for icons and artwork, in order of preference
pub const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "webp", "bmp"];

/// Returns an Option containing the given `PathBuf`, if the `PathBuf` points to an actual file
pub fn some_if_file(path: PathBuf) -> Option<PathBuf> {
    path.is_file().then_some(path)
}

/// Returns an Option containing the given `PathBuf`, if the `PathBuf` points to an actual directory
pub fn some_if_dir(path: PathBuf) -> Option<PathBuf> {
    path.is_dir().then_some(path)
}

/// Returns the first existing image file path (based on a set number of image extensions) for a given
/// directory path and file name
///
/// e.g. dir/path/file_name.{png,jpg,jpeg,webp,bmp} will return the first path which actually
/// exists (or `None` if none of them exist)
pub fn get_existing_image_path(base_path: &Path, file_name: impl Display) -> Option<PathBuf> {
    IMAGE_EXTENSIONS
        .iter()
        .find_map(|ext| some_if_file(base_path.join(format!("{file_name}.{ext}"))))
}

/// Returns true if the path has the given extension, ignoring case
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// Returns true for names starting with a `.`
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'))
}

/// Removes `.` components and resolves `..` against the preceding component, without touching
/// the filesystem
///
/// `..` directly below a root is dropped, and leading `..` of a relative path are kept.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => normalized.push(component),
            },
            component => normalized.push(component),
        }
    }

    normalized
}

/// Writes the given contents to `path` without ever leaving a partially written file at `path`
///
/// The data is written and synced to a sibling temporary file first, which then replaces the
/// target through a rename.
pub fn write_atomic(path: &Path, contents: impl AsRef<[u8]>) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let path_tmp = temp_path_for(path);
    {
        let mut file = fs::File::create(&path_tmp)?;
        file.write_all(contents.as_ref())?;
        file.sync_all()?;
    }

    fs::rename(&path_tmp, path)
}

/// Sibling path used by [`write_atomic`] while a write is in progress
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut file_name = path.file_name().unwrap_or_default().to_os_string();
    file_name.push(".tmp");
    path.with_file_name(file_name)
}
