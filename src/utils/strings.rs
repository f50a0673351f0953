use itertools::Itertools;

use crate::parsers::is_version_token;

/// Suffixes appended to executables by common engines, matched case-insensitively
const ENGINE_SUFFIXES: [&str; 3] = ["-win64-shipping", "-win32-shipping", "-wingdk-shipping"];

/// Trailing words describing the build architecture rather than the game
const BITNESS_MARKERS: [&str; 8] = [
    "x64", "x86", "win64", "win32", "64bit", "32bit", "amd64", "shipping",
];

/// Cleans up a raw file or folder name into a display title
///
/// e.g. `super_game-v1.2_x64` becomes `Super Game`
pub fn clean_game_title(title: impl AsRef<str>) -> String {
    let title = title.as_ref().replace(['™', '®'], "");
    let title = strip_engine_suffix(&title);

    let mut words: Vec<&str> = title
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .collect();

    // Never strip the title down to nothing, e.g. a game named `x64`
    while words.len() > 1
        && words
            .last()
            .is_some_and(|word| is_bitness_marker(word) || is_version_token(word))
    {
        words.pop();
    }

    words.into_iter().map(capitalize_first).join(" ")
}

/// Lowercases and removes anything which is not alphanumeric, for loose name comparisons
pub fn normalize_for_match(name: impl AsRef<str>) -> String {
    name.as_ref()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn strip_engine_suffix(title: &str) -> &str {
    let lower = title.to_lowercase();
    ENGINE_SUFFIXES
        .iter()
        .find(|suffix| lower.ends_with(*suffix))
        // Suffixes are ASCII so byte lengths line up between both strings
        .and_then(|suffix| title.get(..title.len() - suffix.len()))
        .unwrap_or(title)
}

fn is_bitness_marker(word: &str) -> bool {
    BITNESS_MARKERS.contains(&word.to_lowercase().as_str())
}

fn capitalize_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
