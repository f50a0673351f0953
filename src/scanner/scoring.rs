use std::path::PathBuf;

use itertools::Itertools;

use crate::utils::normalize_for_match;

/// Executable found inside a game folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableCandidate {
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Depth below the game folder, 1 for files directly inside it
    pub depth: usize,
}

impl ExecutableCandidate {
    pub fn stem(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default()
    }
}

/// Strategy deciding which executable of a game folder is the game itself
///
/// The highest score wins; ties go to the candidate found first. Any
/// `Fn(&ExecutableCandidate, &str) -> u64` closure can be used as a strategy.
pub trait ExecutableScorer {
    fn score(&self, candidate: &ExecutableCandidate, folder_name: &str) -> u64;
}

impl<F> ExecutableScorer for F
where
    F: Fn(&ExecutableCandidate, &str) -> u64,
{
    fn score(&self, candidate: &ExecutableCandidate, folder_name: &str) -> u64 {
        self(candidate, folder_name)
    }
}

/// Default strategy: closeness of the name to the folder name, then file size, then depth
#[derive(Debug, Default, Clone, Copy)]
pub struct NameMatchScorer;

const TIER_SHIFT: u32 = 60;
const SIZE_SHIFT: u32 = 4;
const MAX_SIZE: u64 = (1 << (TIER_SHIFT - SIZE_SHIFT)) - 1;
const MAX_DEPTH_BONUS: u64 = (1 << SIZE_SHIFT) - 1;

impl ExecutableScorer for NameMatchScorer {
    fn score(&self, candidate: &ExecutableCandidate, folder_name: &str) -> u64 {
        let tier = name_match_tier(candidate.stem(), folder_name);
        let size = candidate.size.min(MAX_SIZE);
        let depth_bonus = MAX_DEPTH_BONUS.saturating_sub(candidate.depth as u64);

        (tier << TIER_SHIFT) | (size << SIZE_SHIFT) | depth_bonus
    }
}

/// 3 for an exact match ignoring case and separators, 2 if one name contains the other, 1 if
/// they share a word, 0 otherwise
pub fn name_match_tier(stem: &str, folder_name: &str) -> u64 {
    let normalized_stem = normalize_for_match(stem);
    let normalized_folder = normalize_for_match(folder_name);

    if normalized_stem.is_empty() || normalized_folder.is_empty() {
        return 0;
    }
    if normalized_stem == normalized_folder {
        return 3;
    }
    if normalized_stem.contains(&normalized_folder) || normalized_folder.contains(&normalized_stem)
    {
        return 2;
    }

    let words = |name: &str| -> Vec<String> {
        name.split(|c: char| !c.is_alphanumeric())
            .filter(|word| word.len() > 2)
            .map(str::to_lowercase)
            .collect()
    };
    let folder_words = words(folder_name);

    if words(stem).iter().any(|word| folder_words.contains(word)) {
        1
    } else {
        0
    }
}

/// Picks the best candidate according to the given strategy
pub fn choose_main_executable<'a>(
    candidates: &'a [ExecutableCandidate],
    folder_name: &str,
    scorer: &dyn ExecutableScorer,
) -> Option<&'a ExecutableCandidate> {
    // `position_max_by_key` returns the last maximum, so iterate in reverse to favour the first
    candidates
        .iter()
        .rev()
        .position_max_by_key(|candidate| scorer.score(candidate, folder_name))
        .map(|reverse_index| &candidates[candidates.len() - 1 - reverse_index])
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn candidate(path: &str, size: u64, depth: usize) -> ExecutableCandidate {
        ExecutableCandidate {
            path: PathBuf::from(path),
            size,
            depth,
        }
    }

    #[test_case("SuperGame", "SuperGame", 3)]
    #[test_case("super_game", "Super Game", 3)]
    #[test_case("SuperGame-Win64-Shipping", "Super Game", 2)]
    #[test_case("Game", "Super Game", 2)]
    #[test_case("hollow_knight_v2", "Hollow Lands", 1)]
    #[test_case("launcher_helper", "SuperGame", 0)]
    #[test_case("", "SuperGame", 0)]
    fn test_name_match_tier(stem: &str, folder: &str, expected: u64) {
        assert_eq!(name_match_tier(stem, folder), expected);
    }

    #[test]
    fn test_prefers_matching_name_over_size() {
        let candidates = [
            candidate("SuperGame/launcher_helper.exe", 900_000_000, 1),
            candidate("SuperGame/SuperGame.exe", 1_000, 1),
        ];

        let chosen = choose_main_executable(&candidates, "SuperGame", &NameMatchScorer);
        assert_eq!(chosen, Some(&candidates[1]));
    }

    #[test]
    fn test_falls_back_to_largest() {
        let candidates = [
            candidate("Folder/tool.exe", 10, 1),
            candidate("Folder/bin/big.exe", 5_000, 2),
            candidate("Folder/small.exe", 20, 1),
        ];

        let chosen = choose_main_executable(&candidates, "Folder Name", &NameMatchScorer);
        assert_eq!(chosen, Some(&candidates[1]));
    }

    #[test]
    fn test_ties_keep_first_candidate() {
        let candidates = [
            candidate("Folder/a.exe", 10, 1),
            candidate("Folder/b.exe", 10, 1),
        ];

        let chosen = choose_main_executable(&candidates, "Folder", &NameMatchScorer);
        assert_eq!(chosen, Some(&candidates[0]));
        assert_eq!(choose_main_executable(&[], "Folder", &NameMatchScorer), None);
    }

    #[test]
    fn test_closure_strategy() {
        let candidates = [
            candidate("Folder/Folder.exe", 10, 1),
            candidate("Folder/zzz.exe", 10, 1),
        ];
        let prefer_z = |candidate: &ExecutableCandidate, _: &str| -> u64 {
            u64::from(candidate.stem().starts_with('z'))
        };

        let chosen = choose_main_executable(&candidates, "Folder", &prefer_z);
        assert_eq!(chosen, Some(&candidates[1]));
    }
}
