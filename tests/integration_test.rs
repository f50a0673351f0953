mod common;

use std::{fs, thread, time::Duration};

use common::Library;
use game_launcher::{data::SortOrder, error::LauncherError};
use pretty_assertions::assert_eq;

fn names(registry: &game_launcher::registry::Registry, order: SortOrder) -> Vec<String> {
    registry
        .sorted_view(order)
        .iter()
        .map(|game| game.name.clone())
        .collect()
}

#[test]
fn test_denylisted_executables_are_ignored() {
    let library = Library::new();
    library.add_file("games/Game/Game.exe", 100);
    library.add_file("games/Game/unins000.exe", 10_000);
    library.add_file("games/Game/vc_redist.x64.exe", 10_000);
    library.add_file("loose/Game.exe", 100);
    library.add_file("loose/unins000.exe", 100);
    library.add_file("loose/vc_redist.x64.exe", 100);

    let mut registry = library.registry(&["games", "loose"]);
    registry.rescan(true);

    let executables: Vec<_> = registry
        .records()
        .iter()
        .map(|game| game.executable_path.clone())
        .collect();
    assert_eq!(
        executables,
        vec![
            library.games().join("Game/Game.exe"),
            library.dir.path().join("loose/Game.exe"),
        ]
    );
}

#[test]
fn test_main_executable_matches_folder_name() {
    let library = Library::new();
    library.add_file("games/SuperGame/SuperGame.exe", 100);
    library.add_file("games/SuperGame/launcher_helper.exe", 50_000);

    let mut registry = library.registry(&["games"]);
    registry.rescan(true);

    assert_eq!(registry.len(), 1);
    assert_eq!(
        registry.records()[0].executable_path,
        library.games().join("SuperGame/SuperGame.exe")
    );
    assert_eq!(registry.records()[0].name, "SuperGame");
}

#[test]
fn test_forced_rescan_is_idempotent() {
    let library = Library::new();
    library.add_file("games/Hollow Knight/hollow_knight.exe", 100);
    library.add_file("games/space_shooter_v1.2_x64.exe", 100);

    let mut registry = library.registry(&["games"]);
    registry.rescan(true);
    let first = registry.records().to_vec();
    registry.rescan(true);

    assert_eq!(registry.records(), first.as_slice());
    assert_eq!(names(&registry, SortOrder::Alphabetical), ["Hollow Knight", "Space Shooter"]);
}

#[test]
fn test_play_history_survives_rescans_and_restarts() {
    let library = Library::new();
    library.add_file("games/Zeta/Zeta.exe", 100);
    library.add_file("games/Alpha/Alpha.exe", 100);

    let mut registry = library.registry(&["games"]);
    registry.rescan(true);
    let zeta = registry.records()[1].id.clone();
    for _ in 0..5 {
        registry.record_launch(&zeta).unwrap();
    }

    registry.rescan(true);
    assert_eq!(registry.get(&zeta).unwrap().play_count, 5);

    // A new process reads the cache and history back
    let mut registry = library.registry(&["games"]);
    assert_eq!(registry.get(&zeta).unwrap().play_count, 5);
    registry.rescan(false);
    assert_eq!(registry.get(&zeta).unwrap().play_count, 5);
    assert!(registry.get(&zeta).unwrap().last_played.is_some());
}

#[test]
fn test_history_of_removed_games_is_dropped() {
    let library = Library::new();
    let exe = library.add_file("games/Gone.exe", 100);

    let mut registry = library.registry(&["games"]);
    registry.rescan(true);
    let id = registry.records()[0].id.clone();
    registry.record_launch(&id).unwrap();

    fs::remove_file(&exe).unwrap();
    registry.rescan(true);
    assert!(registry.is_empty());

    library.add_file("games/Gone.exe", 100);
    registry.rescan(true);
    assert_eq!(registry.get(&id).unwrap().play_count, 0);
}

#[test]
fn test_unchanged_folders_reuse_the_cache() {
    let library = Library::new();
    library.add_file("games/Alpha/Alpha.exe", 100);
    library.add_file("more/Bravo/Bravo.exe", 100);

    let mut registry = library.registry(&["games", "more"]);
    registry.rescan(false);

    let mut registry = library.registry(&["games", "more"]);
    assert_eq!(registry.len(), 2);

    // Give the new folder a distinct modification time
    thread::sleep(Duration::from_millis(20));
    library.add_file("more/Charlie/Charlie.exe", 100);

    let summary = registry.rescan(false);
    assert_eq!(summary.reused_folders, 1);
    assert_eq!(summary.rescanned_folders, 1);
    assert_eq!(summary.total, 3);
}

#[test]
fn test_corrupt_cache_triggers_full_rescan() {
    let library = Library::new();
    library.add_file("games/Alpha/Alpha.exe", 100);
    library.add_file("data/games_cache.json", 0);
    fs::write(library.data_dir().join("games_cache.json"), "{ \"records\": [ {").unwrap();

    let mut registry = library.registry(&["games"]);
    assert!(registry.is_empty());

    let summary = registry.rescan(false);
    assert_eq!(summary.rescanned_folders, 1);
    assert_eq!(names(&registry, SortOrder::Alphabetical), ["Alpha"]);

    // Rewritten in a readable form
    let registry = library.registry(&["games"]);
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_missing_folders_are_skipped_with_a_warning() {
    let library = Library::new();
    library.add_file("games/Alpha/Alpha.exe", 100);

    let mut registry = library.registry(&["missing", "games"]);
    let summary = registry.rescan(false);

    assert_eq!(summary.skipped_folders, 1);
    assert_eq!(summary.total, 1);
    assert!(matches!(
        registry.warnings(),
        [LauncherError::FolderUnavailable { .. }]
    ));
}

#[test]
fn test_sort_orders() {
    let library = Library::new();
    library.add_file("second/Zeta/Zeta.exe", 100);
    library.add_file("first/Alpha/Alpha.exe", 100);
    library.add_file("first/Mid/Mid.exe", 100);

    let mut registry = library.registry(&["second", "first"]);
    registry.rescan(true);
    let id = |name: &str| {
        registry
            .records()
            .iter()
            .find(|game| game.name == name)
            .unwrap()
            .id
            .clone()
    };
    let (alpha, zeta) = (id("Alpha"), id("Zeta"));

    for _ in 0..9 {
        registry.record_launch(&alpha).unwrap();
    }
    thread::sleep(Duration::from_millis(5));
    registry.record_launch(&zeta).unwrap();

    assert_eq!(names(&registry, SortOrder::Alphabetical), ["Alpha", "Mid", "Zeta"]);
    assert_eq!(names(&registry, SortOrder::PlayCount), ["Alpha", "Zeta", "Mid"]);
    assert_eq!(names(&registry, SortOrder::Recent), ["Zeta", "Alpha", "Mid"]);
    assert_eq!(names(&registry, SortOrder::Folder), ["Zeta", "Alpha", "Mid"]);

    let recent: Vec<_> = registry
        .recently_played(1)
        .into_iter()
        .map(|game| game.name.clone())
        .collect();
    assert_eq!(recent, ["Zeta"]);
}
