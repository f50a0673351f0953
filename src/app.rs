//! Composition root: owns the configuration, registry, input and launcher, and turns commands
//! into navigation.
//!
//! The binary calls [`App::tick`] once per frame with the raw input read since the previous
//! frame. Everything runs on that one thread; rescans and metadata writes happen inside a tick,
//! so a [`Frontend`] never observes a half-updated registry.

use std::{fmt::Display, time::Instant};

use crate::{
    config::{Config, ConfigStore},
    data::GameRecord,
    input::{Command, InputStateMachine, PendingRepeat, RawInput},
    launch::LaunchSupervisor,
    registry::{Registry, SortedView},
};

const COMPONENT: &str = "App";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Browsing,
    Settings,
    Launching,
}

/// Entries of the settings menu, top to bottom
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsItem {
    GameFolders,
    ToggleFullscreen,
    SortOrder,
    Rescan,
    Back,
}

impl SettingsItem {
    pub const ALL: [SettingsItem; 5] = [
        SettingsItem::GameFolders,
        SettingsItem::ToggleFullscreen,
        SettingsItem::SortOrder,
        SettingsItem::Rescan,
        SettingsItem::Back,
    ];

    /// Text shown for the entry given the current configuration
    pub fn label(self, config: &Config) -> String {
        match self {
            Self::GameFolders => format!("Game Folders ({})", config.game_folders.len()),
            Self::ToggleFullscreen => format!(
                "Fullscreen: {}",
                if config.window.fullscreen { "On" } else { "Off" }
            ),
            Self::SortOrder => format!("Sort: {}", config.sorting),
            Self::Rescan => "Rescan Games".into(),
            Self::Back => "Back".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationState {
    /// Index into the current sorted view
    pub selected_index: usize,
    pub pending_repeat: Option<PendingRepeat>,
    pub mode: Mode,
    /// Index into [`SettingsItem::ALL`]
    pub settings_index: usize,
    /// Back was pressed once and a second press exits
    pub confirm_exit: bool,
}

/// Everything a frontend needs to draw one frame
#[derive(Debug)]
pub struct View<'a> {
    pub games: SortedView<'a>,
    /// Empty unless enabled in the configuration
    pub recently_played: Vec<&'a GameRecord>,
    pub navigation: &'a NavigationState,
    pub config: &'a Config,
}

impl<'a> View<'a> {
    pub fn selected(&self) -> Option<&'a GameRecord> {
        self.games.get(self.navigation.selected_index)
    }

    pub fn settings_item(&self) -> SettingsItem {
        SettingsItem::ALL[self.navigation.settings_index % SettingsItem::ALL.len()]
    }
}

/// Drawing and window management, implemented by whatever presents the launcher
pub trait Frontend {
    fn render(&mut self, view: &View<'_>);

    /// Transient, non-blocking notification
    fn show_message(&mut self, message: &str);

    /// Called when a game starts
    fn hide_window(&mut self);

    /// Called when a game exits
    fn restore_window(&mut self);

    fn set_fullscreen(&mut self, fullscreen: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Exit,
}

#[derive(Debug)]
pub struct App {
    config: ConfigStore,
    registry: Registry,
    input: InputStateMachine,
    launcher: LaunchSupervisor,
    navigation: NavigationState,
    /// Whether anything changed since the last render
    dirty: bool,
}

impl App {
    pub fn new(config: ConfigStore, registry: Registry) -> Self {
        let input = InputStateMachine::from_config(&config.config().controller);
        let launcher = LaunchSupervisor::from_config(&config.config().launch);

        Self {
            config,
            registry,
            input,
            launcher,
            navigation: NavigationState::default(),
            dirty: true,
        }
    }

    pub fn with_input(mut self, input: InputStateMachine) -> Self {
        self.input = input;
        self
    }

    pub fn with_launcher(mut self, launcher: LaunchSupervisor) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn config(&self) -> &Config {
        self.config.config()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn navigation(&self) -> &NavigationState {
        &self.navigation
    }

    pub fn view(&self) -> View<'_> {
        let config = self.config.config();
        let recently_played = if config.show_recently_played {
            self.registry.recently_played(config.max_recent_games)
        } else {
            Vec::new()
        };

        View {
            games: self.registry.sorted_view(config.sorting),
            recently_played,
            navigation: &self.navigation,
            config,
        }
    }

    /// Whether a launched game is still being waited on
    pub fn is_launching(&self) -> bool {
        self.navigation.mode == Mode::Launching
    }

    pub fn selected_game(&self) -> Option<&GameRecord> {
        self.registry
            .sorted_view(self.config().sorting)
            .get(self.navigation.selected_index)
    }

    /// Brings the registry up to date, applies the window configuration and draws the first
    /// frame
    pub fn start(&mut self, force_scan: bool, frontend: &mut dyn Frontend) {
        frontend.set_fullscreen(self.config().window.fullscreen);

        let summary = self.registry.rescan(force_scan);
        if summary.total == 0 {
            frontend.show_message("No games found. Add a folder with --add-folder PATH");
        }
        self.clamp_selection();

        frontend.render(&self.view());
        self.dirty = false;
    }

    /// Runs one frame: handles input, follows a running game and renders if needed
    pub fn tick(
        &mut self,
        now: Instant,
        inputs: impl IntoIterator<Item = RawInput>,
        frontend: &mut dyn Frontend,
    ) -> TickOutcome {
        let commands = self.input.process(inputs, now);

        if self.navigation.mode == Mode::Launching {
            if !commands.is_empty() {
                tracing::trace!(
                    "{COMPONENT} - Discarding {} commands while a game runs",
                    commands.len()
                );
            }
            self.follow_launch(frontend);
        } else {
            for command in commands {
                if self.dispatch(command.command, frontend) == TickOutcome::Exit {
                    return TickOutcome::Exit;
                }
                if self.navigation.mode == Mode::Launching {
                    break;
                }
            }
        }

        let pending_repeat = self.input.pending_repeat();
        if pending_repeat != self.navigation.pending_repeat {
            self.navigation.pending_repeat = pending_repeat;
            self.dirty = true;
        }

        if self.dirty {
            frontend.render(&self.view());
            self.dirty = false;
        }

        TickOutcome::Continue
    }

    fn dispatch(&mut self, command: Command, frontend: &mut dyn Frontend) -> TickOutcome {
        tracing::trace!("{COMPONENT} - {command:?} in {:?}", self.navigation.mode);
        self.dirty = true;

        match self.navigation.mode {
            Mode::Browsing => return self.browse(command, frontend),
            Mode::Settings => self.settings(command, frontend),
            Mode::Launching => {}
        }

        TickOutcome::Continue
    }

    fn browse(&mut self, command: Command, frontend: &mut dyn Frontend) -> TickOutcome {
        if self.navigation.confirm_exit {
            self.navigation.confirm_exit = false;
            if matches!(command, Command::Back | Command::Confirm) {
                tracing::info!("{COMPONENT} - Exiting");
                return TickOutcome::Exit;
            }
            frontend.show_message("Exit cancelled");
            return TickOutcome::Continue;
        }

        let row = self.config().ui.tiles_per_row.max(1) as isize;

        match command {
            Command::MoveLeft => self.move_selection(-1),
            Command::MoveRight => self.move_selection(1),
            Command::MoveUp => self.move_selection(-row),
            Command::MoveDown => self.move_selection(row),
            Command::Confirm => self.launch_selected(frontend),
            Command::Back => {
                self.navigation.confirm_exit = true;
                frontend.show_message("Press Back again to exit");
            }
            Command::OpenMenu => {
                self.navigation.mode = Mode::Settings;
                self.navigation.settings_index = 0;
            }
            Command::Rescan => self.rescan(frontend),
            Command::ToggleFullscreen => self.toggle_fullscreen(frontend),
        }

        TickOutcome::Continue
    }

    fn settings(&mut self, command: Command, frontend: &mut dyn Frontend) {
        let count = SettingsItem::ALL.len();
        let index = self.navigation.settings_index % count;

        match command {
            Command::MoveUp => self.navigation.settings_index = (index + count - 1) % count,
            Command::MoveDown => self.navigation.settings_index = (index + 1) % count,
            Command::MoveLeft | Command::MoveRight => {}
            Command::Confirm => self.activate(SettingsItem::ALL[index], frontend),
            Command::Back | Command::OpenMenu => self.navigation.mode = Mode::Browsing,
            Command::Rescan => self.rescan(frontend),
            Command::ToggleFullscreen => self.toggle_fullscreen(frontend),
        }
    }

    fn activate(&mut self, item: SettingsItem, frontend: &mut dyn Frontend) {
        match item {
            SettingsItem::GameFolders => {
                let folders = &self.config().game_folders;
                let message = if folders.is_empty() {
                    "No game folders configured. Add one with --add-folder PATH".to_string()
                } else {
                    let folders: Vec<String> = folders
                        .iter()
                        .map(|folder| folder.display().to_string())
                        .collect();
                    format!("Game folders: {}", folders.join(", "))
                };
                frontend.show_message(&message);
            }
            SettingsItem::ToggleFullscreen => self.toggle_fullscreen(frontend),
            SettingsItem::SortOrder => {
                let selected = self.selected_game().map(|record| record.id.clone());

                let config = self.config.config_mut();
                config.sorting = config.sorting.next();
                let sorting = config.sorting;
                self.save_config(frontend);

                self.reselect(selected.as_deref());
                frontend.show_message(&format!("Sorting: {sorting}"));
            }
            SettingsItem::Rescan => self.rescan(frontend),
            SettingsItem::Back => self.navigation.mode = Mode::Browsing,
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let count = self.registry.len();
        if count == 0 {
            self.navigation.selected_index = 0;
            return;
        }

        let target = self.navigation.selected_index as isize + delta;
        self.navigation.selected_index = target.clamp(0, count as isize - 1) as usize;
    }

    fn clamp_selection(&mut self) {
        let last = self.registry.len().saturating_sub(1);
        self.navigation.selected_index = self.navigation.selected_index.min(last);
    }

    /// Selects the game with the given id in the current order, or keeps the index in range
    fn reselect(&mut self, id: Option<&str>) {
        let position = id.and_then(|id| {
            self.registry
                .sorted_view(self.config().sorting)
                .position(id)
        });

        match position {
            Some(position) => self.navigation.selected_index = position,
            None => self.clamp_selection(),
        }
    }

    fn launch_selected(&mut self, frontend: &mut dyn Frontend) {
        let Some(record) = self.selected_game().cloned() else {
            frontend.show_message("No game selected");
            return;
        };

        match self.launcher.launch(&record) {
            Ok(()) => {
                self.navigation.mode = Mode::Launching;
                self.input.reset();
                frontend.show_message(&format!("Launching {}", record.name));
                frontend.hide_window();
            }
            Err(e) => {
                self.navigation.mode = Mode::Browsing;
                frontend.show_message(&format!("Could not launch {}: {e}", record.name));
            }
        }
    }

    fn follow_launch(&mut self, frontend: &mut dyn Frontend) {
        self.launcher.poll();
        let Some(outcome) = self.launcher.finish() else {
            return;
        };

        if let Err(e) = self.registry.record_launch(&outcome.id) {
            tracing::warn!("{COMPONENT} - Could not record launch of {}: {e}", outcome.id);
        }

        // Controls held when the game exits should not start repeating
        self.input.reset();
        frontend.restore_window();
        self.navigation.mode = Mode::Browsing;
        self.reselect(Some(&outcome.id));
        self.dirty = true;
    }

    fn rescan(&mut self, frontend: &mut dyn Frontend) {
        let selected = self.selected_game().map(|record| record.id.clone());
        let summary = self.registry.rescan(true);

        self.reselect(selected.as_deref());
        frontend.show_message(&found_message(summary.total));
    }

    fn toggle_fullscreen(&mut self, frontend: &mut dyn Frontend) {
        let window = &mut self.config.config_mut().window;
        window.fullscreen = !window.fullscreen;
        let fullscreen = window.fullscreen;

        frontend.set_fullscreen(fullscreen);
        self.save_config(frontend);
    }

    fn save_config(&mut self, frontend: &mut dyn Frontend) {
        if let Err(e) = self.config.save() {
            tracing::warn!("{COMPONENT} - Could not save settings: {e}");
            frontend.show_message("Could not save settings");
        }
    }
}

fn found_message(total: impl Display) -> String {
    format!("Found {total} games")
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        path::{Path, PathBuf},
        thread,
        time::Duration,
    };

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;
    use test_case::test_case;

    use super::*;
    use crate::{
        cache::CacheStore,
        data::SortOrder,
        input::Key,
        metadata::MetadataStore,
        scanner::{Scanner, test_utils::create_file},
    };

    #[derive(Debug, Default)]
    struct RecordingFrontend {
        messages: Vec<String>,
        renders: usize,
        hidden: bool,
        fullscreen: Option<bool>,
        last_selected: Option<String>,
    }

    impl Frontend for RecordingFrontend {
        fn render(&mut self, view: &View<'_>) {
            self.renders += 1;
            self.last_selected = view.selected().map(|record| record.name.clone());
        }

        fn show_message(&mut self, message: &str) {
            self.messages.push(message.to_string());
        }

        fn hide_window(&mut self) {
            self.hidden = true;
        }

        fn restore_window(&mut self) {
            self.hidden = false;
        }

        fn set_fullscreen(&mut self, fullscreen: bool) {
            self.fullscreen = Some(fullscreen);
        }
    }

    struct Fixture {
        dir: TempDir,
        app: App,
        frontend: RecordingFrontend,
        now: Instant,
    }

    impl Fixture {
        /// Games named Alpha, Bravo, Charlie, Delta and Echo, two tiles per row
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let games = dir.path().join("games");
            for name in ["Alpha", "Bravo", "Charlie", "Delta", "Echo"] {
                write_game(&games.join(name).join(format!("{name}.exe")));
            }

            let mut config = Config::default();
            config.game_folders = vec![games.clone()];
            config.ui.tiles_per_row = 2;
            let config = ConfigStore::new(dir.path().join("config.json"), config);

            let registry = Registry::new(
                vec![games],
                Scanner::new(),
                CacheStore::new(dir.path().join("cache.json")),
                MetadataStore::open(dir.path().join("history.json")),
            );

            let mut frontend = RecordingFrontend::default();
            let mut app =
                App::new(config, registry).with_launcher(LaunchSupervisor::new(vec!["sh".into()]));
            app.start(false, &mut frontend);

            Self {
                dir,
                app,
                frontend,
                now: Instant::now(),
            }
        }

        fn games_dir(&self) -> PathBuf {
            self.dir.path().join("games")
        }

        /// Presses and releases a key within one frame
        fn tap(&mut self, key: Key) -> TickOutcome {
            self.now += Duration::from_millis(16);
            self.app.tick(
                self.now,
                [
                    RawInput::Key { key, pressed: true },
                    RawInput::Key {
                        key,
                        pressed: false,
                    },
                ],
                &mut self.frontend,
            )
        }

        fn idle(&mut self) -> TickOutcome {
            self.now += Duration::from_millis(16);
            self.app.tick(self.now, [], &mut self.frontend)
        }

        fn selected(&self) -> Option<String> {
            self.app.selected_game().map(|record| record.name.clone())
        }
    }

    fn write_game(path: &Path) {
        create_file(path, 0);
        fs::write(path, "exit 0\n").unwrap();
    }

    #[test_case(&[Key::Right; 10], 4; "right stops at the end")]
    #[test_case(&[Key::Left], 0; "left stops at the start")]
    #[test_case(&[Key::Down], 2; "down moves a row")]
    #[test_case(&[Key::Down, Key::Down, Key::Down], 4; "down clamps")]
    #[test_case(&[Key::Right, Key::Right, Key::Right, Key::Up], 1; "up moves a row")]
    #[test_case(&[Key::Right, Key::Up], 0; "up clamps")]
    fn test_grid_navigation(keys: &[Key], expected: usize) {
        let mut fixture = Fixture::new();

        for key in keys {
            fixture.tap(*key);
        }

        assert_eq!(fixture.app.navigation().selected_index, expected);
        assert_eq!(fixture.app.navigation().mode, Mode::Browsing);
    }

    #[test]
    fn test_render_follows_selection() {
        let mut fixture = Fixture::new();

        fixture.tap(Key::Right);
        assert_eq!(fixture.frontend.last_selected.as_deref(), Some("Bravo"));

        let renders = fixture.frontend.renders;
        fixture.idle();
        assert_eq!(fixture.frontend.renders, renders);
    }

    #[test]
    fn test_launch_failure_returns_to_browsing() {
        let mut fixture = Fixture::new();
        fixture.tap(Key::Right);
        fs::remove_file(fixture.games_dir().join("Bravo/Bravo.exe")).unwrap();

        assert_eq!(fixture.tap(Key::Enter), TickOutcome::Continue);

        assert_eq!(fixture.app.navigation().mode, Mode::Browsing);
        assert!(!fixture.frontend.hidden);
        let message = fixture.frontend.messages.last().unwrap();
        assert!(message.starts_with("Could not launch Bravo"), "{message}");

        // Still responsive
        fixture.tap(Key::Right);
        assert_eq!(fixture.selected().as_deref(), Some("Charlie"));
    }

    #[cfg(unix)]
    #[test]
    fn test_launch_and_return() {
        let mut fixture = Fixture::new();

        fixture.tap(Key::Enter);
        assert_eq!(fixture.app.navigation().mode, Mode::Launching);
        assert!(fixture.app.is_launching());
        assert!(fixture.frontend.hidden);

        // Input while the game runs is discarded
        fixture.tap(Key::Right);

        for _ in 0..500 {
            if fixture.app.navigation().mode != Mode::Launching {
                break;
            }
            thread::sleep(Duration::from_millis(10));
            fixture.idle();
        }

        assert_eq!(fixture.app.navigation().mode, Mode::Browsing);
        assert!(!fixture.app.is_launching());
        assert!(!fixture.frontend.hidden);
        assert_eq!(fixture.selected().as_deref(), Some("Alpha"));

        let alpha = fixture.app.selected_game().unwrap();
        assert_eq!(alpha.play_count, 1);
        assert!(alpha.last_played.is_some());

        // Persisted straight away
        let history = MetadataStore::open(fixture.dir.path().join("history.json"));
        assert_eq!(history.get(&alpha.id).map(|meta| meta.play_count), Some(1));
    }

    #[test_case(&[Key::Escape, Key::Escape], TickOutcome::Exit; "back twice")]
    #[test_case(&[Key::Escape, Key::Enter], TickOutcome::Exit; "back then confirm")]
    #[test_case(&[Key::Escape, Key::Right, Key::Escape], TickOutcome::Continue; "move cancels")]
    fn test_exit_confirmation(keys: &[Key], expected: TickOutcome) {
        let mut fixture = Fixture::new();

        let outcome = keys
            .iter()
            .map(|key| fixture.tap(*key))
            .last()
            .unwrap();

        assert_eq!(outcome, expected);
    }

    #[test]
    fn test_cancelled_exit_does_not_move() {
        let mut fixture = Fixture::new();

        fixture.tap(Key::Escape);
        fixture.tap(Key::Right);

        assert_eq!(fixture.app.navigation().selected_index, 0);
        assert!(!fixture.app.navigation().confirm_exit);
        assert_eq!(fixture.frontend.messages.last().unwrap(), "Exit cancelled");
    }

    #[test]
    fn test_settings_menu_wraps_and_closes() {
        let mut fixture = Fixture::new();

        fixture.tap(Key::Tab);
        assert_eq!(fixture.app.navigation().mode, Mode::Settings);

        fixture.tap(Key::Up);
        assert_eq!(
            fixture.app.view().settings_item(),
            SettingsItem::Back
        );
        fixture.tap(Key::Down);
        assert_eq!(fixture.app.navigation().settings_index, 0);

        // Grid selection is untouched by menu navigation
        assert_eq!(fixture.app.navigation().selected_index, 0);

        fixture.tap(Key::Up);
        fixture.tap(Key::Enter);
        assert_eq!(fixture.app.navigation().mode, Mode::Browsing);

        fixture.tap(Key::Tab);
        fixture.tap(Key::Escape);
        assert_eq!(fixture.app.navigation().mode, Mode::Browsing);
        assert!(!fixture.app.navigation().confirm_exit);
    }

    #[test]
    fn test_cycle_sort_order_is_persisted() {
        let mut fixture = Fixture::new();
        fixture.tap(Key::Right);

        fixture.tap(Key::Tab);
        fixture.tap(Key::Down);
        fixture.tap(Key::Down);
        fixture.tap(Key::Enter);

        assert_eq!(fixture.app.config().sorting, SortOrder::Recent);
        assert_eq!(fixture.selected().as_deref(), Some("Bravo"));

        let saved = ConfigStore::load(fixture.dir.path().join("config.json")).unwrap();
        assert_eq!(saved.config().sorting, SortOrder::Recent);
    }

    #[test]
    fn test_toggle_fullscreen_is_persisted() {
        let mut fixture = Fixture::new();
        assert_eq!(fixture.frontend.fullscreen, Some(false));

        fixture.tap(Key::F11);

        assert_eq!(fixture.frontend.fullscreen, Some(true));
        let saved = ConfigStore::load(fixture.dir.path().join("config.json")).unwrap();
        assert!(saved.config().window.fullscreen);
    }

    #[test]
    fn test_rescan_finds_new_games() {
        let mut fixture = Fixture::new();
        fixture.tap(Key::Right);
        write_game(&fixture.games_dir().join("Aardvark/Aardvark.exe"));

        fixture.tap(Key::R);

        assert_eq!(fixture.frontend.messages.last().unwrap(), "Found 6 games");
        assert_eq!(fixture.app.registry().len(), 6);
        assert_eq!(fixture.selected().as_deref(), Some("Bravo"));
    }

    #[test]
    fn test_no_games() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigStore::new(dir.path().join("config.json"), Config::default());
        let registry = Registry::new(
            Vec::new(),
            Scanner::new(),
            CacheStore::new(dir.path().join("cache.json")),
            MetadataStore::open(dir.path().join("history.json")),
        );
        let mut frontend = RecordingFrontend::default();
        let mut app = App::new(config, registry);
        app.start(false, &mut frontend);

        let now = Instant::now();
        for key in [Key::Right, Key::Down, Key::Enter] {
            app.tick(now, [RawInput::Key { key, pressed: true }], &mut frontend);
            app.tick(now, [RawInput::Key { key, pressed: false }], &mut frontend);
        }

        assert_eq!(app.navigation().selected_index, 0);
        assert_eq!(app.navigation().mode, Mode::Browsing);
        assert_eq!(frontend.messages.last().unwrap(), "No game selected");
    }
}
