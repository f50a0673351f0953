//! game-launcher: browse and launch games from local folders.
//!
//! # Usage
//!
//! ```bash
//! game-launcher --add-folder ~/Games
//! game-launcher --list-games
//! game-launcher --scan --fullscreen
//! ```
//!
//! Without `--list-games` or `--add-folder` the launcher runs interactively. Keys are typed as
//! words on standard input (`left`, `right`, `up`, `down`, `enter`, `esc`, `tab`, `r`, `f11`),
//! and controllers are read when built with the `gamepad` feature.

use std::{
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use clap::Parser;
use game_launcher::{
    app::{App, TickOutcome},
    config::{ConfigStore, LauncherPaths, parse_resolution},
    console::{ConsoleFrontend, KeyboardBridge},
    registry::Registry,
};
use is_terminal::IsTerminal;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Target time between frames
const FRAME: Duration = Duration::from_millis(16);

#[derive(Parser)]
#[command(name = "game-launcher")]
#[command(version, about = "Browse and launch games from local folders")]
struct Cli {
    /// Start in fullscreen mode (saved to the configuration)
    #[arg(long, short = 'f', conflicts_with = "windowed")]
    fullscreen: bool,

    /// Start in windowed mode (saved to the configuration)
    #[arg(long, short = 'w')]
    windowed: bool,

    /// Rescan every game folder instead of trusting the cache
    #[arg(long, short = 's')]
    scan: bool,

    /// Window size, e.g. 1280x720 (saved to the configuration)
    #[arg(long, value_name = "WxH", value_parser = resolution_arg)]
    resolution: Option<(u32, u32)>,

    /// Add a game folder to the configuration and exit
    #[arg(long, value_name = "PATH")]
    add_folder: Option<PathBuf>,

    /// Print the discovered games and exit
    #[arg(long)]
    list_games: bool,

    /// Configuration file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory for the game cache and play history
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Log debug messages, unless overridden by RUST_LOG
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn resolution_arg(value: &str) -> Result<(u32, u32), String> {
    parse_resolution(value).map_err(|_| "expected WIDTHxHEIGHT, e.g. 1920x1080".to_string())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .without_time()
                .with_line_number(true)
                .with_writer(std::io::stderr)
                // Don't output colours for logs not being printed to a terminal
                .with_ansi(std::io::stderr().is_terminal()),
        )
        .with(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let paths = LauncherPaths::resolve(cli.config.clone(), cli.data_dir.as_deref())?;

    let mut config = ConfigStore::load(paths.config.clone())?;

    if let Some(folder) = &cli.add_folder {
        let added = config
            .config_mut()
            .add_folder(folder)
            .with_context(|| format!("Could not add game folder {}", folder.display()))?;

        if added {
            config.save().context("Could not save the configuration")?;
            println!("Added game folder: {}", folder.display());
        } else {
            println!("Game folder already configured: {}", folder.display());
        }
        return Ok(());
    }

    if apply_window_args(&cli, &mut config) {
        config.save().context("Could not save the configuration")?;
    }

    let mut registry = Registry::open(config.config(), &paths);

    if cli.list_games {
        registry.rescan(cli.scan);
        list_games(&registry, &config);
        return Ok(());
    }

    run(config, registry, cli.scan)
}

/// Applies the window options given on the command line, returning whether anything changed
fn apply_window_args(cli: &Cli, config: &mut ConfigStore) -> bool {
    let window = &mut config.config_mut().window;
    let before = window.clone();

    if cli.fullscreen {
        window.fullscreen = true;
    }
    if cli.windowed {
        window.fullscreen = false;
    }
    if let Some((width, height)) = cli.resolution {
        window.width = width;
        window.height = height;
    }

    *window != before
}

fn list_games(registry: &Registry, config: &ConfigStore) {
    let games = registry.sorted_view(config.config().sorting);

    if games.is_empty() {
        println!("No games found.");
        return;
    }

    for (i, game) in games.iter().enumerate() {
        println!("{:3}. {}", i + 1, game.name);
        println!("     Path: {}", game.executable_path.display());
        println!("     Played: {} times", game.play_count);
    }
}

fn run(config: ConfigStore, registry: Registry, force_scan: bool) -> Result<()> {
    let mut frontend = ConsoleFrontend::stdout();
    let mut keyboard = KeyboardBridge::stdin().context("Could not read the keyboard")?;

    #[cfg(feature = "gamepad")]
    let mut gamepad = game_launcher::input::gamepad::GamepadReader::new()
        .inspect_err(|e| tracing::warn!("Gamepads unavailable: {e}"))
        .ok();
    #[cfg(not(feature = "gamepad"))]
    let gamepad: Option<()> = None;

    let mut app = App::new(config, registry);
    app.start(force_scan, &mut frontend);

    loop {
        let now = Instant::now();

        #[allow(unused_mut)]
        let mut inputs = keyboard.read();
        #[cfg(feature = "gamepad")]
        if let Some(gamepad) = gamepad.as_mut() {
            inputs.extend(gamepad.read());
        }

        if app.tick(now, inputs, &mut frontend) == TickOutcome::Exit {
            break;
        }

        // Nothing left to read input from, but a running game is still followed until it exits
        if keyboard.is_closed() && gamepad.is_none() && !app.is_launching() {
            tracing::info!("Input closed, exiting");
            break;
        }

        thread::sleep(FRAME.saturating_sub(now.elapsed()));
    }

    Ok(())
}
