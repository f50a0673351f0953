//! A controller-friendly game launcher library.
//!
//! # Description
//!
//! Games are discovered by scanning configured folders for `.exe` files and `.lnk` shortcuts.
//! Each sub-folder of a configured folder is treated as one game, and the executable most likely
//! to be the game itself is picked from everything inside it. Results are cached per folder and
//! only rescanned when the folder changes, while play counts are kept separately so that a
//! rescan never loses them.
//!
//! The launcher is driven by a gamepad or keyboard. Raw device events are turned into a small set
//! of navigation commands, with time based repeating for held directions, and a selected game is
//! run as a child process until it exits.
//!
//! # Usage
//!
//! ```rust,no_run
//! use game_launcher::{
//!     config::{ConfigStore, LauncherPaths},
//!     data::SortOrder,
//!     registry::Registry,
//! };
//!
//! let paths = LauncherPaths::from_system_dirs().unwrap();
//! let config = ConfigStore::load(paths.config.clone()).unwrap();
//!
//! let mut registry = Registry::open(config.config(), &paths);
//! registry.rescan(false);
//!
//! for game in &registry.sorted_view(SortOrder::PlayCount) {
//!     println!("{} ({} plays)", game.name, game.play_count);
//! }
//! ```
//!
//! # Features
//!
//! - `gamepad`: read controllers through [gilrs](https://crates.io/crates/gilrs). Requires
//!   `libudev` on Linux.

use cfg_if::cfg_if;

pub mod app;
pub mod cache;
pub mod config;
pub mod console;
pub mod data;
pub mod error;
pub mod input;
pub mod launch;
mod macros;
pub mod metadata;
mod parsers;
pub mod registry;
pub mod scanner;
mod utils;

cfg_if! {
    if #[cfg(target_os = "windows")] {
        /// Command prefix used to run executables when none is configured
        pub fn default_launch_wrapper() -> Vec<String> {
            Vec::new()
        }
    } else {
        /// Command prefix used to run executables when none is configured
        pub fn default_launch_wrapper() -> Vec<String> {
            vec!["wine".to_string()]
        }
    }
}
