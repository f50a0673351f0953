//! Plain text frontend and a line based keyboard for terminals.

use std::{
    io::{self, BufRead, Write},
    sync::mpsc::{self, Receiver, TryRecvError},
    thread,
};

use crate::{
    app::{Frontend, Mode, SettingsItem, View},
    input::{Key, RawInput},
};

const COMPONENT: &str = "Console";

/// Prints the current selection whenever it changes
#[derive(Debug)]
pub struct ConsoleFrontend<W: Write> {
    out: W,
    last_frame: String,
}

impl ConsoleFrontend<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleFrontend<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            last_frame: String::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{line}").and_then(|()| self.out.flush()) {
            tracing::debug!("{COMPONENT} - Could not write to the console: {e}");
        }
    }
}

/// One line describing what is on screen
fn describe(view: &View<'_>) -> String {
    match view.navigation.mode {
        Mode::Browsing => match view.selected() {
            Some(game) => format!(
                "[{}/{}] {} (played {} times)",
                view.navigation.selected_index + 1,
                view.games.len(),
                game.name,
                game.play_count
            ),
            None => "No games".to_string(),
        },
        Mode::Settings => {
            let selected = view.settings_item();
            let items: Vec<String> = SettingsItem::ALL
                .iter()
                .map(|item| {
                    let label = item.label(view.config);
                    if *item == selected {
                        format!("> {label} <")
                    } else {
                        label
                    }
                })
                .collect();
            format!("Settings: {}", items.join(" | "))
        }
        Mode::Launching => match view.selected() {
            Some(game) => format!("Playing {}", game.name),
            None => "Playing".to_string(),
        },
    }
}

impl<W: Write> Frontend for ConsoleFrontend<W> {
    fn render(&mut self, view: &View<'_>) {
        let frame = describe(view);
        if frame != self.last_frame {
            self.write_line(&frame);
            self.last_frame = frame;
        }
    }

    fn show_message(&mut self, message: &str) {
        self.write_line(&format!("* {message}"));
    }

    fn hide_window(&mut self) {
        tracing::trace!("{COMPONENT} - Window hidden");
    }

    fn restore_window(&mut self) {
        tracing::trace!("{COMPONENT} - Window restored");
        // Reprint the selection after the game's own output
        self.last_frame.clear();
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        tracing::trace!("{COMPONENT} - Fullscreen: {fullscreen}");
    }
}

/// Parses a word typed into the terminal as a key
pub fn parse_key(word: &str) -> Option<Key> {
    let key = match word.to_lowercase().as_str() {
        "up" => Key::Up,
        "down" => Key::Down,
        "left" => Key::Left,
        "right" => Key::Right,
        "w" => Key::W,
        "a" => Key::A,
        "s" => Key::S,
        "d" => Key::D,
        "enter" | "return" | "ok" => Key::Enter,
        "space" => Key::Space,
        "esc" | "escape" | "back" => Key::Escape,
        "backspace" => Key::Backspace,
        "tab" | "menu" => Key::Tab,
        "o" => Key::O,
        "r" | "rescan" => Key::R,
        "f11" | "fullscreen" => Key::F11,
        _ => return None,
    };

    Some(key)
}

/// Reads keys from lines of text on a background thread
///
/// Each recognised word is a press immediately followed by a release. The bridge is closed once
/// the input reaches its end.
#[derive(Debug)]
pub struct KeyboardBridge {
    keys: Receiver<Key>,
    closed: bool,
}

impl KeyboardBridge {
    /// Reads from standard input
    pub fn stdin() -> io::Result<Self> {
        Self::spawn(io::BufReader::new(io::stdin()))
    }

    pub fn spawn(reader: impl BufRead + Send + 'static) -> io::Result<Self> {
        let (sender, keys) = mpsc::channel();

        thread::Builder::new()
            .name("keyboard".into())
            .spawn(move || {
                for line in reader.lines() {
                    let line = match line {
                        Ok(line) => line,
                        Err(e) => {
                            tracing::warn!("{COMPONENT} - Could not read input: {e}");
                            break;
                        }
                    };

                    for word in line.split_whitespace() {
                        match parse_key(word) {
                            Some(key) => {
                                if sender.send(key).is_err() {
                                    return;
                                }
                            }
                            None => tracing::warn!("{COMPONENT} - Unknown key {word:?}"),
                        }
                    }
                }
            })?;

        Ok(Self {
            keys,
            closed: false,
        })
    }

    /// Events for the keys typed since the last call
    pub fn read(&mut self) -> Vec<RawInput> {
        let mut inputs = Vec::new();

        loop {
            match self.keys.try_recv() {
                Ok(key) => {
                    inputs.push(RawInput::Key { key, pressed: true });
                    inputs.push(RawInput::Key {
                        key,
                        pressed: false,
                    });
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.closed = true;
                    break;
                }
            }
        }

        inputs
    }

    /// True once the input has ended and every key has been read
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
