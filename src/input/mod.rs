//! Turns raw keyboard and controller events into navigation commands.
//!
//! Every key, button, hat direction and stick direction is tracked as its own held control, so
//! several sources can be active at once without interfering. Pressing a control emits its
//! command once. Directional commands then repeat while the control is held, after
//! [`RepeatPolicy::delay`] and every [`RepeatPolicy::interval`] from then on. Repeats are
//! scheduled from the time of the press rather than from when the machine is polled.

mod mapping;
mod repeat;

#[cfg(feature = "gamepad")]
pub mod gamepad;

use std::time::Instant;

pub use mapping::*;
pub use repeat::*;

use crate::config::ControllerConfig;

const COMPONENT: &str = "Input";

/// Action requested by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    Confirm,
    Back,
    OpenMenu,
    Rescan,
    ToggleFullscreen,
}

impl Command {
    /// Only movement repeats while held
    pub fn is_repeatable(self) -> bool {
        matches!(
            self,
            Self::MoveLeft | Self::MoveRight | Self::MoveUp | Self::MoveDown
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputSource {
    Keyboard,
    Controller,
}

/// Keyboard keys the launcher responds to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    W,
    A,
    S,
    D,
    Enter,
    Space,
    Escape,
    Backspace,
    Tab,
    O,
    R,
    F11,
}

/// Controller button as reported by the device layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonCode {
    /// Driver specific index, translated through the controller's profile
    Raw(u16),
    /// Already identified by the device layer
    Logical(LogicalButton),
}

/// Event read from a device
#[derive(Debug, Clone, PartialEq)]
pub enum RawInput {
    Key { key: Key, pressed: bool },
    Button { code: ButtonCode, pressed: bool },
    /// D-pad hat position, each axis in -1..=1 with negative `y` pointing up
    Hat { x: i8, y: i8 },
    /// Stick axis in -1.0..=1.0, with positive values pointing right or down
    Axis { index: u8, value: f32 },
    ControllerConnected(ControllerInfo),
    ControllerDisconnected,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerInfo {
    pub name: String,
    pub guid: String,
    pub button_count: usize,
}

/// Command produced by the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedCommand {
    pub command: Command,
    pub source: InputSource,
    /// When the press or repeat happened
    pub at: Instant,
    pub repeat: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputSettings {
    /// Stick deflection below which a stick counts as centred
    pub deadzone: f32,
    pub repeat: RepeatPolicy,
    pub layout: LayoutOverride,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self::from_config(&ControllerConfig::default())
    }
}

impl InputSettings {
    pub fn from_config(config: &ControllerConfig) -> Self {
        Self {
            deadzone: config.deadzone,
            repeat: RepeatPolicy::new(config.repeat_delay(), config.repeat_interval()),
            layout: config.button_mapping,
        }
    }
}

/// Held direction shown to the UI, e.g. to animate scrolling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingRepeat {
    pub command: Command,
    pub source: InputSource,
    pub held_since: Instant,
    pub last_repeat: Option<Instant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    fn command(self) -> Command {
        match self {
            Self::Up => Command::MoveUp,
            Self::Down => Command::MoveDown,
            Self::Left => Command::MoveLeft,
            Self::Right => Command::MoveRight,
        }
    }

    fn horizontal(value: f32) -> Self {
        if value < 0.0 { Self::Left } else { Self::Right }
    }

    fn vertical(value: f32) -> Self {
        if value < 0.0 { Self::Up } else { Self::Down }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Control {
    Key(Key),
    Button(LogicalButton),
    Hat(Direction),
    Stick(Direction),
}

impl Control {
    fn source(self) -> InputSource {
        match self {
            Self::Key(_) => InputSource::Keyboard,
            _ => InputSource::Controller,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Held {
    control: Control,
    command: Command,
    timer: RepeatTimer,
}

impl Held {
    fn timed(&self, at: Instant, repeat: bool) -> TimedCommand {
        TimedCommand {
            command: self.command,
            source: self.control.source(),
            at,
            repeat,
        }
    }
}

#[derive(Debug, Clone)]
struct ActiveController {
    info: ControllerInfo,
    profile: ControllerProfile,
}

/// Axis slots for hat and stick state, horizontal then vertical
const HORIZONTAL: usize = 0;
const VERTICAL: usize = 1;

#[derive(Debug)]
pub struct InputStateMachine {
    settings: InputSettings,
    commands: CommandMap,
    profiles: ProfileTable,
    controller: Option<ActiveController>,
    held: Vec<Held>,
    hat: [Option<Direction>; 2],
    stick: [Option<Direction>; 2],
    pending: Vec<TimedCommand>,
}

impl Default for InputStateMachine {
    fn default() -> Self {
        Self::new(InputSettings::default())
    }
}

impl InputStateMachine {
    pub fn new(settings: InputSettings) -> Self {
        Self {
            settings,
            commands: CommandMap::default(),
            profiles: ProfileTable::builtin(),
            controller: None,
            held: Vec::new(),
            hat: [None; 2],
            stick: [None; 2],
            pending: Vec::new(),
        }
    }

    pub fn from_config(config: &ControllerConfig) -> Self {
        Self::new(InputSettings::from_config(config))
    }

    pub fn with_profiles(mut self, profiles: ProfileTable) -> Self {
        self.profiles = profiles;
        self
    }

    pub fn with_command_map(mut self, commands: CommandMap) -> Self {
        self.commands = commands;
        self
    }

    pub fn settings(&self) -> &InputSettings {
        &self.settings
    }

    pub fn controller(&self) -> Option<&ControllerInfo> {
        self.controller.as_ref().map(|controller| &controller.info)
    }

    /// Profile selected for the connected controller
    pub fn controller_profile(&self) -> Option<&ControllerProfile> {
        self.controller.as_ref().map(|controller| &controller.profile)
    }

    pub fn is_controller_connected(&self) -> bool {
        self.controller.is_some()
    }

    /// Feeds one device event observed at `now`
    pub fn handle(&mut self, input: RawInput, now: Instant) {
        match input {
            RawInput::Key { key, pressed } => match self.commands.for_key(key) {
                Some(command) => self.set_control(Control::Key(key), command, pressed, now),
                None => tracing::trace!("{COMPONENT} - Unbound key {key:?}"),
            },
            RawInput::ControllerConnected(info) => self.connect(info),
            RawInput::ControllerDisconnected => self.disconnect(),
            input if self.controller.is_none() => {
                tracing::trace!("{COMPONENT} - Dropping {input:?} with no controller connected");
            }
            RawInput::Button { code, pressed } => self.handle_button(code, pressed, now),
            RawInput::Hat { x, y } => {
                let horizontal = (x != 0).then(|| Direction::horizontal(f32::from(x)));
                let vertical = (y != 0).then(|| Direction::vertical(f32::from(y)));

                self.update_direction(false, HORIZONTAL, horizontal, now);
                self.update_direction(false, VERTICAL, vertical, now);
            }
            RawInput::Axis { index, value } => self.handle_axis(index, value, now),
        }
    }

    /// Commands produced since the last poll, including repeats due by `now`
    ///
    /// Commands are ordered by time. Presses of the same command from different controls within
    /// one poll collapse into the earliest one.
    pub fn poll(&mut self, now: Instant) -> Vec<TimedCommand> {
        let mut commands = std::mem::take(&mut self.pending);

        for held in self.held.iter_mut() {
            if !held.command.is_repeatable() {
                continue;
            }
            for at in held.timer.due(now, &self.settings.repeat) {
                commands.push(held.timed(at, true));
            }
        }

        commands.sort_by_key(|command| command.at);

        let mut pressed: Vec<Command> = Vec::new();
        commands.retain(|command| {
            if command.repeat {
                return true;
            }
            if pressed.contains(&command.command) {
                return false;
            }
            pressed.push(command.command);
            true
        });

        commands
    }

    /// Handles a batch of events observed during one frame, then polls
    pub fn process(
        &mut self,
        inputs: impl IntoIterator<Item = RawInput>,
        now: Instant,
    ) -> Vec<TimedCommand> {
        for input in inputs {
            self.handle(input, now);
        }
        self.poll(now)
    }

    /// Forgets every held control and undispatched command
    ///
    /// Controls still physically held must be pressed again before they produce commands.
    pub fn reset(&mut self) {
        self.held.clear();
        self.pending.clear();
        self.hat = [None; 2];
        self.stick = [None; 2];
    }

    /// The most recently pressed direction still held
    pub fn pending_repeat(&self) -> Option<PendingRepeat> {
        self.held
            .iter()
            .rev()
            .find(|held| held.command.is_repeatable())
            .map(|held| PendingRepeat {
                command: held.command,
                source: held.control.source(),
                held_since: held.timer.pressed_at(),
                last_repeat: held.timer.last_repeat(&self.settings.repeat),
            })
    }

    fn connect(&mut self, info: ControllerInfo) {
        let profile = self.profiles.select(&info, self.settings.layout).clone();
        tracing::info!(
            "{COMPONENT} - Controller connected: {:?} using the {} profile",
            info.name,
            profile.name
        );

        self.clear_controller_state();
        self.controller = Some(ActiveController { info, profile });
    }

    fn disconnect(&mut self) {
        if let Some(controller) = self.controller.take() {
            tracing::info!(
                "{COMPONENT} - Controller disconnected: {:?}",
                controller.info.name
            );
        }
        self.clear_controller_state();
    }

    /// Forgets held controller controls and their undispatched commands
    fn clear_controller_state(&mut self) {
        self.held
            .retain(|held| held.control.source() == InputSource::Keyboard);
        self.pending
            .retain(|command| command.source == InputSource::Keyboard);
        self.hat = [None; 2];
        self.stick = [None; 2];
    }

    fn handle_button(&mut self, code: ButtonCode, pressed: bool, now: Instant) {
        let Some(controller) = &self.controller else {
            return;
        };

        let button = match code {
            ButtonCode::Logical(button) => Some(button),
            ButtonCode::Raw(raw) => {
                let button = controller.profile.button(raw);
                if button.is_none() {
                    tracing::debug!(
                        "{COMPONENT} - Unknown button {raw} on {:?} ({} profile)",
                        controller.info.name,
                        controller.profile.name
                    );
                }
                button
            }
        };

        let Some(button) = button else {
            return;
        };

        match self.commands.for_button(button) {
            Some(command) => self.set_control(Control::Button(button), command, pressed, now),
            None => tracing::trace!("{COMPONENT} - Unbound button {button:?}"),
        }
    }

    fn handle_axis(&mut self, index: u8, value: f32, now: Instant) {
        let Some(controller) = &self.controller else {
            return;
        };

        let axes = controller.profile.axes;
        let slot = if index == axes.x {
            HORIZONTAL
        } else if index == axes.y {
            VERTICAL
        } else {
            tracing::trace!("{COMPONENT} - Ignoring axis {index}");
            return;
        };

        let direction = (value.is_finite() && value.abs() >= self.settings.deadzone).then(|| {
            if slot == HORIZONTAL {
                Direction::horizontal(value)
            } else {
                Direction::vertical(value)
            }
        });

        self.update_direction(true, slot, direction, now);
    }

    /// Moves a hat or stick axis to a new direction, releasing the previous one
    fn update_direction(
        &mut self,
        stick: bool,
        slot: usize,
        direction: Option<Direction>,
        now: Instant,
    ) {
        let state = if stick {
            &mut self.stick[slot]
        } else {
            &mut self.hat[slot]
        };
        let previous = std::mem::replace(state, direction);

        if previous == direction {
            return;
        }

        let control = |direction| {
            if stick {
                Control::Stick(direction)
            } else {
                Control::Hat(direction)
            }
        };

        if let Some(previous) = previous {
            self.set_control(control(previous), previous.command(), false, now);
        }
        if let Some(direction) = direction {
            self.set_control(control(direction), direction.command(), true, now);
        }
    }

    fn set_control(&mut self, control: Control, command: Command, pressed: bool, now: Instant) {
        let existing = self.held.iter().position(|held| held.control == control);

        match (pressed, existing) {
            // Auto-repeated press events from the OS
            (true, Some(_)) => {}
            (true, None) => {
                let held = Held {
                    control,
                    command,
                    timer: RepeatTimer::new(now),
                };
                self.pending.push(held.timed(now, false));
                self.held.push(held);
            }
            (false, Some(index)) => {
                let mut held = self.held.remove(index);
                if held.command.is_repeatable() {
                    // Repeats which fell due before the release still count
                    for at in held.timer.due(now, &self.settings.repeat) {
                        self.pending.push(held.timed(at, true));
                    }
                }
            }
            (false, None) => {}
        }
    }
}
