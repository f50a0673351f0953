//! Controller events read through gilrs.

use gilrs::{Axis, Button, EventType, GamepadId, Gilrs};
use itertools::Itertools;

use super::{ButtonCode, ControllerInfo, LogicalButton, RawInput};
use crate::error::{LauncherError, LauncherResult};

const COMPONENT: &str = "Gamepad";

/// Reads the first connected gamepad and translates its events into [`RawInput`]
pub struct GamepadReader {
    gilrs: Gilrs,
    active: Option<GamepadId>,
    /// Connection events for pads found at start up, returned by the first read
    queued: Vec<RawInput>,
}

impl std::fmt::Debug for GamepadReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GamepadReader")
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl GamepadReader {
    pub fn new() -> LauncherResult<Self> {
        let gilrs = Gilrs::new().map_err(|e| {
            LauncherError::Other(format!("failed to initialise gamepad support: {e}"))
        })?;

        let mut reader = Self {
            gilrs,
            active: None,
            queued: Vec::new(),
        };

        let first = reader
            .gilrs
            .gamepads()
            .find(|(_, gamepad)| gamepad.is_connected())
            .map(|(id, _)| id);
        if let Some(id) = first {
            reader.active = Some(id);
            let info = reader.info(id);
            reader.queued.push(RawInput::ControllerConnected(info));
        }

        Ok(reader)
    }

    fn info(&self, id: GamepadId) -> ControllerInfo {
        let gamepad = self.gilrs.gamepad(id);

        ControllerInfo {
            name: gamepad.name().to_string(),
            guid: gamepad
                .uuid()
                .iter()
                .map(|byte| format!("{byte:02x}"))
                .join(""),
            // Not reported by gilrs
            button_count: 0,
        }
    }

    /// Drains pending gilrs events
    pub fn read(&mut self) -> Vec<RawInput> {
        let mut inputs = std::mem::take(&mut self.queued);

        while let Some(event) = self.gilrs.next_event() {
            match event.event {
                EventType::Connected => {
                    if self.active.is_none() {
                        self.active = Some(event.id);
                        inputs.push(RawInput::ControllerConnected(self.info(event.id)));
                    } else {
                        tracing::debug!("{COMPONENT} - Ignoring additional gamepad {}", event.id);
                    }
                }
                EventType::Disconnected if self.active == Some(event.id) => {
                    inputs.push(RawInput::ControllerDisconnected);

                    let connected = self
                        .gilrs
                        .gamepads()
                        .filter(|(_, gamepad)| gamepad.is_connected())
                        .map(|(id, _)| id);
                    self.active = replacement(connected, event.id);

                    if let Some(id) = self.active {
                        tracing::info!("{COMPONENT} - Switching to gamepad {id}");
                        inputs.push(RawInput::ControllerConnected(self.info(id)));
                    }
                }
                _ if self.active != Some(event.id) => {}
                EventType::ButtonPressed(button, code) => {
                    inputs.push(RawInput::Button {
                        code: button_code(button, code.into_u32()),
                        pressed: true,
                    });
                }
                EventType::ButtonReleased(button, code) => {
                    inputs.push(RawInput::Button {
                        code: button_code(button, code.into_u32()),
                        pressed: false,
                    });
                }
                EventType::AxisChanged(Axis::LeftStickX, value, _) => {
                    inputs.push(RawInput::Axis { index: 0, value });
                }
                // gilrs reports up as positive
                EventType::AxisChanged(Axis::LeftStickY, value, _) => {
                    inputs.push(RawInput::Axis {
                        index: 1,
                        value: -value,
                    });
                }
                _ => {}
            }
        }

        inputs
    }
}

/// First still connected pad to take over from one which went away
fn replacement<Id: PartialEq>(connected: impl IntoIterator<Item = Id>, gone: Id) -> Option<Id> {
    connected.into_iter().find(|id| *id != gone)
}

/// Buttons gilrs recognises are passed on as logical buttons, anything else by its raw code
fn button_code(button: Button, raw: u32) -> ButtonCode {
    let logical = match button {
        Button::South => LogicalButton::South,
        Button::East => LogicalButton::East,
        Button::West => LogicalButton::West,
        Button::North => LogicalButton::North,
        Button::Start => LogicalButton::Start,
        Button::Select => LogicalButton::Select,
        Button::Mode => LogicalButton::Guide,
        Button::LeftTrigger => LogicalButton::LeftShoulder,
        Button::RightTrigger => LogicalButton::RightShoulder,
        Button::LeftThumb => LogicalButton::LeftStick,
        Button::RightThumb => LogicalButton::RightStick,
        Button::DPadUp => LogicalButton::DPadUp,
        Button::DPadDown => LogicalButton::DPadDown,
        Button::DPadLeft => LogicalButton::DPadLeft,
        Button::DPadRight => LogicalButton::DPadRight,
        _ => return ButtonCode::Raw(u16::try_from(raw).unwrap_or(u16::MAX)),
    };

    ButtonCode::Logical(logical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_code() {
        assert_eq!(
            button_code(Button::Mode, 0),
            ButtonCode::Logical(LogicalButton::Guide)
        );
        assert_eq!(button_code(Button::Unknown, 0x130), ButtonCode::Raw(0x130));
        assert_eq!(button_code(Button::C, u32::MAX), ButtonCode::Raw(u16::MAX));
    }

    #[test]
    fn test_replacement_skips_the_disconnected_pad() {
        assert_eq!(replacement([3, 1, 2], 3), Some(1));
        assert_eq!(replacement([1], 3), Some(1));
        assert_eq!(replacement([3], 3), None);
        assert_eq!(replacement(Vec::<usize>::new(), 3), None);
    }
}
