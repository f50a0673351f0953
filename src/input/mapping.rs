//! Data tables translating device buttons and keys into commands.
//!
//! Raw button indices differ between drivers and connection types, so they are looked up in a
//! per-controller profile chosen by the controller's reported name and GUID. Controllers which
//! match no profile use a generic layout.

use serde::{Deserialize, Serialize};

use super::{Command, ControllerInfo, Key};

/// Buttons by position, independent of what is printed on them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalButton {
    /// Cross / A
    South,
    /// Circle / B
    East,
    /// Square / X
    West,
    /// Triangle / Y
    North,
    /// Options / Start / Menu
    Start,
    /// Share / Back / View
    Select,
    Guide,
    LeftShoulder,
    RightShoulder,
    LeftStick,
    RightStick,
    DPadUp,
    DPadDown,
    DPadLeft,
    DPadRight,
}

/// Forces one of the PlayStation layouts instead of detecting it
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutOverride {
    #[default]
    Auto,
    Usb,
    Bluetooth,
}

/// Indices of the left stick axes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StickAxes {
    pub x: u8,
    pub y: u8,
}

impl Default for StickAxes {
    fn default() -> Self {
        Self { x: 0, y: 1 }
    }
}

/// How a controller is recognised as using a profile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detection {
    /// Lowercase substrings of the controller name or GUID
    pub signatures: Vec<String>,
    /// Lowercase names which must match in full, for names too generic to match as substrings
    pub exact_names: Vec<String>,
    /// Lowercase USB product ids preferring this profile over others with the same signature
    pub product_ids: Vec<String>,
    /// Button count preferring this profile over others with the same signature
    pub button_count: Option<usize>,
}

impl Detection {
    fn matches(&self, name: &str, guid: &str) -> bool {
        self.exact_names.iter().any(|exact| exact == name)
            || self.signatures.iter().any(|signature| {
                name.contains(signature.as_str()) || guid.contains(signature.as_str())
            })
    }

    fn hinted(&self, product_id: Option<&str>, button_count: usize) -> bool {
        product_id.is_some_and(|product_id| self.product_ids.iter().any(|id| id == product_id))
            || self.button_count == Some(button_count)
    }
}

/// USB product id from a lowercase SDL GUID or a `vendor:product` pair
fn product_id(guid: &str) -> Option<String> {
    let is_hex = |value: &str| value.chars().all(|c| c.is_ascii_hexdigit());

    if guid.len() == 32 && is_hex(guid) {
        // 16 bit little endian value at byte 8
        return Some(format!("{}{}", &guid[18..20], &guid[16..18]));
    }

    let (_, product) = guid.split_once(':')?;
    let product = product.get(..4)?;
    is_hex(product).then(|| product.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerProfile {
    pub name: String,
    pub detection: Detection,
    /// Layout this profile represents, for forced layouts
    pub layout: Option<LayoutOverride>,
    pub buttons: Vec<(u16, LogicalButton)>,
    pub axes: StickAxes,
}

impl ControllerProfile {
    pub fn button(&self, raw: u16) -> Option<LogicalButton> {
        self.buttons
            .iter()
            .find_map(|(index, button)| (*index == raw).then_some(*button))
    }
}

const PLAYSTATION_SIGNATURES: [&str; 13] = [
    "playstation",
    "ps4",
    "ps5",
    "dualshock",
    "dualsense",
    "sony interactive entertainment",
    "sony computer entertainment",
    "cuh-zct",
    "cfi-zct",
    "054c:05c4",
    "054c:09cc",
    "054c:0ce6",
    "4c050000",
];

/// Name reported by PlayStation controllers on some platforms
const PLAYSTATION_GENERIC_NAME: &str = "wireless controller";

const XBOX_SIGNATURES: [&str; 4] = ["xbox", "xinput", "x-box", "5e040000"];

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}

/// Profiles checked in order, plus the fallback used when none match
#[derive(Debug, Clone)]
pub struct ProfileTable {
    profiles: Vec<ControllerProfile>,
    fallback: ControllerProfile,
}

impl Default for ProfileTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProfileTable {
    pub fn new(profiles: Vec<ControllerProfile>, fallback: ControllerProfile) -> Self {
        Self { profiles, fallback }
    }

    /// PlayStation (USB and Bluetooth), Xbox and a generic fallback
    pub fn builtin() -> Self {
        use LogicalButton::*;

        let playstation_usb = ControllerProfile {
            name: "PlayStation (USB)".into(),
            detection: Detection {
                signatures: strings(&PLAYSTATION_SIGNATURES),
                exact_names: strings(&[PLAYSTATION_GENERIC_NAME]),
                ..Default::default()
            },
            layout: Some(LayoutOverride::Usb),
            buttons: vec![
                (0, South),
                (1, East),
                (2, West),
                (3, North),
                (4, LeftShoulder),
                (5, RightShoulder),
                (8, Select),
                (9, Start),
                (10, LeftStick),
                (11, RightStick),
                (12, Guide),
            ],
            axes: StickAxes::default(),
        };

        let playstation_bluetooth = ControllerProfile {
            name: "PlayStation (Bluetooth)".into(),
            detection: Detection {
                signatures: strings(&PLAYSTATION_SIGNATURES),
                exact_names: strings(&[PLAYSTATION_GENERIC_NAME]),
                product_ids: strings(&["09cc"]),
                button_count: Some(13),
            },
            layout: Some(LayoutOverride::Bluetooth),
            buttons: vec![
                (0, South),
                (1, East),
                (2, North),
                (3, West),
                (4, LeftShoulder),
                (5, RightShoulder),
                (8, Select),
                (9, Start),
                (10, Guide),
                (11, LeftStick),
                (12, RightStick),
            ],
            axes: StickAxes::default(),
        };

        let xbox = ControllerProfile {
            name: "Xbox".into(),
            detection: Detection {
                signatures: strings(&XBOX_SIGNATURES),
                ..Default::default()
            },
            layout: None,
            buttons: vec![
                (0, South),
                (1, East),
                (2, West),
                (3, North),
                (4, LeftShoulder),
                (5, RightShoulder),
                (6, Select),
                (7, Start),
                (8, LeftStick),
                (9, RightStick),
                (10, Guide),
            ],
            axes: StickAxes::default(),
        };

        let generic = ControllerProfile {
            name: "Generic".into(),
            detection: Detection::default(),
            layout: None,
            buttons: vec![
                (0, South),
                (1, East),
                (2, West),
                (3, North),
                (4, LeftShoulder),
                (5, RightShoulder),
                (8, Select),
                (9, Start),
            ],
            axes: StickAxes::default(),
        };

        Self::new(vec![playstation_usb, playstation_bluetooth, xbox], generic)
    }

    /// Picks the profile for a controller
    ///
    /// Among profiles whose signature matches, a forced layout wins first, then a profile whose
    /// hints (GUID marker, button count) match, then the first one listed.
    pub fn select(&self, info: &ControllerInfo, layout: LayoutOverride) -> &ControllerProfile {
        let name = info.name.to_lowercase();
        let guid = info.guid.to_lowercase();
        let product_id = product_id(&guid);

        let candidates: Vec<&ControllerProfile> = self
            .profiles
            .iter()
            .filter(|profile| profile.detection.matches(&name, &guid))
            .collect();

        let forced = (layout != LayoutOverride::Auto)
            .then(|| {
                candidates
                    .iter()
                    .find(|profile| profile.layout == Some(layout))
            })
            .flatten();

        forced
            .or_else(|| {
                candidates.iter().find(|profile| {
                    profile
                        .detection
                        .hinted(product_id.as_deref(), info.button_count)
                })
            })
            .or_else(|| {
                candidates.iter().find(|profile| {
                    profile.detection.product_ids.is_empty()
                        && profile.detection.button_count.is_none()
                })
            })
            .or(candidates.first())
            .copied()
            .unwrap_or(&self.fallback)
    }
}

/// Which command each key and logical button produces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMap {
    pub keys: Vec<(Key, Command)>,
    pub buttons: Vec<(LogicalButton, Command)>,
}

impl Default for CommandMap {
    fn default() -> Self {
        Self {
            keys: vec![
                (Key::Up, Command::MoveUp),
                (Key::W, Command::MoveUp),
                (Key::Down, Command::MoveDown),
                (Key::S, Command::MoveDown),
                (Key::Left, Command::MoveLeft),
                (Key::A, Command::MoveLeft),
                (Key::Right, Command::MoveRight),
                (Key::D, Command::MoveRight),
                (Key::Enter, Command::Confirm),
                (Key::Space, Command::Confirm),
                (Key::Escape, Command::Back),
                (Key::Backspace, Command::Back),
                (Key::Tab, Command::OpenMenu),
                (Key::O, Command::OpenMenu),
                (Key::R, Command::Rescan),
                (Key::F11, Command::ToggleFullscreen),
            ],
            buttons: vec![
                (LogicalButton::South, Command::Confirm),
                (LogicalButton::East, Command::Back),
                (LogicalButton::Start, Command::OpenMenu),
                (LogicalButton::North, Command::Rescan),
                (LogicalButton::DPadUp, Command::MoveUp),
                (LogicalButton::DPadDown, Command::MoveDown),
                (LogicalButton::DPadLeft, Command::MoveLeft),
                (LogicalButton::DPadRight, Command::MoveRight),
            ],
        }
    }
}

impl CommandMap {
    pub fn for_key(&self, key: Key) -> Option<Command> {
        self.keys
            .iter()
            .find_map(|(k, command)| (*k == key).then_some(*command))
    }

    pub fn for_button(&self, button: LogicalButton) -> Option<Command> {
        self.buttons
            .iter()
            .find_map(|(b, command)| (*b == button).then_some(*command))
    }
}
