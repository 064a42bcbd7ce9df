use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const SHIFT   = 0b0001;
        const CONTROL = 0b0010;
        const ALT     = 0b0100;
        const META    = 0b1000;
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<&str> = Vec::new();
        if self.contains(Modifiers::CONTROL) {
            parts.push("Ctrl");
        }
        if self.contains(Modifiers::ALT) {
            parts.push("Alt");
        }
        if self.contains(Modifiers::SHIFT) {
            parts.push("Shift");
        }
        if self.contains(Modifiers::META) {
            parts.push("Cmd");
        }
        write!(f, "{}", parts.join(" + "))
    }
}

fn modifier_from_token(token: &str) -> Option<Modifiers> {
    match token.to_lowercase().as_str() {
        "alt" | "option" | "opt" => Some(Modifiers::ALT),
        "ctrl" | "control" => Some(Modifiers::CONTROL),
        "shift" => Some(Modifiers::SHIFT),
        "cmd" | "command" | "meta" | "super" => Some(Modifiers::META),
        _ => None,
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum KeyCode {
    KeyA,
    KeyB,
    KeyC,
    KeyD,
    KeyE,
    KeyF,
    KeyG,
    KeyH,
    KeyI,
    KeyJ,
    KeyK,
    KeyL,
    KeyM,
    KeyN,
    KeyO,
    KeyP,
    KeyQ,
    KeyR,
    KeyS,
    KeyT,
    KeyU,
    KeyV,
    KeyW,
    KeyX,
    KeyY,
    KeyZ,
    Digit0,
    Digit1,
    Digit2,
    Digit3,
    Digit4,
    Digit5,
    Digit6,
    Digit7,
    Digit8,
    Digit9,
    Backquote,
    Minus,
    Equal,
    Comma,
    Period,
    Slash,
    Tab,
    Space,
    Enter,
    NumpadEnter,
    Escape,
    Backspace,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    PageUp,
    PageDown,
    Home,
    End,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    ShiftLeft,
    ShiftRight,
    ControlLeft,
    ControlRight,
    AltLeft,
    AltRight,
    MetaLeft,
    MetaRight,
    CapsLock,
    Fn,
}

/// (name, key) pairs; the first name for a key is the canonical display form.
const KEY_NAMES: &[(&str, KeyCode)] = &[
    ("A", KeyCode::KeyA),
    ("B", KeyCode::KeyB),
    ("C", KeyCode::KeyC),
    ("D", KeyCode::KeyD),
    ("E", KeyCode::KeyE),
    ("F", KeyCode::KeyF),
    ("G", KeyCode::KeyG),
    ("H", KeyCode::KeyH),
    ("I", KeyCode::KeyI),
    ("J", KeyCode::KeyJ),
    ("K", KeyCode::KeyK),
    ("L", KeyCode::KeyL),
    ("M", KeyCode::KeyM),
    ("N", KeyCode::KeyN),
    ("O", KeyCode::KeyO),
    ("P", KeyCode::KeyP),
    ("Q", KeyCode::KeyQ),
    ("R", KeyCode::KeyR),
    ("S", KeyCode::KeyS),
    ("T", KeyCode::KeyT),
    ("U", KeyCode::KeyU),
    ("V", KeyCode::KeyV),
    ("W", KeyCode::KeyW),
    ("X", KeyCode::KeyX),
    ("Y", KeyCode::KeyY),
    ("Z", KeyCode::KeyZ),
    ("0", KeyCode::Digit0),
    ("1", KeyCode::Digit1),
    ("2", KeyCode::Digit2),
    ("3", KeyCode::Digit3),
    ("4", KeyCode::Digit4),
    ("5", KeyCode::Digit5),
    ("6", KeyCode::Digit6),
    ("7", KeyCode::Digit7),
    ("8", KeyCode::Digit8),
    ("9", KeyCode::Digit9),
    ("`", KeyCode::Backquote),
    ("Backquote", KeyCode::Backquote),
    ("Grave", KeyCode::Backquote),
    ("-", KeyCode::Minus),
    ("Minus", KeyCode::Minus),
    ("=", KeyCode::Equal),
    ("Equal", KeyCode::Equal),
    (",", KeyCode::Comma),
    ("Comma", KeyCode::Comma),
    (".", KeyCode::Period),
    ("Period", KeyCode::Period),
    ("/", KeyCode::Slash),
    ("Slash", KeyCode::Slash),
    ("Tab", KeyCode::Tab),
    ("Space", KeyCode::Space),
    ("Enter", KeyCode::Enter),
    ("Return", KeyCode::Enter),
    ("Escape", KeyCode::Escape),
    ("Esc", KeyCode::Escape),
    ("Backspace", KeyCode::Backspace),
    ("Left", KeyCode::ArrowLeft),
    ("ArrowLeft", KeyCode::ArrowLeft),
    ("Right", KeyCode::ArrowRight),
    ("ArrowRight", KeyCode::ArrowRight),
    ("Up", KeyCode::ArrowUp),
    ("ArrowUp", KeyCode::ArrowUp),
    ("Down", KeyCode::ArrowDown),
    ("ArrowDown", KeyCode::ArrowDown),
    ("PageUp", KeyCode::PageUp),
    ("PageDown", KeyCode::PageDown),
    ("Home", KeyCode::Home),
    ("End", KeyCode::End),
    ("F1", KeyCode::F1),
    ("F2", KeyCode::F2),
    ("F3", KeyCode::F3),
    ("F4", KeyCode::F4),
    ("F5", KeyCode::F5),
    ("F6", KeyCode::F6),
    ("F7", KeyCode::F7),
    ("F8", KeyCode::F8),
    ("F9", KeyCode::F9),
    ("F10", KeyCode::F10),
    ("F11", KeyCode::F11),
    ("F12", KeyCode::F12),
];

impl KeyCode {
    pub fn from_name(name: &str) -> Option<KeyCode> {
        KEY_NAMES
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|&(_, key)| key)
    }

    /// Maps a macOS virtual keycode (`kVK_*`) to a key.
    pub fn from_mac_keycode(code: u16) -> Option<KeyCode> {
        use KeyCode::*;
        let key = match code {
            0x00 => KeyA,
            0x01 => KeyS,
            0x02 => KeyD,
            0x03 => KeyF,
            0x04 => KeyH,
            0x05 => KeyG,
            0x06 => KeyZ,
            0x07 => KeyX,
            0x08 => KeyC,
            0x09 => KeyV,
            0x0B => KeyB,
            0x0C => KeyQ,
            0x0D => KeyW,
            0x0E => KeyE,
            0x0F => KeyR,
            0x10 => KeyY,
            0x11 => KeyT,
            0x12 => Digit1,
            0x13 => Digit2,
            0x14 => Digit3,
            0x15 => Digit4,
            0x16 => Digit6,
            0x17 => Digit5,
            0x18 => Equal,
            0x19 => Digit9,
            0x1A => Digit7,
            0x1B => Minus,
            0x1C => Digit8,
            0x1D => Digit0,
            0x1F => KeyO,
            0x20 => KeyU,
            0x22 => KeyI,
            0x23 => KeyP,
            0x24 => Enter,
            0x25 => KeyL,
            0x26 => KeyJ,
            0x28 => KeyK,
            0x2B => Comma,
            0x2C => Slash,
            0x2D => KeyN,
            0x2E => KeyM,
            0x2F => Period,
            0x30 => Tab,
            0x31 => Space,
            0x32 => Backquote,
            0x33 => Backspace,
            0x35 => Escape,
            0x36 => MetaRight,
            0x37 => MetaLeft,
            0x38 => ShiftLeft,
            0x39 => CapsLock,
            0x3A => AltLeft,
            0x3B => ControlLeft,
            0x3C => ShiftRight,
            0x3D => AltRight,
            0x3E => ControlRight,
            0x3F => Fn,
            0x4C => NumpadEnter,
            0x60 => F5,
            0x61 => F6,
            0x62 => F7,
            0x63 => F3,
            0x64 => F8,
            0x65 => F9,
            0x67 => F11,
            0x6D => F10,
            0x6F => F12,
            0x73 => Home,
            0x74 => PageUp,
            0x76 => F4,
            0x77 => End,
            0x78 => F2,
            0x79 => PageDown,
            0x7A => F1,
            0x7B => ArrowLeft,
            0x7C => ArrowRight,
            0x7D => ArrowDown,
            0x7E => ArrowUp,
            _ => return None,
        };
        Some(key)
    }

    pub fn is_modifier(self) -> bool {
        use KeyCode::*;
        matches!(
            self,
            ShiftLeft
                | ShiftRight
                | ControlLeft
                | ControlRight
                | AltLeft
                | AltRight
                | MetaLeft
                | MetaRight
                | CapsLock
                | Fn
        )
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match KEY_NAMES.iter().find(|(_, key)| key == self) {
            Some((name, _)) => write!(f, "{name}"),
            None => write!(f, "{self:?}"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Hotkey {
    pub modifiers: Modifiers,
    pub key_code: KeyCode,
}

impl Hotkey {
    pub const fn new(modifiers: Modifiers, key_code: KeyCode) -> Self {
        Self { modifiers, key_code }
    }

    /// Exact match: extra held modifiers do not count as a press of this hotkey.
    pub fn matches(&self, key_code: KeyCode, modifiers: Modifiers) -> bool {
        self.key_code == key_code && self.modifiers == modifiers
    }

    /// True while every modifier of this hotkey is still held.
    pub fn modifiers_held(&self, modifiers: Modifiers) -> bool {
        !self.modifiers.is_empty() && modifiers.contains(self.modifiers)
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.is_empty() {
            write!(f, "{}", self.key_code)
        } else {
            write!(f, "{} + {}", self.modifiers, self.key_code)
        }
    }
}

impl FromStr for Hotkey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut modifiers = Modifiers::empty();
        let mut key_code = None;

        for token in s.split('+').map(str::trim).filter(|t| !t.is_empty()) {
            if let Some(modifier) = modifier_from_token(token) {
                modifiers.insert(modifier);
                continue;
            }
            let Some(key) = KeyCode::from_name(token) else {
                anyhow::bail!("unrecognized key token {token:?} in hotkey {s:?}");
            };
            if key_code.replace(key).is_some() {
                anyhow::bail!("hotkey {s:?} names more than one key");
            }
        }

        let key_code = key_code.ok_or_else(|| anyhow::anyhow!("no key specified in hotkey {s:?}"))?;
        Ok(Hotkey::new(modifiers, key_code))
    }
}

impl Serialize for Hotkey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Hotkey {
    fn deserialize<D>(deserializer: D) -> Result<Hotkey, D::Error>
    where D: serde::Deserializer<'de> {
        let repr = String::deserialize(deserializer)?;
        Hotkey::from_str(&repr).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_parses_option_aliases() {
        let hotkey: Hotkey = "Option + Tab".parse().unwrap();
        assert_eq!(hotkey, Hotkey::new(Modifiers::ALT, KeyCode::Tab));

        let hotkey: Hotkey = "alt+q".parse().unwrap();
        assert_eq!(hotkey, Hotkey::new(Modifiers::ALT, KeyCode::KeyQ));

        let hotkey: Hotkey = "Ctrl + Shift + Left".parse().unwrap();
        assert_eq!(
            hotkey,
            Hotkey::new(Modifiers::CONTROL | Modifiers::SHIFT, KeyCode::ArrowLeft)
        );
    }

    #[test]
    fn it_rejects_bad_hotkeys() {
        assert!("Alt +".parse::<Hotkey>().is_err());
        assert!("Alt + Tab + Q".parse::<Hotkey>().is_err());
        assert!("Hyper + Tab".parse::<Hotkey>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for s in ["Alt + Tab", "Ctrl + Alt + Q", "Cmd + `", "F5"] {
            let hotkey: Hotkey = s.parse().unwrap();
            let again: Hotkey = hotkey.to_string().parse().unwrap();
            assert_eq!(hotkey, again, "{s}");
        }
    }

    #[test]
    fn matching_requires_exact_modifiers() {
        let trigger = Hotkey::new(Modifiers::ALT, KeyCode::Tab);
        assert!(trigger.matches(KeyCode::Tab, Modifiers::ALT));
        assert!(!trigger.matches(KeyCode::Tab, Modifiers::ALT | Modifiers::SHIFT));
        assert!(!trigger.matches(KeyCode::KeyQ, Modifiers::ALT));

        assert!(trigger.modifiers_held(Modifiers::ALT | Modifiers::SHIFT));
        assert!(!trigger.modifiers_held(Modifiers::SHIFT));
    }

    #[test]
    fn mac_keycodes_map_to_keys() {
        assert_eq!(KeyCode::from_mac_keycode(0x30), Some(KeyCode::Tab));
        assert_eq!(KeyCode::from_mac_keycode(0x35), Some(KeyCode::Escape));
        assert_eq!(KeyCode::from_mac_keycode(0x0C), Some(KeyCode::KeyQ));
        assert_eq!(KeyCode::from_mac_keycode(0x7B), Some(KeyCode::ArrowLeft));
        assert_eq!(KeyCode::from_mac_keycode(0xFF), None);
        assert!(KeyCode::AltLeft.is_modifier());
    }
}
